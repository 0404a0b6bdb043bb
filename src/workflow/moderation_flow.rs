//! 审核流程 - 流程层
//!
//! 核心职责：定义"一个被举报题目"的状态流转
//!
//! ```text
//! pending ──mark_reviewing──▶ reviewing
//!    │                           │
//!    ├──resolve / dismiss────────┤
//!    ▼                           ▼
//! resolved / dismissed（终态，不可回退）
//! ```
//!
//! 状态变更提交后才发送通知、发布事件，两者失败都不会回滚状态。

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, WorkflowError};
use crate::models::{FlagStatus, FlagStatusRollup, LabelCatalog, Resolution};
use crate::services::{
    ClosedOutcome, DispatchReport, EventPublisher, FlagEvent, NotificationDispatcher, StatusAggregator,
};

/// 关闭举报的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedReport {
    /// 关闭后的汇总记录
    pub rollup: FlagStatusRollup,
    /// 通知举报人的结果
    pub delivery: DispatchReport,
}

/// 审核流程
///
/// - 只做状态流转的判断和顺序编排
/// - 计数、通知、事件都委托给 services
pub struct ModerationWorkflow {
    aggregator: Arc<StatusAggregator>,
    dispatcher: Arc<NotificationDispatcher>,
    publisher: Arc<EventPublisher>,
    labels: Arc<LabelCatalog>,
}

impl ModerationWorkflow {
    pub fn new(
        aggregator: Arc<StatusAggregator>,
        dispatcher: Arc<NotificationDispatcher>,
        publisher: Arc<EventPublisher>,
        labels: Arc<LabelCatalog>,
    ) -> Self {
        Self {
            aggregator,
            dispatcher,
            publisher,
            labels,
        }
    }

    /// 开始审核：pending → reviewing，其他状态不变
    pub async fn mark_reviewing(&self, question_id: i64) -> AppResult<FlagStatusRollup> {
        if self.aggregator.mark_reviewing(question_id).await? {
            info!("[题目 {}] 🔎 开始审核", question_id);
        }
        self.load_rollup(question_id).await
    }

    /// 处理举报
    ///
    /// # 错误
    /// - `InvalidResolution`: 不是 fixed / no_action / duplicate
    /// - `RollupNotFound`: 题目没有汇总记录
    /// - `AlreadyClosed`: 已经处理或驳回
    pub async fn resolve(
        &self,
        question_id: i64,
        resolved_by: i64,
        resolution: &str,
        feedback: &str,
    ) -> AppResult<ClosedReport> {
        let resolution =
            Resolution::parse_for_resolve(resolution).ok_or_else(|| AppError::invalid_resolution(resolution))?;

        let rollup = self
            .close(question_id, FlagStatus::Resolved, resolved_by, resolution, feedback)
            .await?;
        info!(
            "[题目 {}] ✅ 用户 {} 处理完成 (结果: {})",
            question_id, resolved_by, resolution
        );

        let delivery = self
            .notify(question_id, ClosedOutcome::Resolved, feedback, resolution)
            .await;

        self.publisher
            .publish(&FlagEvent::FlagResolved {
                question_id,
                resolved_by,
                resolution,
            })
            .await;

        Ok(ClosedReport { rollup, delivery })
    }

    /// 驳回举报
    ///
    /// 错误同 [`ModerationWorkflow::resolve`]（不含 `InvalidResolution`）。
    pub async fn dismiss(&self, question_id: i64, dismissed_by: i64, feedback: &str) -> AppResult<ClosedReport> {
        let rollup = self
            .close(
                question_id,
                FlagStatus::Dismissed,
                dismissed_by,
                Resolution::Dismissed,
                feedback,
            )
            .await?;
        info!("[题目 {}] 🚫 用户 {} 驳回举报", question_id, dismissed_by);

        let delivery = self
            .notify(question_id, ClosedOutcome::Dismissed, feedback, Resolution::Dismissed)
            .await;

        self.publisher
            .publish(&FlagEvent::FlagDismissed {
                question_id,
                dismissed_by,
            })
            .await;

        Ok(ClosedReport { rollup, delivery })
    }

    async fn close(
        &self,
        question_id: i64,
        status: FlagStatus,
        closed_by: i64,
        resolution: Resolution,
        feedback: &str,
    ) -> AppResult<FlagStatusRollup> {
        if let Some(rollup) = self
            .aggregator
            .close(question_id, status, closed_by, resolution, feedback)
            .await?
        {
            return Ok(rollup);
        }

        // 条件更新没有命中：区分"没有记录"和"已关闭"
        match self.aggregator.get_rollup(question_id).await? {
            None => Err(AppError::rollup_not_found(question_id)),
            Some(rollup) => {
                warn!(
                    "[题目 {}] ⚠️ 举报已关闭 (状态: {})，不能变更为 {}",
                    question_id, rollup.status, status
                );
                Err(WorkflowError::AlreadyClosed {
                    question_id,
                    status: rollup.status.as_str().to_string(),
                }
                .into())
            }
        }
    }

    async fn notify(
        &self,
        question_id: i64,
        outcome: ClosedOutcome,
        feedback: &str,
        resolution: Resolution,
    ) -> DispatchReport {
        let label = self.labels.resolution(resolution);
        match self
            .dispatcher
            .notify_flaggers(question_id, outcome, feedback, &label)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!("[题目 {}] ⚠️ 通知举报人失败: {}", question_id, e);
                DispatchReport::default()
            }
        }
    }

    async fn load_rollup(&self, question_id: i64) -> AppResult<FlagStatusRollup> {
        self.aggregator
            .get_rollup(question_id)
            .await?
            .ok_or_else(|| AppError::rollup_not_found(question_id))
    }
}
