//! 通知分发 - 业务能力层
//!
//! 只负责"给相关用户发消息"能力，不关心审核流程
//!
//! - 每个收件人单独发送，单个失败不影响其他人，也不影响已提交的状态变更
//! - 每次分发返回 [`DispatchReport`]，失败只记录日志

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::labels::{MSG_DISMISSED_SUBJECT, MSG_NEWFLAG_SUBJECT, MSG_RESOLVED_SUBJECT};
use crate::models::{LabelCatalog, Question};
use crate::services::events::{FlagEvent, FlagEventSubscriber};
use crate::services::flag_store::load_flagger_ids;
use crate::services::question_bank::QuestionBank;
use crate::utils::plain_preview;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// 举报已处理（发给举报人）
    FlagResolved,
    /// 举报已驳回（发给举报人）
    FlagDismissed,
    /// 新举报（发给审核人）
    NewFlag,
}

impl NotificationKind {
    fn subject_key(self) -> &'static str {
        match self {
            NotificationKind::FlagResolved => MSG_RESOLVED_SUBJECT,
            NotificationKind::FlagDismissed => MSG_DISMISSED_SUBJECT,
            NotificationKind::NewFlag => MSG_NEWFLAG_SUBJECT,
        }
    }
}

/// 发给单个用户的一条消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagNotification {
    pub recipient_id: i64,
    pub kind: NotificationKind,
    pub question_id: i64,
    pub question_name: String,
    /// 纯文本题干预览
    pub question_preview: String,
    pub resolution_label: String,
    pub feedback: String,
    pub subject: String,
}

/// 单个收件人的发送失败
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// 接收方拒绝
    #[error("发送给用户 {recipient_id} 被拒绝 (状态码: {status})")]
    Rejected { recipient_id: i64, status: u16 },
    /// 传输失败
    #[error("发送给用户 {recipient_id} 失败: {message}")]
    Transport { recipient_id: i64, message: String },
    /// 查询收件人失败，未发送
    #[error("查询用户 {recipient_id} 失败: {message}")]
    LookupFailed { recipient_id: i64, message: String },
}

/// 消息发送接口
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &FlagNotification) -> Result<(), DeliveryError>;
}

/// 只写日志的发送器（默认）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &FlagNotification) -> Result<(), DeliveryError> {
        info!(
            "[题目 {}] 📨 通知用户 {}: {}",
            notification.question_id, notification.recipient_id, notification.subject
        );
        Ok(())
    }
}

/// 一次分发的结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// 发送成功的用户
    pub delivered: Vec<i64>,
    /// 已删除或不存在、未发送的用户
    pub skipped: Vec<i64>,
    /// 发送失败的用户
    pub failures: Vec<DeliveryError>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 关闭举报时的结果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedOutcome {
    Resolved,
    Dismissed,
}

impl From<ClosedOutcome> for NotificationKind {
    fn from(outcome: ClosedOutcome) -> Self {
        match outcome {
            ClosedOutcome::Resolved => NotificationKind::FlagResolved,
            ClosedOutcome::Dismissed => NotificationKind::FlagDismissed,
        }
    }
}

/// 通知分发器
pub struct NotificationDispatcher {
    pool: SqlitePool,
    bank: Arc<dyn QuestionBank>,
    notifier: Arc<dyn Notifier>,
    labels: Arc<LabelCatalog>,
    preview_max_chars: usize,
}

impl NotificationDispatcher {
    pub fn new(
        pool: SqlitePool,
        bank: Arc<dyn QuestionBank>,
        notifier: Arc<dyn Notifier>,
        labels: Arc<LabelCatalog>,
        preview_max_chars: usize,
    ) -> Self {
        Self {
            pool,
            bank,
            notifier,
            labels,
            preview_max_chars,
        }
    }

    /// 通知题目的所有举报人
    ///
    /// 题目已不存在时不发送任何消息。
    pub async fn notify_flaggers(
        &self,
        question_id: i64,
        outcome: ClosedOutcome,
        feedback: &str,
        resolution_label: &str,
    ) -> AppResult<DispatchReport> {
        let Some(question) = self.bank.get_question(question_id).await? else {
            warn!("[题目 {}] ⚠️ 题目已不存在，跳过通知", question_id);
            return Ok(DispatchReport::default());
        };

        let mut recipients = load_flagger_ids(&self.pool, question_id).await?;
        recipients.dedup();

        let report = self
            .dispatch(&question, &recipients, outcome.into(), feedback, resolution_label)
            .await;

        info!(
            "[题目 {}] 📨 通知举报人: 成功 {} / 失败 {} / 跳过 {}",
            question_id,
            report.delivered.len(),
            report.failures.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// 通知审核人有新的举报
    pub async fn notify_reviewers(&self, question_id: i64, reviewer_ids: &[i64]) -> AppResult<DispatchReport> {
        if reviewer_ids.is_empty() {
            return Ok(DispatchReport::default());
        }

        let Some(question) = self.bank.get_question(question_id).await? else {
            return Ok(DispatchReport::default());
        };

        Ok(self
            .dispatch(&question, reviewer_ids, NotificationKind::NewFlag, "", "")
            .await)
    }

    async fn dispatch(
        &self,
        question: &Question,
        recipients: &[i64],
        kind: NotificationKind,
        feedback: &str,
        resolution_label: &str,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut messages = Vec::with_capacity(recipients.len());

        let preview = plain_preview(&question.question_text, self.preview_max_chars);
        let subject = self.labels.message(kind.subject_key(), &question.name);

        for &recipient_id in recipients {
            match self.bank.get_user(recipient_id).await {
                Ok(Some(user)) if !user.deleted => messages.push(FlagNotification {
                    recipient_id,
                    kind,
                    question_id: question.id,
                    question_name: question.name.clone(),
                    question_preview: preview.clone(),
                    resolution_label: resolution_label.to_string(),
                    feedback: feedback.to_string(),
                    subject: subject.clone(),
                }),
                Ok(_) => {
                    debug!("[题目 {}] 用户 {} 不存在或已删除，跳过", question.id, recipient_id);
                    report.skipped.push(recipient_id);
                }
                Err(e) => {
                    warn!("[题目 {}] ⚠️ 查询用户 {} 失败: {}", question.id, recipient_id, e);
                    report.failures.push(DeliveryError::LookupFailed {
                        recipient_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        let results = join_all(messages.iter().map(|m| self.notifier.send(m))).await;

        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(message.recipient_id),
                Err(e) => {
                    warn!("[题目 {}] ⚠️ {}", question.id, e);
                    report.failures.push(e);
                }
            }
        }

        report
    }
}

/// 新举报提醒：把 `FlagCreated` 转发给配置的审核人
pub struct ReviewerAlert {
    dispatcher: Arc<NotificationDispatcher>,
    reviewer_ids: Vec<i64>,
}

impl ReviewerAlert {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, reviewer_ids: Vec<i64>) -> Self {
        Self {
            dispatcher,
            reviewer_ids,
        }
    }
}

#[async_trait]
impl FlagEventSubscriber for ReviewerAlert {
    fn name(&self) -> &str {
        "reviewer_alert"
    }

    async fn on_event(&self, event: &FlagEvent) -> AppResult<()> {
        if let FlagEvent::FlagCreated { question_id, .. } = event {
            self.dispatcher
                .notify_reviewers(*question_id, &self.reviewer_ids)
                .await?;
        }
        Ok(())
    }
}
