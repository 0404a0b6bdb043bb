//! 领域事件 - 业务能力层
//!
//! 状态变更提交后由核心显式调用 `publish`，订阅者通过接口注册。
//! 订阅者失败只记录日志，不影响已经提交的状态变更。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::{FlagReason, Resolution};

/// 举报相关的领域事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlagEvent {
    /// 新举报已提交
    FlagCreated {
        flag_id: i64,
        question_id: i64,
        user_id: i64,
        reason: FlagReason,
    },
    /// 举报已处理
    FlagResolved {
        question_id: i64,
        resolved_by: i64,
        resolution: Resolution,
    },
    /// 举报已驳回
    FlagDismissed {
        question_id: i64,
        dismissed_by: i64,
    },
}

impl FlagEvent {
    pub fn question_id(&self) -> i64 {
        match self {
            FlagEvent::FlagCreated { question_id, .. }
            | FlagEvent::FlagResolved { question_id, .. }
            | FlagEvent::FlagDismissed { question_id, .. } => *question_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlagEvent::FlagCreated { .. } => "flag_created",
            FlagEvent::FlagResolved { .. } => "flag_resolved",
            FlagEvent::FlagDismissed { .. } => "flag_dismissed",
        }
    }
}

/// 事件订阅者
#[async_trait]
pub trait FlagEventSubscriber: Send + Sync {
    /// 订阅者名称（仅用于日志）
    fn name(&self) -> &str;

    async fn on_event(&self, event: &FlagEvent) -> AppResult<()>;
}

/// 事件发布器
#[derive(Default, Clone)]
pub struct EventPublisher {
    subscribers: Vec<Arc<dyn FlagEventSubscriber>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册订阅者
    pub fn subscribe(&mut self, subscriber: Arc<dyn FlagEventSubscriber>) {
        debug!("注册事件订阅者: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 依次通知所有订阅者，返回失败的订阅者数量
    pub async fn publish(&self, event: &FlagEvent) -> usize {
        let mut failed = 0;
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.on_event(event).await {
                failed += 1;
                warn!(
                    "[题目 {}] ⚠️ 订阅者 {} 处理事件 {} 失败: {}",
                    event.question_id(),
                    subscriber.name(),
                    event.name(),
                    e
                );
            }
        }
        failed
    }
}
