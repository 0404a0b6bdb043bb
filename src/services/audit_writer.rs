//! 审计日志写入 - 业务能力层
//!
//! 只负责"把举报事件追加写入审计文件"能力，不关心流程

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::AppResult;
use crate::services::events::{FlagEvent, FlagEventSubscriber};

/// 审计日志写入服务
///
/// 职责：
/// - 每个事件一行 JSON，追加写入
/// - 只处理单个事件
/// - 写入失败由发布器记录，不影响状态变更
pub struct AuditLogWriter {
    audit_file_path: String,
}

impl AuditLogWriter {
    /// 使用默认路径 `flag_audit.log`
    pub fn new() -> Self {
        Self {
            audit_file_path: "flag_audit.log".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            audit_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.audit_file_path
    }

    /// 写入一条事件记录
    pub async fn write(&self, event: &FlagEvent) -> AppResult<()> {
        let mut record = serde_json::to_value(event)?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("at".to_string(), Utc::now().timestamp().into());
        }
        let line = format!("{}\n", record);

        debug!(
            "写入审计: {} | 题目 {} -> {}",
            event.name(),
            event.question_id(),
            self.audit_file_path
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_file_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

impl Default for AuditLogWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlagEventSubscriber for AuditLogWriter {
    fn name(&self) -> &str {
        "audit_log"
    }

    async fn on_event(&self, event: &FlagEvent) -> AppResult<()> {
        self.write(event).await
    }
}
