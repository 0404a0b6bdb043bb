//! 举报接口
//!
//! 外部调用入口，调用方身份已由宿主平台校验。
//! 请求和响应都是可序列化的结构体。
//!
//! 错误约定：
//! - 请求本身不合法（未知动作、空的处理意见、未知状态）直接返回 `Err`
//! - 业务规则失败（重复举报、已关闭等）返回 `success = false` 和提示信息
//! - 数据库等系统错误返回 `Err`

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, FlagError, WorkflowError};
use crate::models::labels::{
    MSG_ALREADY_FLAGGED, MSG_FLAG_DISMISSED, MSG_FLAG_RESOLVED, MSG_FLAG_REVIEWING, MSG_FLAG_SUBMITTED,
};
use crate::models::{FlagReason, FlagStatus, LabelCatalog, Resolution, StatusCounts};
use crate::services::{FlagStore, NewFlag, QuestionBank, StatusAggregator};
use crate::utils::plain_preview;
use crate::workflow::{FieldPatcher, ModerationWorkflow};

/// 列表中题干预览的最大字符数
const LIST_PREVIEW_CHARS: usize = 200;
/// 每页最多返回的条数
const MAX_PAGE_SIZE: i64 = 500;

/// 已通过身份校验的调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
}

impl Caller {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFlagRequest {
    pub question_id: i64,
    pub reason: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// 0 表示不在测验中
    #[serde(default)]
    pub attempt_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitFlagResponse {
    pub success: bool,
    pub flag_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagStatusResponse {
    pub has_flagged: bool,
    pub question_status: Option<FlagStatus>,
    pub flag_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFlaggedRequest {
    /// 空或 `all` 表示不过滤
    #[serde(default)]
    pub status: Option<String>,
    /// 从 0 开始
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub per_page: Option<i64>,
}

/// 审核队列中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedQuestionSummary {
    pub id: i64,
    pub question_id: i64,
    pub question_name: String,
    /// 去除 HTML 后的题干预览
    pub question_text_preview: String,
    pub status: FlagStatus,
    pub status_label: String,
    pub flag_count: i64,
    pub top_reason: Option<FlagReason>,
    pub top_reason_label: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedQuestionsResponse {
    pub questions: Vec<FlaggedQuestionSummary>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub reason: FlagReason,
    pub reason_label: String,
    pub comment: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagDetailsResponse {
    pub question_id: i64,
    pub question_name: String,
    /// 完整题干（含 HTML）
    pub question_text: String,
    pub status: Option<FlagStatus>,
    pub flag_count: i64,
    pub resolution: Option<Resolution>,
    pub resolution_feedback: String,
    pub flags: Vec<FlagDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFlagStatusRequest {
    pub question_id: i64,
    /// resolve / dismiss / review
    pub action: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveFieldRequest {
    pub question_id: i64,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveFieldResponse {
    pub success: bool,
}

/// 审核动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModerationAction {
    Resolve,
    Dismiss,
    Review,
}

impl ModerationAction {
    fn parse(action: &str) -> AppResult<Self> {
        match action {
            "resolve" => Ok(ModerationAction::Resolve),
            "dismiss" => Ok(ModerationAction::Dismiss),
            "review" => Ok(ModerationAction::Review),
            other => Err(WorkflowError::InvalidAction {
                action: other.to_string(),
            }
            .into()),
        }
    }
}

/// 举报接口
pub struct FlagApi {
    store: Arc<FlagStore>,
    aggregator: Arc<StatusAggregator>,
    workflow: Arc<ModerationWorkflow>,
    patcher: Arc<FieldPatcher>,
    bank: Arc<dyn QuestionBank>,
    labels: Arc<LabelCatalog>,
    default_page_size: i64,
}

impl FlagApi {
    pub fn new(
        store: Arc<FlagStore>,
        aggregator: Arc<StatusAggregator>,
        workflow: Arc<ModerationWorkflow>,
        patcher: Arc<FieldPatcher>,
        bank: Arc<dyn QuestionBank>,
        labels: Arc<LabelCatalog>,
        default_page_size: i64,
    ) -> Self {
        Self {
            store,
            aggregator,
            workflow,
            patcher,
            bank,
            labels,
            default_page_size,
        }
    }

    /// 提交举报
    pub async fn submit_flag(&self, caller: Caller, request: SubmitFlagRequest) -> AppResult<SubmitFlagResponse> {
        let result = self
            .store
            .submit_flag(NewFlag {
                question_id: request.question_id,
                user_id: caller.user_id,
                reason: &request.reason,
                comment: request.comment.as_deref(),
                attempt_id: request.attempt_id,
            })
            .await;

        match result {
            Ok(flag_id) => Ok(SubmitFlagResponse {
                success: true,
                flag_id: Some(flag_id),
                message: self.labels.message(MSG_FLAG_SUBMITTED, ""),
            }),
            Err(AppError::Flag(FlagError::DuplicateFlag { .. })) => Ok(SubmitFlagResponse {
                success: false,
                flag_id: None,
                message: self.labels.message(MSG_ALREADY_FLAGGED, ""),
            }),
            Err(e) if e.is_user_facing() => {
                debug!("[题目 {}] 举报未受理: {}", request.question_id, e);
                Ok(SubmitFlagResponse {
                    success: false,
                    flag_id: None,
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// 调用方是否已举报，以及题目当前的汇总状态
    pub async fn check_flag_status(&self, caller: Caller, question_id: i64) -> AppResult<FlagStatusResponse> {
        let has_flagged = self.store.has_user_flagged(question_id, caller.user_id).await?;
        let rollup = self.aggregator.get_rollup(question_id).await?;

        Ok(FlagStatusResponse {
            has_flagged,
            question_status: rollup.as_ref().map(|r| r.status),
            flag_count: rollup.map(|r| r.flag_count).unwrap_or(0),
        })
    }

    /// 审核队列（分页）
    pub async fn list_flagged_questions(&self, request: ListFlaggedRequest) -> AppResult<FlaggedQuestionsResponse> {
        let status = match request.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(code) => Some(FlagStatus::parse(code).ok_or_else(|| WorkflowError::InvalidStatus {
                status: code.to_string(),
            })?),
        };

        let per_page = request
            .per_page
            .filter(|n| *n > 0)
            .unwrap_or(self.default_page_size)
            .min(MAX_PAGE_SIZE);
        let offset = request.page.max(0).saturating_mul(per_page);

        let rows = self
            .aggregator
            .list_flagged_questions(status, offset, per_page)
            .await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let top_reason = self.aggregator.top_reason(row.rollup.question_id).await?;
            questions.push(FlaggedQuestionSummary {
                id: row.rollup.id,
                question_id: row.rollup.question_id,
                question_name: row.question_name,
                question_text_preview: plain_preview(&row.question_text_preview, LIST_PREVIEW_CHARS),
                status: row.rollup.status,
                status_label: self.labels.status(row.rollup.status),
                flag_count: row.rollup.flag_count,
                top_reason,
                top_reason_label: top_reason.map(|r| self.labels.reason(r)),
                created_at: row.rollup.created_at.timestamp(),
                modified_at: row.rollup.modified_at.timestamp(),
            });
        }

        let counts = self.aggregator.counts_by_status().await?;

        Ok(FlaggedQuestionsResponse { questions, counts })
    }

    /// 单个题目的全部举报和汇总信息
    pub async fn get_flag_details(&self, question_id: i64) -> AppResult<FlagDetailsResponse> {
        let flags = self.store.list_flags_for_question(question_id).await?;
        let rollup = self.aggregator.get_rollup(question_id).await?;
        let question = self.bank.get_question(question_id).await?;

        let flags = flags
            .into_iter()
            .map(|f| FlagDetail {
                id: f.flag.id,
                user_id: f.flag.user_id,
                user_name: f.submitter_name,
                reason: f.flag.reason,
                reason_label: self.labels.reason(f.flag.reason),
                comment: f.flag.comment.unwrap_or_default(),
                created_at: f.flag.created_at.timestamp(),
            })
            .collect();

        let (question_name, question_text) = question
            .map(|q| (q.name, q.question_text))
            .unwrap_or_default();

        Ok(FlagDetailsResponse {
            question_id,
            question_name,
            question_text,
            status: rollup.as_ref().map(|r| r.status),
            flag_count: rollup.as_ref().map(|r| r.flag_count).unwrap_or(0),
            resolution: rollup.as_ref().and_then(|r| r.resolution),
            resolution_feedback: rollup.and_then(|r| r.resolution_feedback).unwrap_or_default(),
            flags,
        })
    }

    /// 审核动作：resolve / dismiss / review
    pub async fn update_flag_status(
        &self,
        caller: Caller,
        request: UpdateFlagStatusRequest,
    ) -> AppResult<ActionResponse> {
        let action = ModerationAction::parse(&request.action)?;
        let feedback = request.feedback.trim();

        if matches!(action, ModerationAction::Resolve | ModerationAction::Dismiss) && feedback.is_empty() {
            return Err(WorkflowError::EmptyFeedback.into());
        }

        let question_id = request.question_id;
        let result = match action {
            ModerationAction::Resolve => self
                .workflow
                .resolve(question_id, caller.user_id, &request.resolution, feedback)
                .await
                .map(|_| MSG_FLAG_RESOLVED),
            ModerationAction::Dismiss => self
                .workflow
                .dismiss(question_id, caller.user_id, feedback)
                .await
                .map(|_| MSG_FLAG_DISMISSED),
            ModerationAction::Review => self
                .workflow
                .mark_reviewing(question_id)
                .await
                .map(|_| MSG_FLAG_REVIEWING),
        };

        match result {
            Ok(key) => Ok(ActionResponse {
                success: true,
                message: self.labels.message(key, ""),
            }),
            Err(e) if e.is_user_facing() => {
                warn!("[题目 {}] ⚠️ 审核动作 {} 失败: {}", question_id, request.action, e);
                Ok(ActionResponse {
                    success: false,
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// 修改题目字段
    pub async fn save_question_field(&self, caller: Caller, request: SaveFieldRequest) -> AppResult<SaveFieldResponse> {
        self.patcher
            .apply_field_patch(request.question_id, &request.field, &request.value, caller.user_id)
            .await?;
        Ok(SaveFieldResponse { success: true })
    }
}
