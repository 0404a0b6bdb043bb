//! 字段修改 - 流程层
//!
//! 审核人在审核界面直接修改题目内容，字段用 `kind:id` 字符串编码：
//!
//! | 字段 | 值 |
//! |---|---|
//! | `questiontext` | 题干 HTML |
//! | `generalfeedback` | 总体反馈 HTML |
//! | `answer:<id>` | 答案文本 |
//! | `feedback:<id>` | 答案反馈 |
//! | `correctanswer` | 正确答案的ID |
//!
//! 内容不做 HTML 过滤，原样写入。

use std::sync::Arc;
use tracing::info;

use crate::error::{AppResult, PatchError};
use crate::models::{AnswerField, FieldTarget, QuestionField};
use crate::services::QuestionBank;

/// 正确答案的得分比例
pub const FULL_CREDIT: f64 = 1.0;
/// 其余答案的得分比例
pub const WRONG_PENALTY: f64 = -0.3333333;

/// 字段修改流程
pub struct FieldPatcher {
    bank: Arc<dyn QuestionBank>,
}

impl FieldPatcher {
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self { bank }
    }

    /// 修改题目的单个字段，返回解析后的修改目标
    ///
    /// # 错误
    /// - `UnsupportedField`: 字段名无法识别
    /// - `QuestionNotFound`: 题目不存在
    /// - `AnswerNotOwnedByQuestion`: 答案不属于该题目
    /// - `InvalidAnswerId`: `correctanswer` 的值不是数字
    pub async fn apply_field_patch(
        &self,
        question_id: i64,
        field: &str,
        value: &str,
        modified_by: i64,
    ) -> AppResult<FieldTarget> {
        let target: FieldTarget = field.parse()?;

        if !self.bank.question_exists(question_id).await? {
            return Err(PatchError::QuestionNotFound { question_id }.into());
        }

        match target {
            FieldTarget::QuestionText => {
                self.bank
                    .update_question_field(question_id, QuestionField::QuestionText, value, modified_by)
                    .await?
            }
            FieldTarget::GeneralFeedback => {
                self.bank
                    .update_question_field(question_id, QuestionField::GeneralFeedback, value, modified_by)
                    .await?
            }
            FieldTarget::AnswerText(answer_id) => {
                self.bank
                    .update_answer_field(question_id, answer_id, AnswerField::Text, value, modified_by)
                    .await?
            }
            FieldTarget::AnswerFeedback(answer_id) => {
                self.bank
                    .update_answer_field(question_id, answer_id, AnswerField::Feedback, value, modified_by)
                    .await?
            }
            FieldTarget::CorrectAnswer => {
                let answer_id = parse_answer_id(value)?;
                self.bank
                    .set_answer_fractions(question_id, answer_id, FULL_CREDIT, WRONG_PENALTY, modified_by)
                    .await?
            }
        }

        info!("[题目 {}] ✏️ 用户 {} 修改了 {}", question_id, modified_by, target);
        Ok(target)
    }
}

fn parse_answer_id(value: &str) -> AppResult<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PatchError::InvalidAnswerId {
            value: value.to_string(),
        }
        .into());
    }
    trimmed.parse::<i64>().map_err(|_| {
        PatchError::InvalidAnswerId {
            value: value.to_string(),
        }
        .into()
    })
}
