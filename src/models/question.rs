//! 题库中的题目与答案，以及字段修改目标

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, PatchError};

/// 题目（题库拥有其生命周期）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub name: String,
    pub question_text: String,
    pub general_feedback: String,
    pub modified_at: DateTime<Utc>,
    pub modified_by: Option<i64>,
    pub answers: Vec<Answer>,
}

impl Question {
    /// 查找属于本题的答案
    pub fn answer(&self, answer_id: i64) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == answer_id)
    }
}

/// 答案选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub feedback: String,
    /// 得分权重，1.0 为满分
    pub fraction: f64,
}

/// 题目上可直接修改的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionField {
    QuestionText,
    GeneralFeedback,
}

impl QuestionField {
    pub fn column(self) -> &'static str {
        match self {
            QuestionField::QuestionText => "question_text",
            QuestionField::GeneralFeedback => "general_feedback",
        }
    }
}

/// 答案上可直接修改的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerField {
    Text,
    Feedback,
}

impl AnswerField {
    pub fn column(self) -> &'static str {
        match self {
            AnswerField::Text => "answer",
            AnswerField::Feedback => "feedback",
        }
    }
}

/// 字段修改目标
///
/// 接口上仍使用 `kind:id` 字符串编码，例如 `answer:17`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    QuestionText,
    GeneralFeedback,
    AnswerText(i64),
    AnswerFeedback(i64),
    CorrectAnswer,
}

impl FromStr for FieldTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questiontext" => return Ok(FieldTarget::QuestionText),
            "generalfeedback" => return Ok(FieldTarget::GeneralFeedback),
            "correctanswer" => return Ok(FieldTarget::CorrectAnswer),
            _ => {}
        }

        let parsed = s.split_once(':').and_then(|(kind, id)| {
            // 只接受纯数字ID，与 `answer:<digits>` 格式保持一致
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let id = id.parse::<i64>().ok()?;
            match kind {
                "answer" => Some(FieldTarget::AnswerText(id)),
                "feedback" => Some(FieldTarget::AnswerFeedback(id)),
                _ => None,
            }
        });

        parsed.ok_or_else(|| {
            AppError::Patch(PatchError::UnsupportedField {
                field: s.to_string(),
            })
        })
    }
}

impl fmt::Display for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldTarget::QuestionText => f.write_str("questiontext"),
            FieldTarget::GeneralFeedback => f.write_str("generalfeedback"),
            FieldTarget::AnswerText(id) => write!(f, "answer:{}", id),
            FieldTarget::AnswerFeedback(id) => write!(f, "feedback:{}", id),
            FieldTarget::CorrectAnswer => f.write_str("correctanswer"),
        }
    }
}
