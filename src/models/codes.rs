//! 举报原因 / 状态 / 处理结果的代码登记表
//!
//! 代码值同时用于接口与数据库存储，显示名称见 [`crate::models::LabelCatalog`]。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 举报原因
///
/// 声明顺序即 `top_reason` 平票时的优先顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    /// 题干有误
    ErrorStatement,
    /// 标准答案错误
    WrongAnswer,
    /// 法规已过时
    OutdatedLaw,
    /// 题意模糊
    Ambiguous,
    /// 其他
    Other,
}

impl FlagReason {
    const ALL: [FlagReason; 5] = [
        FlagReason::ErrorStatement,
        FlagReason::WrongAnswer,
        FlagReason::OutdatedLaw,
        FlagReason::Ambiguous,
        FlagReason::Other,
    ];

    /// 全部原因（按声明顺序）
    pub fn all() -> &'static [FlagReason] {
        &Self::ALL
    }

    /// 获取代码
    pub fn as_str(self) -> &'static str {
        match self {
            FlagReason::ErrorStatement => "error_statement",
            FlagReason::WrongAnswer => "wrong_answer",
            FlagReason::OutdatedLaw => "outdated_law",
            FlagReason::Ambiguous => "ambiguous",
            FlagReason::Other => "other",
        }
    }

    /// 从代码解析
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == code)
    }
}

/// 汇总记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl FlagStatus {
    const ALL: [FlagStatus; 4] = [
        FlagStatus::Pending,
        FlagStatus::Reviewing,
        FlagStatus::Resolved,
        FlagStatus::Dismissed,
    ];

    pub fn all() -> &'static [FlagStatus] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlagStatus::Pending => "pending",
            FlagStatus::Reviewing => "reviewing",
            FlagStatus::Resolved => "resolved",
            FlagStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == code)
    }

    /// 是否仍在跟踪举报数（未关闭）
    pub fn is_open(self) -> bool {
        matches!(self, FlagStatus::Pending | FlagStatus::Reviewing)
    }
}

/// 处理结果
///
/// `Dismissed` 只由驳回动作写入，`resolve` 不接受该代码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 已修正题目
    Fixed,
    /// 无需处理
    NoAction,
    /// 重复举报
    Duplicate,
    /// 驳回
    Dismissed,
}

impl Resolution {
    const ALL: [Resolution; 4] = [
        Resolution::Fixed,
        Resolution::NoAction,
        Resolution::Duplicate,
        Resolution::Dismissed,
    ];

    pub fn all() -> &'static [Resolution] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Fixed => "fixed",
            Resolution::NoAction => "no_action",
            Resolution::Duplicate => "duplicate",
            Resolution::Dismissed => "dismissed",
        }
    }

    /// 解析存储中的任意处理结果代码
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == code)
    }

    /// 解析 `resolve` 动作可用的处理结果
    pub fn parse_for_resolve(code: &str) -> Option<Self> {
        Self::parse(code).filter(|r| *r != Resolution::Dismissed)
    }
}

macro_rules! impl_code_display {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_code_display!(FlagReason, FlagStatus, Resolution);
