//! 举报记录与汇总记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::codes::{FlagReason, FlagStatus, Resolution};

/// 单个用户对单个题目的举报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub id: i64,
    pub question_id: i64,
    pub user_id: i64,
    /// 提交举报时所在的测验尝试
    pub attempt_id: Option<i64>,
    pub reason: FlagReason,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 附带提交人姓名的举报（审核界面使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagWithSubmitter {
    #[serde(flatten)]
    pub flag: Flag,
    pub submitter_name: String,
}

/// 单个题目的举报汇总记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagStatusRollup {
    pub id: i64,
    pub question_id: i64,
    pub status: FlagStatus,
    pub flag_count: i64,
    pub resolved_by: Option<i64>,
    pub resolution: Option<Resolution>,
    pub resolution_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FlagStatusRollup {
    /// 是否已关闭（已处理或已驳回）
    pub fn is_closed(&self) -> bool {
        !self.status.is_open()
    }
}

/// 审核队列中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedQuestion {
    #[serde(flatten)]
    pub rollup: FlagStatusRollup,
    pub question_name: String,
    /// 题干前 200 个字符（未去除 HTML）
    pub question_text_preview: String,
}

/// 各状态的汇总记录数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub all: i64,
    pub pending: i64,
    pub reviewing: i64,
    pub resolved: i64,
    pub dismissed: i64,
}

impl StatusCounts {
    /// 累加某个状态的数量，同时更新总数
    pub fn add(&mut self, status: FlagStatus, count: i64) {
        match status {
            FlagStatus::Pending => self.pending += count,
            FlagStatus::Reviewing => self.reviewing += count,
            FlagStatus::Resolved => self.resolved += count,
            FlagStatus::Dismissed => self.dismissed += count,
        }
        self.all += count;
    }

    pub fn get(&self, status: FlagStatus) -> i64 {
        match status {
            FlagStatus::Pending => self.pending,
            FlagStatus::Reviewing => self.reviewing,
            FlagStatus::Resolved => self.resolved,
            FlagStatus::Dismissed => self.dismissed,
        }
    }
}

/// 把数据库中的 unix 秒转换为 UTC 时间
pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
