//! 显示名称目录
//!
//! 启动时从 TOML 构建一次，之后只读，通过 `Arc<LabelCatalog>` 注入到各组件。

use serde::Deserialize;
use std::collections::HashMap;

use crate::models::codes::{FlagReason, FlagStatus, Resolution};

/// 通知模板的键
pub const MSG_RESOLVED_SUBJECT: &str = "resolved_subject";
pub const MSG_DISMISSED_SUBJECT: &str = "dismissed_subject";
pub const MSG_NEWFLAG_SUBJECT: &str = "newflag_subject";
pub const MSG_FLAG_SUBMITTED: &str = "flag_submitted";
pub const MSG_ALREADY_FLAGGED: &str = "already_flagged";
pub const MSG_FLAG_RESOLVED: &str = "flag_resolved";
pub const MSG_FLAG_DISMISSED: &str = "flag_dismissed";
pub const MSG_FLAG_REVIEWING: &str = "flag_reviewing";

/// 代码 → 显示名称
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelCatalog {
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    reasons: HashMap<String, String>,
    #[serde(default)]
    statuses: HashMap<String, String>,
    #[serde(default)]
    resolutions: HashMap<String, String>,
    #[serde(default)]
    messages: HashMap<String, String>,
}

impl LabelCatalog {
    /// 内置英文目录
    pub fn english() -> Self {
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };

        Self {
            locale: "en".to_string(),
            reasons: pairs(&[
                ("error_statement", "Error in the question statement"),
                ("wrong_answer", "Wrong answer marked as correct"),
                ("outdated_law", "Outdated law or regulation"),
                ("ambiguous", "Ambiguous question"),
                ("other", "Other"),
            ]),
            statuses: pairs(&[
                ("pending", "Pending"),
                ("reviewing", "Under review"),
                ("resolved", "Resolved"),
                ("dismissed", "Dismissed"),
            ]),
            resolutions: pairs(&[
                ("fixed", "Question fixed"),
                ("no_action", "No action needed"),
                ("duplicate", "Duplicate report"),
                ("dismissed", "Dismissed"),
            ]),
            messages: pairs(&[
                (MSG_RESOLVED_SUBJECT, "Your report on \"{questionname}\" has been resolved"),
                (MSG_DISMISSED_SUBJECT, "Your report on \"{questionname}\" has been dismissed"),
                (MSG_NEWFLAG_SUBJECT, "New report on question \"{questionname}\""),
                (MSG_FLAG_SUBMITTED, "Thank you, your report has been submitted"),
                (MSG_ALREADY_FLAGGED, "You have already reported this question"),
                (MSG_FLAG_RESOLVED, "The report has been resolved"),
                (MSG_FLAG_DISMISSED, "The report has been dismissed"),
                (MSG_FLAG_REVIEWING, "The report is now under review"),
            ]),
        }
    }

    /// 以 `base` 为底补齐缺失的条目
    pub fn merged_over(mut self, base: &LabelCatalog) -> Self {
        for (own, fallback) in [
            (&mut self.reasons, &base.reasons),
            (&mut self.statuses, &base.statuses),
            (&mut self.resolutions, &base.resolutions),
            (&mut self.messages, &base.messages),
        ] {
            for (k, v) in fallback {
                own.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        if self.locale.is_empty() {
            self.locale = base.locale.clone();
        }
        self
    }

    pub fn reason(&self, reason: FlagReason) -> String {
        lookup(&self.reasons, reason.as_str())
    }

    pub fn status(&self, status: FlagStatus) -> String {
        lookup(&self.statuses, status.as_str())
    }

    pub fn resolution(&self, resolution: Resolution) -> String {
        lookup(&self.resolutions, resolution.as_str())
    }

    /// 取消息模板并替换 `{questionname}` 占位符
    pub fn message(&self, key: &str, question_name: &str) -> String {
        lookup(&self.messages, key).replace("{questionname}", question_name)
    }
}

fn lookup(map: &HashMap<String, String>, code: &str) -> String {
    map.get(code).cloned().unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_catalog_covers_all_codes() {
        let catalog = LabelCatalog::english();
        for reason in FlagReason::all() {
            assert_ne!(catalog.reason(*reason), reason.as_str());
        }
        for resolution in Resolution::all() {
            assert_ne!(catalog.resolution(*resolution), resolution.as_str());
        }
    }

    #[test]
    fn test_missing_code_falls_back_to_code() {
        let catalog = LabelCatalog::default();
        assert_eq!(catalog.reason(FlagReason::Other), "other");
        assert_eq!(catalog.message("unknown_key", "Q1"), "unknown_key");
    }

    #[test]
    fn test_message_placeholder() {
        let catalog = LabelCatalog::english();
        assert_eq!(
            catalog.message(MSG_NEWFLAG_SUBJECT, "Q7"),
            "New report on question \"Q7\""
        );
    }
}
