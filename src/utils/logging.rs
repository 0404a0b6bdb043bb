/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::StatusCounts;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info 级别。
/// 重复调用是安全的（测试中常见）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `database_url`: 数据库连接串
/// - `reviewers`: 新举报提醒的审核人数量
pub fn log_startup(database_url: &str, reviewers: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 题目举报审核服务启动");
    info!("🗄️ 数据库: {}", database_url);
    info!("👥 新举报提醒审核人: {} 位", reviewers);
    info!("{}", "=".repeat(60));
}

/// 打印各状态统计
///
/// # 参数
/// - `counts`: 各状态数量
pub fn log_status_counts(counts: &StatusCounts) {
    info!("\n{}", "─".repeat(60));
    info!("📊 举报汇总统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
    info!("📋 全部: {}", counts.all);
    info!("⏳ 待处理: {}", counts.pending);
    info!("🔍 审核中: {}", counts.reviewing);
    info!("✅ 已处理: {}", counts.resolved);
    info!("🚫 已驳回: {}", counts.dismissed);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本，截断时以 `...` 结尾，总长度不超过 `max_len`
pub fn truncate_text(text: &str, max_len: usize) -> String {
    const ELLIPSIS: &str = "...";

    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len < ELLIPSIS.len() {
        return text.chars().take(max_len).collect();
    }
    text.chars().take(max_len - ELLIPSIS.len()).collect::<String>() + ELLIPSIS
}
