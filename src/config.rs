use crate::error::{AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 数据库连接串
    pub database_url: String,
    /// 连接池最大连接数
    pub db_max_connections: u32,
    /// SQLite busy_timeout（毫秒）
    pub db_busy_timeout_ms: u64,
    /// 标签文件（TOML），为空时使用内置英文标签
    pub labels_file: Option<String>,
    /// 审计日志文件
    pub audit_log_file: String,
    /// 通知 Webhook 地址，为空时只记录日志
    pub notify_webhook_url: Option<String>,
    /// 新举报时需要提醒的审核人
    pub reviewer_ids: Vec<i64>,
    /// 通知中题干预览的最大字符数
    pub preview_max_chars: usize,
    /// 列表默认每页数量
    pub default_page_size: i64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://question_flags.db?mode=rwc".to_string(),
            db_max_connections: 5,
            db_busy_timeout_ms: 5000,
            labels_file: None,
            audit_log_file: "flag_audit.log".to_string(),
            notify_webhook_url: None,
            reviewer_ids: Vec::new(),
            preview_max_chars: 150,
            default_page_size: 50,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载，解析失败的项回退到默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(default.database_url),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.db_max_connections),
            db_busy_timeout_ms: std::env::var("DB_BUSY_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.db_busy_timeout_ms),
            labels_file: std::env::var("LABELS_FILE").ok().filter(|v| !v.is_empty()).or(default.labels_file),
            audit_log_file: std::env::var("AUDIT_LOG_FILE").unwrap_or(default.audit_log_file),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok().filter(|v| !v.is_empty()).or(default.notify_webhook_url),
            reviewer_ids: std::env::var("REVIEWER_IDS").ok().and_then(|v| parse_id_list(&v).ok()).unwrap_or(default.reviewer_ids),
            preview_max_chars: std::env::var("PREVIEW_MAX_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.preview_max_chars),
            default_page_size: std::env::var("DEFAULT_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_page_size),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 内存数据库配置，供测试和一次性维护任务使用
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            ..Self::default()
        }
    }
}

/// 解析逗号分隔的用户ID列表
pub fn parse_id_list(raw: &str) -> AppResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                ConfigError::EnvVarParseFailed {
                    var_name: "REVIEWER_IDS".to_string(),
                    value: s.to_string(),
                    expected_type: "i64".to_string(),
                }
                .into()
            })
        })
        .collect()
}
