//! 数据库 - 基础设施层
//!
//! 持有唯一的连接池，只暴露"连接"和"建表"的能力

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;

/// 数据库
///
/// 职责：
/// - 持有 SqlitePool
/// - 建表（幂等）
/// - 不认识 Flag / Rollup 的业务规则
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// 按配置连接数据库并初始化表结构
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let in_memory = config.database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.db_busy_timeout_ms));

        // 内存库不支持 WAL
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.db_max_connections.max(1));
        if in_memory {
            // 内存库随连接关闭而消失，连接不能被回收
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        info!("✓ 已连接数据库: {}", config.database_url);

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// 使用已有连接池（调用方负责建表）
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 获取连接池的引用
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 建表（幂等）
    pub async fn init_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("表结构检查完成 ({} 条语句)", SCHEMA.len());
        Ok(())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 表结构
///
/// `users` / `question` / `question_answers` 属于宿主学习平台，
/// 这里建表只为独立运行和测试。
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        firstname TEXT NOT NULL DEFAULT '',
        lastname TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS question (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        question_text TEXT NOT NULL DEFAULT '',
        general_feedback TEXT NOT NULL DEFAULT '',
        modified_at INTEGER NOT NULL DEFAULT 0,
        modified_by INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS question_answers (
        id INTEGER PRIMARY KEY,
        question_id INTEGER NOT NULL REFERENCES question(id) ON DELETE CASCADE,
        answer TEXT NOT NULL DEFAULT '',
        feedback TEXT NOT NULL DEFAULT '',
        fraction REAL NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_question_answers_question ON question_answers(question_id)",
    r#"
    CREATE TABLE IF NOT EXISTS question_flags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        attempt_id INTEGER,
        reason TEXT NOT NULL,
        comment TEXT,
        created_at INTEGER NOT NULL,
        UNIQUE (question_id, user_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_question_flags_user ON question_flags(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS question_flag_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        question_id INTEGER NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'pending',
        flag_count INTEGER NOT NULL DEFAULT 0,
        resolved_by INTEGER,
        resolution TEXT,
        resolution_feedback TEXT,
        created_at INTEGER NOT NULL,
        modified_at INTEGER NOT NULL,
        resolved_at INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_flag_status_status ON question_flag_status(status)",
];
