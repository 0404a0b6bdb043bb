//! 举报存储 - 业务能力层
//!
//! 负责单条举报的写入、查询和删除，保证每个用户对每个题目最多一条举报。
//! 写入举报和更新汇总计数在同一个事务中完成。

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FlagError};
use crate::models::flag::from_unix;
use crate::models::{Flag, FlagReason, FlagWithSubmitter};
use crate::services::events::{EventPublisher, FlagEvent};
use crate::services::question_bank::{full_name, QuestionBank};
use crate::services::status_aggregator::recount_with;

/// 新举报
#[derive(Debug, Clone)]
pub struct NewFlag<'a> {
    pub question_id: i64,
    pub user_id: i64,
    /// 原因代码（未校验）
    pub reason: &'a str,
    pub comment: Option<&'a str>,
    pub attempt_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct FlagRow {
    id: i64,
    question_id: i64,
    user_id: i64,
    attempt_id: Option<i64>,
    reason: String,
    comment: Option<String>,
    created_at: i64,
}

impl TryFrom<FlagRow> for Flag {
    type Error = AppError;

    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        let reason = FlagReason::parse(&row.reason)
            .ok_or_else(|| AppError::Other(format!("无法识别的举报原因: {}", row.reason)))?;
        Ok(Flag {
            id: row.id,
            question_id: row.question_id,
            user_id: row.user_id,
            attempt_id: row.attempt_id,
            reason,
            comment: row.comment,
            created_at: from_unix(row.created_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct FlagWithUserRow {
    #[sqlx(flatten)]
    flag: FlagRow,
    firstname: Option<String>,
    lastname: Option<String>,
}

/// 举报存储
///
/// 职责：
/// - 校验原因、去重、确认题目存在
/// - 写入举报并在同一事务内重新计数
/// - 提交后发布 `FlagCreated` 事件
pub struct FlagStore {
    pool: SqlitePool,
    bank: Arc<dyn QuestionBank>,
    publisher: Arc<EventPublisher>,
}

impl FlagStore {
    pub fn new(pool: SqlitePool, bank: Arc<dyn QuestionBank>, publisher: Arc<EventPublisher>) -> Self {
        Self {
            pool,
            bank,
            publisher,
        }
    }

    /// 提交举报，返回举报ID
    ///
    /// # 错误
    /// - `InvalidReason`: 原因不在登记表中
    /// - `DuplicateFlag`: 该用户已举报过该题目
    /// - `QuestionNotFound`: 题库中没有该题目
    pub async fn submit_flag(&self, new_flag: NewFlag<'_>) -> AppResult<i64> {
        let NewFlag {
            question_id,
            user_id,
            reason,
            comment,
            attempt_id,
        } = new_flag;

        let reason = FlagReason::parse(reason).ok_or_else(|| AppError::invalid_reason(reason))?;

        if self.has_user_flagged(question_id, user_id).await? {
            return Err(FlagError::DuplicateFlag {
                question_id,
                user_id,
            }
            .into());
        }

        if !self.bank.question_exists(question_id).await? {
            return Err(FlagError::QuestionNotFound { question_id }.into());
        }

        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        let attempt_id = attempt_id.filter(|id| *id > 0);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO question_flags (question_id, user_id, attempt_id, reason, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(question_id)
        .bind(user_id)
        .bind(attempt_id)
        .bind(reason.as_str())
        .bind(comment)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await;

        let flag_id = match inserted {
            Ok(result) => result.last_insert_rowid(),
            // 并发提交时由唯一索引兜底
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(FlagError::DuplicateFlag {
                    question_id,
                    user_id,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        recount_with(&mut *tx, question_id).await?;
        tx.commit().await?;

        info!(
            "[题目 {}] ✓ 用户 {} 提交举报 #{} (原因: {})",
            question_id, user_id, flag_id, reason
        );

        self.publisher
            .publish(&FlagEvent::FlagCreated {
                flag_id,
                question_id,
                user_id,
                reason,
            })
            .await;

        Ok(flag_id)
    }

    /// 用户是否已举报过该题目
    pub async fn has_user_flagged(&self, question_id: i64, user_id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM question_flags WHERE question_id = ? AND user_id = ?",
        )
        .bind(question_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// 题目的全部举报（最新在前），附带提交人姓名
    pub async fn list_flags_for_question(&self, question_id: i64) -> AppResult<Vec<FlagWithSubmitter>> {
        let rows = sqlx::query_as::<_, FlagWithUserRow>(
            r#"
            SELECT f.id, f.question_id, f.user_id, f.attempt_id, f.reason, f.comment, f.created_at,
                   u.firstname, u.lastname
            FROM question_flags f
            LEFT JOIN users u ON u.id = f.user_id
            WHERE f.question_id = ?
            ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let submitter_name = full_name(
                    row.firstname.as_deref().unwrap_or_default(),
                    row.lastname.as_deref().unwrap_or_default(),
                    row.flag.user_id,
                );
                Ok(FlagWithSubmitter {
                    flag: Flag::try_from(row.flag)?,
                    submitter_name,
                })
            })
            .collect()
    }

    /// 举报过该题目的用户（去重）
    pub async fn flagger_ids(&self, question_id: i64) -> AppResult<Vec<i64>> {
        load_flagger_ids(&self.pool, question_id).await
    }

    /// 题目当前的举报条数
    pub async fn count_for_question(&self, question_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM question_flags WHERE question_id = ?")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// 删除用户的全部举报并重新计数受影响的题目（隐私数据删除）
    ///
    /// 返回受影响的题目ID。汇总记录本身不会被删除。
    pub async fn erase_user_data(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;

        let question_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT question_id FROM question_flags WHERE user_id = ? ORDER BY question_id",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM question_flags WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for question_id in &question_ids {
            recount_with(&mut *tx, *question_id).await?;
        }

        tx.commit().await?;

        debug!(
            "用户 {} 的 {} 条举报已删除，涉及 {} 个题目",
            user_id,
            deleted.rows_affected(),
            question_ids.len()
        );
        Ok(question_ids)
    }
}

/// 举报过该题目的用户（去重，按ID升序）
pub async fn load_flagger_ids(pool: &SqlitePool, question_id: i64) -> AppResult<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT DISTINCT user_id FROM question_flags WHERE question_id = ? ORDER BY user_id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
