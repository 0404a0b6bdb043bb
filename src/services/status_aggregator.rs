//! 举报汇总 - 业务能力层
//!
//! 每个被举报题目一条汇总记录（状态 + 举报数 + 处理结果）。
//!
//! ## 计数规则
//!
//! - 没有汇总记录：以 pending 状态和当前举报数创建
//! - pending / reviewing：覆盖举报数并更新修改时间
//! - resolved / dismissed：举报数冻结为关闭时的值，不再跟踪
//!
//! 计数在同一条 SQL 语句内完成（`INSERT ... ON CONFLICT DO UPDATE`），
//! 并发提交同一题目的举报不会写入过期的计数。

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::flag::from_unix;
use crate::models::{FlagReason, FlagStatus, FlagStatusRollup, FlaggedQuestion, Resolution, StatusCounts};

const RECOUNT_SQL: &str = r#"
    INSERT INTO question_flag_status (question_id, status, flag_count, created_at, modified_at)
    SELECT ?, 'pending', c, ?, ?
    FROM (SELECT COUNT(*) AS c FROM question_flags WHERE question_id = ?)
    WHERE c > 0 OR EXISTS (SELECT 1 FROM question_flag_status WHERE question_id = ?)
    ON CONFLICT(question_id) DO UPDATE SET
        flag_count = excluded.flag_count,
        modified_at = excluded.modified_at
    WHERE question_flag_status.status IN ('pending', 'reviewing')
"#;

pub(crate) const ROLLUP_COLUMNS: &str = "id, question_id, status, flag_count, resolved_by, resolution, \
     resolution_feedback, created_at, modified_at, resolved_at";

/// 汇总表的一行
#[derive(sqlx::FromRow)]
pub(crate) struct RollupRow {
    id: i64,
    question_id: i64,
    status: String,
    flag_count: i64,
    resolved_by: Option<i64>,
    resolution: Option<String>,
    resolution_feedback: Option<String>,
    created_at: i64,
    modified_at: i64,
    resolved_at: Option<i64>,
}

impl TryFrom<RollupRow> for FlagStatusRollup {
    type Error = AppError;

    fn try_from(row: RollupRow) -> Result<Self, Self::Error> {
        let status = FlagStatus::parse(&row.status)
            .ok_or_else(|| AppError::Other(format!("无法识别的汇总状态: {}", row.status)))?;
        let resolution = match row.resolution.as_deref() {
            None | Some("") => None,
            Some(code) => Some(
                Resolution::parse(code)
                    .ok_or_else(|| AppError::Other(format!("无法识别的处理结果: {}", code)))?,
            ),
        };

        Ok(FlagStatusRollup {
            id: row.id,
            question_id: row.question_id,
            status,
            flag_count: row.flag_count,
            resolved_by: row.resolved_by,
            resolution,
            resolution_feedback: row.resolution_feedback,
            created_at: from_unix(row.created_at),
            modified_at: from_unix(row.modified_at),
            resolved_at: row.resolved_at.map(from_unix),
        })
    }
}

#[derive(sqlx::FromRow)]
struct FlaggedQuestionRow {
    #[sqlx(flatten)]
    rollup: RollupRow,
    question_name: String,
    question_text_preview: String,
}

/// 重新计算题目的举报数（幂等）
///
/// 可以在举报写入的同一事务内执行（传入 `&mut *tx`），也可以直接传入连接池。
pub async fn recount_with<'e, E>(executor: E, question_id: i64) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().timestamp();
    let result = sqlx::query(RECOUNT_SQL)
        .bind(question_id)
        .bind(now)
        .bind(now)
        .bind(question_id)
        .bind(question_id)
        .execute(executor)
        .await?;

    debug!(
        "[题目 {}] 重新计数，影响 {} 行",
        question_id,
        result.rows_affected()
    );
    Ok(())
}

/// 举报汇总服务
#[derive(Clone)]
pub struct StatusAggregator {
    pool: SqlitePool,
}

impl StatusAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 重新计算题目的举报数（幂等）
    pub async fn recount(&self, question_id: i64) -> AppResult<()> {
        recount_with(&self.pool, question_id).await
    }

    /// 读取题目的汇总记录
    pub async fn get_rollup(&self, question_id: i64) -> AppResult<Option<FlagStatusRollup>> {
        let sql = format!(
            "SELECT {} FROM question_flag_status WHERE question_id = ?",
            ROLLUP_COLUMNS
        );
        let row = sqlx::query_as::<_, RollupRow>(&sql)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(FlagStatusRollup::try_from).transpose()
    }

    /// 各状态的汇总记录数量（含总数）
    pub async fn counts_by_status(&self) -> AppResult<StatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM question_flag_status GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match FlagStatus::parse(&status) {
                Some(status) => counts.add(status, count),
                None => debug!("忽略无法识别的状态: {}", status),
            }
        }
        Ok(counts)
    }

    /// 题目最常见的举报原因
    ///
    /// 平票时取声明顺序靠前的原因，结果稳定。
    pub async fn top_reason(&self, question_id: i64) -> AppResult<Option<FlagReason>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT reason, COUNT(*) FROM question_flags WHERE question_id = ? GROUP BY reason",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pick_top_reason(
            rows.into_iter()
                .filter_map(|(code, count)| FlagReason::parse(&code).map(|r| (r, count))),
        ))
    }

    /// 审核队列
    ///
    /// 按举报数降序、修改时间降序排列。
    pub async fn list_flagged_questions(
        &self,
        status: Option<FlagStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<FlaggedQuestion>> {
        let status_code = status.map(FlagStatus::as_str);
        let sql = format!(
            r#"
            SELECT {cols},
                   q.name AS question_name,
                   SUBSTR(q.question_text, 1, 200) AS question_text_preview
            FROM question_flag_status fs
            JOIN question q ON q.id = fs.question_id
            WHERE (? IS NULL OR fs.status = ?)
            ORDER BY fs.flag_count DESC, fs.modified_at DESC, fs.question_id ASC
            LIMIT ? OFFSET ?
            "#,
            cols = prefixed_rollup_columns("fs")
        );

        let rows = sqlx::query_as::<_, FlaggedQuestionRow>(&sql)
            .bind(status_code)
            .bind(status_code)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(FlaggedQuestion {
                    rollup: FlagStatusRollup::try_from(row.rollup)?,
                    question_name: row.question_name,
                    question_text_preview: row.question_text_preview,
                })
            })
            .collect()
    }

    /// pending → reviewing，返回是否发生了变更
    pub async fn mark_reviewing(&self, question_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE question_flag_status SET status = 'reviewing', modified_at = ? WHERE question_id = ? AND status = 'pending'",
        )
        .bind(Utc::now().timestamp())
        .bind(question_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 关闭汇总记录
    ///
    /// 只有 pending / reviewing 状态可以关闭，同一时刻只有一个关闭动作能成功。
    /// 成功时返回关闭后的记录；返回 None 表示没有汇总记录或者已经关闭。
    pub async fn close(
        &self,
        question_id: i64,
        status: FlagStatus,
        closed_by: i64,
        resolution: Resolution,
        feedback: &str,
    ) -> AppResult<Option<FlagStatusRollup>> {
        let now = Utc::now().timestamp();
        let sql = format!(
            r#"
            UPDATE question_flag_status
            SET status = ?, resolved_by = ?, resolution = ?, resolution_feedback = ?,
                resolved_at = ?, modified_at = ?
            WHERE question_id = ? AND status IN ('pending', 'reviewing')
            RETURNING {}
            "#,
            ROLLUP_COLUMNS
        );
        let row = sqlx::query_as::<_, RollupRow>(&sql)
            .bind(status.as_str())
            .bind(closed_by)
            .bind(resolution.as_str())
            .bind(feedback)
            .bind(now)
            .bind(now)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(FlagStatusRollup::try_from).transpose()
    }

    /// 对所有有举报或有汇总记录的题目重新计数
    ///
    /// 用于修复异常中断后可能不一致的计数，返回处理的题目数量。
    pub async fn reconcile_all(&self) -> AppResult<usize> {
        let question_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT question_id FROM question_flags UNION SELECT question_id FROM question_flag_status",
        )
        .fetch_all(&self.pool)
        .await?;

        for question_id in &question_ids {
            self.recount(*question_id).await?;
        }

        info!("✓ 已重新计数 {} 个题目", question_ids.len());
        Ok(question_ids.len())
    }
}

/// 取出现次数最多的原因，平票时取声明顺序靠前者
fn pick_top_reason(counts: impl Iterator<Item = (FlagReason, i64)>) -> Option<FlagReason> {
    counts
        .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then_with(|| rb.cmp(ra)))
        .map(|(reason, _)| reason)
}

fn prefixed_rollup_columns(alias: &str) -> String {
    ROLLUP_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
