//! 题库 - 业务能力层
//!
//! 题目和答案由宿主平台的题库拥有，这里只暴露审核需要的窄接口：
//! 按ID读取、存在性检查、修改指定字段、查询用户目录。

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{AppResult, PatchError};
use crate::models::flag::from_unix;
use crate::models::{Answer, AnswerField, Question, QuestionField};

/// 用户目录中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub full_name: String,
    pub deleted: bool,
}

/// 题库接口
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// 题目是否存在
    async fn question_exists(&self, question_id: i64) -> AppResult<bool>;

    /// 读取题目及其全部答案
    async fn get_question(&self, question_id: i64) -> AppResult<Option<Question>>;

    /// 读取属于 `question_id` 的答案；答案不存在或属于其他题目时返回 None
    async fn find_answer(&self, question_id: i64, answer_id: i64) -> AppResult<Option<Answer>>;

    /// 覆盖题目字段，同时记录修改时间和修改人
    async fn update_question_field(
        &self,
        question_id: i64,
        field: QuestionField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()>;

    /// 覆盖答案字段，同时记录所属题目的修改时间和修改人
    async fn update_answer_field(
        &self,
        question_id: i64,
        answer_id: i64,
        field: AnswerField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()>;

    /// 把 `correct_answer_id` 设为 `full` 分，其余同题答案设为 `penalty` 分（原子操作）
    async fn set_answer_fractions(
        &self,
        question_id: i64,
        correct_answer_id: i64,
        full: f64,
        penalty: f64,
        modified_by: i64,
    ) -> AppResult<()>;

    /// 查询用户
    async fn get_user(&self, user_id: i64) -> AppResult<Option<UserRecord>>;
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    name: String,
    question_text: String,
    general_feedback: String,
    modified_at: i64,
    modified_by: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    id: i64,
    question_id: i64,
    answer: String,
    feedback: String,
    fraction: f64,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            question_id: row.question_id,
            text: row.answer,
            feedback: row.feedback,
            fraction: row.fraction,
        }
    }
}

/// 基于宿主平台 SQLite 表的题库实现
#[derive(Clone)]
pub struct SqliteQuestionBank {
    pool: SqlitePool,
}

impl SqliteQuestionBank {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBank for SqliteQuestionBank {
    async fn question_exists(&self, question_id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM question WHERE id = ?")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn get_question(&self, question_id: i64) -> AppResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, name, question_text, general_feedback, modified_at, modified_by
            FROM question
            WHERE id = ?
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers = sqlx::query_as::<_, AnswerRow>(
            "SELECT id, question_id, answer, feedback, fraction FROM question_answers WHERE question_id = ? ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Question {
            id: row.id,
            name: row.name,
            question_text: row.question_text,
            general_feedback: row.general_feedback,
            modified_at: from_unix(row.modified_at),
            modified_by: row.modified_by,
            answers: answers.into_iter().map(Answer::from).collect(),
        }))
    }

    async fn find_answer(&self, question_id: i64, answer_id: i64) -> AppResult<Option<Answer>> {
        let row = sqlx::query_as::<_, AnswerRow>(
            "SELECT id, question_id, answer, feedback, fraction FROM question_answers WHERE id = ? AND question_id = ?",
        )
        .bind(answer_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Answer::from))
    }

    async fn update_question_field(
        &self,
        question_id: i64,
        field: QuestionField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()> {
        // 列名来自封闭枚举，不含用户输入
        let sql = format!(
            "UPDATE question SET {} = ?, modified_at = ?, modified_by = ? WHERE id = ?",
            field.column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(Utc::now().timestamp())
            .bind(modified_by)
            .bind(question_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PatchError::QuestionNotFound { question_id }.into());
        }
        debug!("[题目 {}] 已更新字段 {}", question_id, field.column());
        Ok(())
    }

    async fn update_answer_field(
        &self,
        question_id: i64,
        answer_id: i64,
        field: AnswerField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE question_answers SET {} = ? WHERE id = ? AND question_id = ?",
            field.column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(answer_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PatchError::AnswerNotOwnedByQuestion {
                question_id,
                answer_id,
            }
            .into());
        }

        touch_question(&mut tx, question_id, modified_by).await?;
        tx.commit().await?;

        debug!("[题目 {}] 已更新答案 {} 的 {}", question_id, answer_id, field.column());
        Ok(())
    }

    async fn set_answer_fractions(
        &self,
        question_id: i64,
        correct_answer_id: i64,
        full: f64,
        penalty: f64,
        modified_by: i64,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM question_answers WHERE id = ? AND question_id = ?",
        )
        .bind(correct_answer_id)
        .bind(question_id)
        .fetch_optional(&mut *tx)
        .await?;

        if owned.is_none() {
            return Err(PatchError::AnswerNotOwnedByQuestion {
                question_id,
                answer_id: correct_answer_id,
            }
            .into());
        }

        let result = sqlx::query(
            "UPDATE question_answers SET fraction = CASE WHEN id = ? THEN ? ELSE ? END WHERE question_id = ?",
        )
        .bind(correct_answer_id)
        .bind(full)
        .bind(penalty)
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

        touch_question(&mut tx, question_id, modified_by).await?;
        tx.commit().await?;

        debug!(
            "[题目 {}] 正确答案设为 {}，共更新 {} 个选项",
            question_id,
            correct_answer_id,
            result.rows_affected()
        );
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<UserRecord>> {
        let row: Option<(i64, String, String, bool)> = sqlx::query_as(
            "SELECT id, firstname, lastname, deleted FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, firstname, lastname, deleted)| UserRecord {
            id,
            full_name: full_name(&firstname, &lastname, id),
            deleted,
        }))
    }
}

/// 记录题目的修改时间和修改人
async fn touch_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    question_id: i64,
    modified_by: i64,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE question SET modified_at = ?, modified_by = ? WHERE id = ?")
        .bind(Utc::now().timestamp())
        .bind(modified_by)
        .bind(question_id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PatchError::QuestionNotFound { question_id }.into());
    }
    Ok(())
}

/// 拼接显示姓名，姓名为空时使用 `user <id>`
pub fn full_name(firstname: &str, lastname: &str, user_id: i64) -> String {
    let name = format!("{} {}", firstname.trim(), lastname.trim());
    let name = name.trim();
    if name.is_empty() {
        format!("user {}", user_id)
    } else {
        name.to_string()
    }
}
