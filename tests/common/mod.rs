//! 集成测试公共工具：内存数据库、种子数据、通知替身
#![allow(dead_code)]

use async_trait::async_trait;
use question_moderation::error::{AppError, AppResult};
use question_moderation::models::{Answer, AnswerField, Question, QuestionField};
use question_moderation::services::{
    DeliveryError, FlagNotification, Notifier, QuestionBank, SqliteQuestionBank, UserRecord,
};
use question_moderation::{App, Config};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 记录所有发送的通知
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<FlagNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<FlagNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: i64) -> Vec<FlagNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient_id == user_id)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &FlagNotification) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// 对指定用户返回失败，其余用户正常记录
pub struct FailingNotifier {
    fail_for: HashSet<i64>,
    pub inner: RecordingNotifier,
}

impl FailingNotifier {
    pub fn new(fail_for: impl IntoIterator<Item = i64>) -> Self {
        Self {
            fail_for: fail_for.into_iter().collect(),
            inner: RecordingNotifier::default(),
        }
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, notification: &FlagNotification) -> Result<(), DeliveryError> {
        if self.fail_for.contains(&notification.recipient_id) {
            return Err(DeliveryError::Rejected {
                recipient_id: notification.recipient_id,
                status: 503,
            });
        }
        self.inner.send(notification).await
    }
}

/// 查询指定用户时返回错误，其余操作交给真实题库
pub struct UserLookupFailingBank {
    inner: SqliteQuestionBank,
    fail_for: HashSet<i64>,
}

impl UserLookupFailingBank {
    pub fn new(pool: SqlitePool, fail_for: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inner: SqliteQuestionBank::new(pool),
            fail_for: fail_for.into_iter().collect(),
        }
    }
}

#[async_trait]
impl QuestionBank for UserLookupFailingBank {
    async fn question_exists(&self, question_id: i64) -> AppResult<bool> {
        self.inner.question_exists(question_id).await
    }

    async fn get_question(&self, question_id: i64) -> AppResult<Option<Question>> {
        self.inner.get_question(question_id).await
    }

    async fn find_answer(&self, question_id: i64, answer_id: i64) -> AppResult<Option<Answer>> {
        self.inner.find_answer(question_id, answer_id).await
    }

    async fn update_question_field(
        &self,
        question_id: i64,
        field: QuestionField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()> {
        self.inner
            .update_question_field(question_id, field, value, modified_by)
            .await
    }

    async fn update_answer_field(
        &self,
        question_id: i64,
        answer_id: i64,
        field: AnswerField,
        value: &str,
        modified_by: i64,
    ) -> AppResult<()> {
        self.inner
            .update_answer_field(question_id, answer_id, field, value, modified_by)
            .await
    }

    async fn set_answer_fractions(
        &self,
        question_id: i64,
        correct_answer_id: i64,
        full: f64,
        penalty: f64,
        modified_by: i64,
    ) -> AppResult<()> {
        self.inner
            .set_answer_fractions(question_id, correct_answer_id, full, penalty, modified_by)
            .await
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<UserRecord>> {
        if self.fail_for.contains(&user_id) {
            return Err(AppError::Other(format!("user directory unavailable for {}", user_id)));
        }
        self.inner.get_user(user_id).await
    }
}

/// 测试环境：应用 + 临时目录（审计日志）
pub struct TestEnv {
    pub app: App,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn pool(&self) -> &SqlitePool {
        self.app.database().pool()
    }

    pub fn audit_log(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("audit.log")).unwrap_or_default()
    }
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        audit_log_file: dir.path().join("audit.log").to_string_lossy().to_string(),
        ..Config::in_memory()
    }
}

pub async fn setup_with(notifier: Arc<dyn Notifier>, configure: impl FnOnce(&mut Config)) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    configure(&mut config);
    let app = App::with_notifier(config, notifier).await.unwrap();
    TestEnv { app, dir }
}

pub async fn setup(notifier: Arc<dyn Notifier>) -> TestEnv {
    setup_with(notifier, |_| {}).await
}

/// 文件数据库（WAL，多连接），用于并发测试
pub async fn setup_file_backed(notifier: Arc<dyn Notifier>, max_connections: u32) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("moderation.db").display()),
        db_max_connections: max_connections,
        db_busy_timeout_ms: 30_000,
        ..test_config(&dir)
    };
    let app = App::with_notifier(config, notifier).await.unwrap();
    TestEnv { app, dir }
}

pub async fn seed_user(pool: &SqlitePool, id: i64, firstname: &str, lastname: &str) {
    sqlx::query("INSERT INTO users (id, firstname, lastname, email) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(firstname)
        .bind(lastname)
        .bind(format!("user{}@example.com", id))
        .execute(pool)
        .await
        .unwrap();
}

pub async fn mark_user_deleted(pool: &SqlitePool, id: i64) {
    sqlx::query("UPDATE users SET deleted = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_question(pool: &SqlitePool, id: i64, name: &str, text: &str) {
    sqlx::query("INSERT INTO question (id, name, question_text, general_feedback, modified_at) VALUES (?, ?, ?, '', 0)")
        .bind(id)
        .bind(name)
        .bind(text)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_answer(pool: &SqlitePool, id: i64, question_id: i64, text: &str, fraction: f64) {
    sqlx::query("INSERT INTO question_answers (id, question_id, answer, feedback, fraction) VALUES (?, ?, ?, '', ?)")
        .bind(id)
        .bind(question_id)
        .bind(text)
        .bind(fraction)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn answer_fraction(pool: &SqlitePool, answer_id: i64) -> f64 {
    sqlx::query_scalar("SELECT fraction FROM question_answers WHERE id = ?")
        .bind(answer_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// 用户 1..=n 和题目 42（带三个答案）
pub async fn seed_basic(pool: &SqlitePool, users: i64) {
    for id in 1..=users {
        seed_user(pool, id, &format!("User{}", id), "Test").await;
    }
    seed_question(pool, 42, "Capital of France", "<p>What is the <b>capital</b> of France?</p>").await;
    seed_answer(pool, 421, 42, "Paris", 1.0).await;
    seed_answer(pool, 422, 42, "Lyon", 0.0).await;
    seed_answer(pool, 423, 42, "Nice", 0.0).await;
}
