use std::sync::Arc;
use tracing::info;

use crate::api::FlagApi;
use crate::clients::WebhookNotifier;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::Database;
use crate::models::{load_configured_catalog, LabelCatalog, StatusCounts};
use crate::services::{
    AuditLogWriter, EventPublisher, FlagStore, LogNotifier, NotificationDispatcher, Notifier, QuestionBank,
    ReviewerAlert, SqliteQuestionBank, StatusAggregator,
};
use crate::utils::logging::{log_startup, log_status_counts};
use crate::workflow::{FieldPatcher, ModerationWorkflow};

/// 应用主结构
///
/// 持有数据库连接池和全部组件，组件之间通过 `Arc` 共享。
pub struct App {
    config: Config,
    database: Database,
    labels: Arc<LabelCatalog>,
    store: Arc<FlagStore>,
    aggregator: Arc<StatusAggregator>,
    workflow: Arc<ModerationWorkflow>,
    patcher: Arc<FieldPatcher>,
    api: FlagApi,
}

impl App {
    /// 初始化应用
    ///
    /// 配置了 Webhook 地址时通过 Webhook 发送通知，否则只写日志。
    pub async fn initialize(config: Config) -> AppResult<Self> {
        let notifier: Arc<dyn Notifier> = match WebhookNotifier::from_config(&config) {
            Some(webhook) => {
                info!("📨 通知方式: Webhook ({})", webhook.endpoint());
                Arc::new(webhook)
            }
            None => {
                info!("📨 通知方式: 日志");
                Arc::new(LogNotifier)
            }
        };
        Self::with_notifier(config, notifier).await
    }

    /// 使用指定的通知发送器初始化
    pub async fn with_notifier(config: Config, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        log_startup(&config.database_url, config.reviewer_ids.len());

        let labels = load_configured_catalog(config.labels_file.as_deref()).await?;
        let database = Database::connect(&config).await?;

        Ok(Self::assemble(config, database, labels, notifier))
    }

    /// 组装各层组件
    ///
    /// 顺序：题库 → 通知 → 事件订阅 → 存储 → 流程 → 接口
    fn assemble(config: Config, database: Database, labels: LabelCatalog, notifier: Arc<dyn Notifier>) -> Self {
        let pool = database.pool().clone();
        let labels = Arc::new(labels);

        let bank: Arc<dyn QuestionBank> = Arc::new(SqliteQuestionBank::new(pool.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            pool.clone(),
            bank.clone(),
            notifier,
            labels.clone(),
            config.preview_max_chars,
        ));

        let mut publisher = EventPublisher::new();
        publisher.subscribe(Arc::new(AuditLogWriter::with_path(config.audit_log_file.clone())));
        if !config.reviewer_ids.is_empty() {
            publisher.subscribe(Arc::new(ReviewerAlert::new(
                dispatcher.clone(),
                config.reviewer_ids.clone(),
            )));
        }
        let publisher = Arc::new(publisher);

        let store = Arc::new(FlagStore::new(pool.clone(), bank.clone(), publisher.clone()));
        let aggregator = Arc::new(StatusAggregator::new(pool));
        let workflow = Arc::new(ModerationWorkflow::new(
            aggregator.clone(),
            dispatcher,
            publisher,
            labels.clone(),
        ));
        let patcher = Arc::new(FieldPatcher::new(bank.clone()));

        let api = FlagApi::new(
            store.clone(),
            aggregator.clone(),
            workflow.clone(),
            patcher.clone(),
            bank,
            labels.clone(),
            config.default_page_size,
        );

        Self {
            config,
            database,
            labels,
            store,
            aggregator,
            workflow,
            patcher,
            api,
        }
    }

    /// 维护任务：重新计数所有题目并输出统计
    pub async fn run(&self) -> AppResult<StatusCounts> {
        info!("\n🔧 正在核对举报计数...");
        self.aggregator.reconcile_all().await?;

        let counts = self.aggregator.counts_by_status().await?;
        log_status_counts(&counts);
        Ok(counts)
    }

    /// 关闭连接池
    pub async fn shutdown(self) {
        self.database.close().await;
        info!("👋 已关闭");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn labels(&self) -> &LabelCatalog {
        &self.labels
    }

    pub fn api(&self) -> &FlagApi {
        &self.api
    }

    pub fn store(&self) -> &FlagStore {
        &self.store
    }

    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    pub fn workflow(&self) -> &ModerationWorkflow {
        &self.workflow
    }

    pub fn patcher(&self) -> &FieldPatcher {
        &self.patcher
    }
}
