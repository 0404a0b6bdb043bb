//! # Question Moderation
//!
//! 题库题目的举报与审核服务：学员举报有问题的题目，审核人处理后通知所有举报人
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（SqlitePool），只暴露能力
//! - `Database` - 唯一的连接池 owner，负责建表
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个题目
//! - `FlagStore` - 举报写入、去重、隐私删除
//! - `StatusAggregator` - 汇总计数、审核队列、状态统计
//! - `NotificationDispatcher` - 按收件人逐个发送通知
//! - `EventPublisher` - 事件发布（审计日志、审核人提醒）
//! - `QuestionBank` - 题库读写接口
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个被举报题目"的处理流程
//! - `ModerationWorkflow` - pending → reviewing → resolved / dismissed
//! - `FieldPatcher` - 审核界面的字段修改
//!
//! ### ④ 接口层与编排层
//! - `api/` - `FlagApi`，可序列化的请求 / 响应
//! - `orchestrator/` - `App`，组装组件和维护任务
//!
//! ## 模块结构

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{Caller, FlagApi};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::Database;
pub use models::{FieldTarget, FlagReason, FlagStatus, LabelCatalog, Resolution};
pub use orchestrator::App;
pub use services::{DispatchReport, FlagNotification, Notifier};
pub use workflow::{ClosedReport, FieldPatcher, ModerationWorkflow};
