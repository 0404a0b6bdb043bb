//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责组装各层组件和运行维护任务，是整个系统的"指挥中心"。
//!
//! ### `app` - 应用生命周期
//! - 加载标签目录、连接数据库
//! - 注册事件订阅者（审计日志、审核人提醒）
//! - 选择通知发送器（Webhook / 日志）
//! - 维护任务：核对计数并输出统计
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App
//!     ↓
//! api::FlagApi (请求 / 响应)
//!     ↓
//! workflow (ModerationWorkflow / FieldPatcher)
//!     ↓
//! services (存储 / 汇总 / 通知 / 事件)
//!     ↓
//! infrastructure (Database)
//! ```
//!
//! ## 设计原则
//!
//! 1. **只做组装**：不包含业务判断
//! 2. **资源隔离**：只有编排层持有 Database
//! 3. **向下依赖**：编排层 → api → workflow → services → infrastructure

pub mod app;

pub use app::App;
