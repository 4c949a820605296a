//! # Submission Grader
//!
//! 从在线作业平台抓取学生提交的代码，写入 PostgreSQL，再调用 LLM 评分。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、数据库连接），只暴露能力
//! - `JsExecutor` - 唯一的 page owner
//! - `PageDriver` - 翻页流程需要的浏览器原语
//! - `SubmissionStore` - 按 (学生, 题目) upsert 的存储
//!
//! ### ② 业务能力层（Services）
//! - `Extractor` - 从一页 DOM 中解析 (学生, 代码)
//! - `Reconciler` - 逐条写入，单条失败不影响整批
//! - `Scorer` - 给一份代码打分
//!
//! ### ③ 流程层（Workflow）
//! - `PaginationController` - 翻页状态机
//! - `GradingDispatcher` - 限速的串行评分
//!
//! ### ④ 编排层（Orchestration）
//! - `ScrapeApp` / `GradeApp` - 管理资源生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, RunMode};
pub use error::{AppError, AppResult};
pub use infrastructure::{MemoryStore, PageDriver, SubmissionStore};
pub use models::{PageSelectors, Submission, SubmissionRecord};
pub use orchestrator::{GradeApp, ScrapeApp};
pub use services::{Extraction, Extractor, Reconciler, Scorer};
pub use workflow::{
    GradingDispatcher, GradingReport, PaginationController, ScrapeOutcome, ScrapeReport,
};
