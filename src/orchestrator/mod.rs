//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有稀缺资源（浏览器、数据库连接），组装下层能力并保证资源释放。
//!
//! ## 层次关系
//!
//! ```text
//! scrape_app / grade_app
//!     ↓
//! workflow (PaginationController / GradingDispatcher)
//!     ↓
//! services (Extractor / Reconciler / Scorer)
//!     ↓
//! infrastructure (PageDriver / SubmissionStore)
//! ```

pub mod grade_app;
pub mod scrape_app;

pub use grade_app::{init_db, GradeApp};
pub use scrape_app::ScrapeApp;
