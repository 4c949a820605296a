pub mod js_executor;
pub mod page_driver;
pub mod storage;

pub use js_executor::JsExecutor;
pub use page_driver::{ChromiumDriver, PageDriver};
pub use storage::{MemoryStore, PgStore, SubmissionStore};
