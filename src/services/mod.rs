//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心流程顺序。

pub mod dom_snapshot;
pub mod extractor;
pub mod reconciler;
pub mod scorer;

pub use dom_snapshot::{DomSnapshot, PageAccessor};
pub use extractor::{Extraction, Extractor};
pub use reconciler::{PersistReport, Reconciler};
pub use scorer::{LlmScorer, Scorer};
