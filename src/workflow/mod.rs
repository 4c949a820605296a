//! 流程层：决定何时调用哪种能力，不持有任何资源

pub mod grading;
pub mod pagination;

pub use grading::{GradingDispatcher, GradingReport};
pub use pagination::{PageState, PaginationController, ScrapeOutcome, ScrapeReport};
