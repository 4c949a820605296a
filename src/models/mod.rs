pub mod selectors;
pub mod submission;
pub mod verdict;

pub use selectors::PageSelectors;
pub use submission::{PaginationCursor, Submission, SubmissionRecord};
pub use verdict::Verdict;
