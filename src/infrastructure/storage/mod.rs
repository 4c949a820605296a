//! 提交记录存储 - 基础设施层
//!
//! 表结构（逻辑）：
//!
//! ```text
//! id (自增) | student_name | code | question | llm_response (可空)
//! UNIQUE (student_name, question)
//! ```

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::SubmissionRecord;

/// 提交记录存储能力
///
/// 每次写入立即持久化，不做批量提交。
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// 按 (student_name, question) 插入或覆盖 code，不触碰 llm_response
    async fn upsert_submission(
        &self,
        student_name: &str,
        code: &str,
        question: &str,
    ) -> Result<u64, StorageError>;

    /// 指定题目下尚未评分的记录，按 id 升序
    async fn pending_for_grading(
        &self,
        question: &str,
    ) -> Result<Vec<SubmissionRecord>, StorageError>;

    /// 写入评分结果
    async fn record_grade(&self, id: i64, llm_response: &str) -> Result<u64, StorageError>;
}
