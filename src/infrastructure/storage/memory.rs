use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SubmissionStore;
use crate::error::StorageError;
use crate::models::SubmissionRecord;

/// 内存存储
///
/// 与数据库表相同的唯一键语义，用于试运行（`scrape --dry-run`）和测试。
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<SubmissionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接插入一行（测试用的预置数据）
    pub async fn seed(&self, student_name: &str, code: &str, question: &str, llm_response: Option<&str>) {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as i64 + 1;
        rows.push(SubmissionRecord {
            id,
            student_name: student_name.to_string(),
            code: code.to_string(),
            question: question.to_string(),
            llm_response: llm_response.map(str::to_string),
        });
    }

    /// 当前所有行的快照，按 id 排序
    pub async fn rows(&self) -> Vec<SubmissionRecord> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn upsert_submission(
        &self,
        student_name: &str,
        code: &str,
        question: &str,
    ) -> Result<u64, StorageError> {
        let mut rows = self.rows.lock().await;

        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.student_name == student_name && r.question == question)
        {
            row.code = code.to_string();
        } else {
            let id = rows.len() as i64 + 1;
            rows.push(SubmissionRecord {
                id,
                student_name: student_name.to_string(),
                code: code.to_string(),
                question: question.to_string(),
                llm_response: None,
            });
        }
        Ok(1)
    }

    async fn pending_for_grading(
        &self,
        question: &str,
    ) -> Result<Vec<SubmissionRecord>, StorageError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|r| r.llm_response.is_none() && r.question == question)
            .cloned()
            .collect())
    }

    async fn record_grade(&self, id: i64, llm_response: &str) -> Result<u64, StorageError> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.llm_response = Some(llm_response.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_overwrites_code_only() {
        let store = MemoryStore::new();
        store.seed("Ada", "old", "Q1", Some("good $ 9")).await;

        store.upsert_submission("Ada", "new", "Q1").await.unwrap();

        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "new");
        assert_eq!(rows[0].llm_response.as_deref(), Some("good $ 9"));
    }

    #[tokio::test]
    async fn test_same_student_different_question_is_new_row() {
        let store = MemoryStore::new();
        store.upsert_submission("Ada", "a", "Q1").await.unwrap();
        store.upsert_submission("Ada", "b", "Q2").await.unwrap();

        assert_eq!(store.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn test_pending_filters_question_and_graded() {
        let store = MemoryStore::new();
        store.seed("Ada", "a", "Q1", None).await;
        store.seed("Bob", "b", "Q1", Some("done $ 3")).await;
        store.seed("Cy", "c", "Q2", None).await;

        let pending = store.pending_for_grading("Q1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].student_name, "Ada");
    }
}
