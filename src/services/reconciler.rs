//! 写入协调 - 业务能力层
//!
//! 把一页解析结果逐条写入存储。单条失败只记录日志，连接级错误立即上抛。

use tracing::{debug, error};

use crate::error::AppResult;
use crate::infrastructure::SubmissionStore;
use crate::models::Submission;

/// 一批写入的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub written: usize,
    pub failed: usize,
}

pub struct Reconciler<'a, S: SubmissionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SubmissionStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// 按顺序 upsert 每条记录（唯一键：学生姓名 + 题目）
    pub async fn persist(&self, records: &[Submission], question: &str) -> AppResult<PersistReport> {
        let mut report = PersistReport::default();

        for record in records {
            match self
                .store
                .upsert_submission(&record.student_name, &record.content, question)
                .await
            {
                Ok(_) => {
                    debug!("  ✓ 已保存: {}", record.student_name);
                    report.written += 1;
                }
                Err(e) if e.is_connection_level() => {
                    error!("数据库连接失败，终止写入: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("  ✗ 保存 {} 失败: {}", record.student_name, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::StorageError;
    use crate::infrastructure::MemoryStore;
    use crate::models::SubmissionRecord;

    /// 对指定学生拒绝写入，或者对所有写入报告连接断开
    struct FlakyStore {
        inner: MemoryStore,
        reject: &'static str,
        disconnected: bool,
    }

    #[async_trait]
    impl SubmissionStore for FlakyStore {
        async fn upsert_submission(
            &self,
            student_name: &str,
            code: &str,
            question: &str,
        ) -> Result<u64, StorageError> {
            if self.disconnected {
                return Err(StorageError::ConnectionLost {
                    source: "connection reset".into(),
                });
            }
            if student_name == self.reject {
                return Err(StorageError::QueryFailed {
                    source: "value too long for type character varying(255)".into(),
                });
            }
            self.inner.upsert_submission(student_name, code, question).await
        }

        async fn pending_for_grading(
            &self,
            question: &str,
        ) -> Result<Vec<SubmissionRecord>, StorageError> {
            self.inner.pending_for_grading(question).await
        }

        async fn record_grade(&self, id: i64, llm_response: &str) -> Result<u64, StorageError> {
            self.inner.record_grade(id, llm_response).await
        }
    }

    fn batch() -> Vec<Submission> {
        vec![
            Submission::new("Ada", "a1"),
            Submission::new("Bob", "b1"),
            Submission::new("Cy", "c1"),
        ]
    }

    #[tokio::test]
    async fn test_idempotent_rescrape_keeps_one_row_with_latest_content() {
        let store = MemoryStore::new();
        let reconciler = Reconciler::new(&store);

        reconciler.persist(&batch(), "Q1").await.unwrap();
        let updated = vec![Submission::new("Ada", "a2")];
        let report = reconciler.persist(&updated, "Q1").await.unwrap();
        assert_eq!(report, PersistReport { written: 1, failed: 0 });

        let rows = store.rows().await;
        assert_eq!(rows.len(), 3);
        let ada: Vec<_> = rows.iter().filter(|r| r.student_name == "Ada").collect();
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[0].code, "a2");
    }

    #[tokio::test]
    async fn test_rescrape_never_clears_grade() {
        let store = MemoryStore::new();
        store.seed("Ada", "old", "Q1", Some("nice $ 8")).await;

        Reconciler::new(&store)
            .persist(&[Submission::new("Ada", "new")], "Q1")
            .await
            .unwrap();

        let rows = store.rows().await;
        assert_eq!(rows[0].code, "new");
        assert_eq!(rows[0].llm_response.as_deref(), Some("nice $ 8"));
    }

    #[tokio::test]
    async fn test_record_failure_does_not_stop_batch() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            reject: "Bob",
            disconnected: false,
        };

        let report = Reconciler::new(&store).persist(&batch(), "Q1").await.unwrap();
        assert_eq!(report, PersistReport { written: 2, failed: 1 });

        let names: Vec<String> = store
            .inner
            .rows()
            .await
            .into_iter()
            .map(|r| r.student_name)
            .collect();
        assert_eq!(names, vec!["Ada", "Cy"]);
    }

    #[tokio::test]
    async fn test_connection_failure_aborts() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            reject: "",
            disconnected: true,
        };

        let result = Reconciler::new(&store).persist(&batch(), "Q1").await;
        let err = result.unwrap_err();
        assert!(err.is_connection_level());
    }
}
