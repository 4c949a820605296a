use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use super::SubmissionStore;
use crate::config::Config;
use crate::error::StorageError;
use crate::models::SubmissionRecord;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL 存储
///
/// 单连接、自动提交：每条语句执行完即落盘。
pub struct PgStore {
    client: Client,
    connection: JoinHandle<()>,
    table: String,
}

impl PgStore {
    /// 按配置建立连接
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.db_host)
            .port(config.db_port)
            .user(&config.db_user)
            .dbname(&config.db_name)
            .connect_timeout(CONNECTION_TIMEOUT);
        if !config.db_password.is_empty() {
            pg_config.password(&config.db_password);
        }

        info!("正在连接数据库: {}:{}/{}", config.db_host, config.db_port, config.db_name);

        let (client, connection) =
            pg_config
                .connect(NoTls)
                .await
                .map_err(|e| StorageError::ConnectFailed {
                    host: config.db_host.clone(),
                    port: config.db_port,
                    source: Box::new(e),
                })?;

        // 在后台驱动连接
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("数据库连接异常结束: {}", e);
            }
        });

        info!("✓ 数据库已连接");

        Ok(Self {
            client,
            connection,
            table: config.table_name.clone(),
        })
    }

    /// 建表（已存在则跳过）
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id BIGSERIAL PRIMARY KEY, \
                student_name TEXT NOT NULL, \
                code TEXT NOT NULL, \
                question TEXT NOT NULL, \
                llm_response TEXT, \
                UNIQUE (student_name, question))",
            self.table
        );
        self.client.batch_execute(&sql).await?;
        info!("✓ 数据表 {} 已就绪", self.table);
        Ok(())
    }

    /// 关闭连接
    pub async fn close(self) {
        drop(self.client);
        if let Err(e) = self.connection.await {
            error!("等待数据库连接关闭失败: {}", e);
        }
        info!("数据库连接已关闭");
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (student_name, code, question) VALUES ($1, $2, $3) \
             ON CONFLICT (student_name, question) DO UPDATE SET code = EXCLUDED.code",
            self.table
        )
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn upsert_submission(
        &self,
        student_name: &str,
        code: &str,
        question: &str,
    ) -> Result<u64, StorageError> {
        let n = self
            .client
            .execute(&self.upsert_sql(), &[&student_name, &code, &question])
            .await?;
        debug!("upsert {} / {} -> {} 行", student_name, question, n);
        Ok(n)
    }

    async fn pending_for_grading(
        &self,
        question: &str,
    ) -> Result<Vec<SubmissionRecord>, StorageError> {
        let sql = format!(
            "SELECT id::bigint, student_name, code, question FROM {} \
             WHERE llm_response IS NULL AND question = $1 ORDER BY id",
            self.table
        );
        let rows = self.client.query(&sql, &[&question]).await?;

        rows.into_iter()
            .map(|row| -> Result<SubmissionRecord, StorageError> {
                Ok(SubmissionRecord {
                    id: row.try_get(0)?,
                    student_name: row.try_get(1)?,
                    code: row.try_get(2)?,
                    question: row.try_get(3)?,
                    llm_response: None,
                })
            })
            .collect()
    }

    async fn record_grade(&self, id: i64, llm_response: &str) -> Result<u64, StorageError> {
        let sql = format!(
            "UPDATE {} SET llm_response = $1 WHERE id = $2::bigint",
            self.table
        );
        Ok(self.client.execute(&sql, &[&llm_response, &id]).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Submission;
    use crate::services::Reconciler;

    /// 需要本地 PostgreSQL：
    /// `TABLE_NAME=grader_test DB_USER=postgres DB_NAME=postgres cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_live_upsert_is_idempotent() {
        let config = Config::from_env().expect("配置无效");
        let store = PgStore::connect(&config).await.expect("连接数据库失败");
        store.ensure_schema().await.expect("建表失败");

        let reconciler = Reconciler::new(&store);
        let batch = vec![Submission::new("Live Student", "int x = 1;")];
        reconciler.persist(&batch, "LIVE").await.expect("第一次写入失败");
        reconciler.persist(&batch, "LIVE").await.expect("第二次写入失败");

        let pending = store.pending_for_grading("LIVE").await.expect("查询失败");
        let count = pending
            .iter()
            .filter(|r| r.student_name == "Live Student")
            .count();
        assert!(count <= 1);

        store.close().await;
    }
}
