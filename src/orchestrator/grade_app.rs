//! 评分应用 - 编排层

use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::PgStore;
use crate::services::LlmScorer;
use crate::utils::logging::{log_startup, print_grading_stats};
use crate::workflow::{GradingDispatcher, GradingReport};

/// 评分应用
pub struct GradeApp {
    config: Config,
    store: PgStore,
    scorer: LlmScorer,
}

impl GradeApp {
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup("评分", &config);

        let scorer = LlmScorer::new(&config)?;
        info!(
            "🤖 模型: {}（每分钟最多 {} 次请求）",
            config.llm_model_name, config.requests_per_minute
        );
        let store = PgStore::connect(&config).await?;

        Ok(Self {
            config,
            store,
            scorer,
        })
    }

    pub async fn run(self) -> AppResult<GradingReport> {
        let result = GradingDispatcher::new(&self.store, &self.scorer, &self.config)
            .grade_all(&self.config.question)
            .await;

        self.store.close().await;

        let report = result?;
        print_grading_stats(&report);
        Ok(report)
    }
}

/// 建表
pub async fn init_db(config: &Config) -> AppResult<()> {
    log_startup("建表", config);
    let store = PgStore::connect(config).await?;
    let result = store.ensure_schema().await;
    store.close().await;
    Ok(result?)
}
