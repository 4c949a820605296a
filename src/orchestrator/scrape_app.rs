//! 抓取应用 - 编排层
//!
//! 唯一持有浏览器和数据库连接的模块。无论抓取成功与否，`run` 结束前都会释放两者。

use std::path::PathBuf;

use tracing::{error, info};

use crate::browser::{self, BrowserHandle};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{
    ChromiumDriver, JsExecutor, MemoryStore, PageDriver, PgStore, SubmissionStore,
};
use crate::utils::logging::{log_startup, print_scrape_stats};
use crate::utils::truncate_text;
use crate::workflow::{PaginationController, ScrapeReport};

/// 抓取结果的存放位置
enum ScrapeStore {
    Postgres(PgStore),
    /// 试运行：只保存在内存中
    Memory(MemoryStore),
}

impl ScrapeStore {
    fn as_store(&self) -> &dyn SubmissionStore {
        match self {
            ScrapeStore::Postgres(store) => store,
            ScrapeStore::Memory(store) => store,
        }
    }

    async fn close(self) {
        match self {
            ScrapeStore::Postgres(store) => store.close().await,
            ScrapeStore::Memory(store) => {
                let rows = store.rows().await;
                info!("试运行结束，内存中共 {} 条记录：", rows.len());
                for row in rows {
                    info!("  - {}: {}", row.student_name, truncate_text(&row.code, 60));
                }
            }
        }
    }
}

/// 抓取应用
pub struct ScrapeApp {
    config: Config,
    browser: BrowserHandle,
    driver: ChromiumDriver,
    store: ScrapeStore,
}

impl ScrapeApp {
    /// 初始化：先连接数据库，再准备浏览器
    pub async fn initialize(config: Config, dry_run: bool) -> AppResult<Self> {
        log_startup(if dry_run { "抓取（试运行）" } else { "抓取" }, &config);

        let store = if dry_run {
            info!("试运行模式：结果不写入数据库");
            ScrapeStore::Memory(MemoryStore::new())
        } else {
            ScrapeStore::Postgres(PgStore::connect(&config).await?)
        };

        let (browser, page) = match BrowserHandle::open(&config).await {
            Ok(opened) => opened,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };

        Ok(Self {
            config,
            browser,
            driver: ChromiumDriver::new(JsExecutor::new(page)),
            store,
        })
    }

    /// 登录、翻页抓取，然后释放所有资源
    pub async fn run(self) -> AppResult<ScrapeReport> {
        let result = self.scrape().await;

        if let Err(e) = &result {
            error!("抓取过程中出现错误: {}", e);
            self.save_error_screenshot().await;
        }

        self.shutdown().await;

        let report = result?;
        print_scrape_stats(&report);
        Ok(report)
    }

    async fn scrape(&self) -> AppResult<ScrapeReport> {
        browser::login_and_open(self.driver.executor().page(), &self.config).await?;

        let mut controller =
            PaginationController::new(&self.driver, self.store.as_store(), &self.config);
        controller.run().await
    }

    async fn save_error_screenshot(&self) {
        let path = PathBuf::from(&self.config.diagnostics_dir).join("error_screenshot.png");
        match self.driver.screenshot(&path).await {
            Ok(()) => info!("已保存截图: {}", path.display()),
            Err(e) => error!("保存截图失败: {}", e),
        }
    }

    async fn shutdown(self) {
        self.store.close().await;
        self.browser.close().await;
    }
}
