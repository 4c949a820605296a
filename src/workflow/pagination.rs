//! 翻页状态机 - 流程层
//!
//! ```text
//! Rendering → Ready → Extracting → Advancing → {Ready | Done | Failed}
//! ```
//!
//! - 只通过 [`PageDriver`] 操作页面，只通过 [`SubmissionStore`] 写入
//! - 所有等待都有上限；Ready 超时视为数据结束，翻页确认超时视为失败
//! - 平台翻页不触发导航，只能靠"第一个学生姓名变化"判断新页面已加载

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, SubmissionStore};
use crate::models::PaginationCursor;
use crate::services::{Extractor, Reconciler};

/// 状态机的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// 等待懒渲染完成并滚动到底部（只在开始时执行一次）
    Rendering,
    /// 等待姓名与答题块出现
    Ready,
    /// 解析并写入当前页
    Extracting,
    /// 翻到下一页
    Advancing,
    /// 正常结束
    Done,
    /// 翻页失败，已写入的数据保留
    Failed {
        reason: String,
        snapshot: Option<PathBuf>,
    },
}

/// 一次抓取的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Completed,
    /// 部分成功：在翻往 `page` 时失败
    Degraded {
        page: u32,
        reason: String,
        snapshot: Option<PathBuf>,
    },
}

/// 抓取统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    /// 完成解析的页数
    pub pages: u32,
    /// 成功翻页次数
    pub advances: u32,
    pub extracted: usize,
    pub persisted: usize,
    pub failed_writes: usize,
    pub mismatched_pages: u32,
    pub outcome: ScrapeOutcome,
}

impl Default for ScrapeReport {
    fn default() -> Self {
        Self {
            pages: 0,
            advances: 0,
            extracted: 0,
            persisted: 0,
            failed_writes: 0,
            mismatched_pages: 0,
            outcome: ScrapeOutcome::Completed,
        }
    }
}

impl ScrapeReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, ScrapeOutcome::Degraded { .. })
    }
}

/// 翻页控制器
///
/// 不持有浏览器和数据库，只借用它们的能力。
pub struct PaginationController<'a, D, S>
where
    D: PageDriver + ?Sized,
    S: SubmissionStore + ?Sized,
{
    driver: &'a D,
    store: &'a S,
    config: &'a Config,
    cursor: PaginationCursor,
}

impl<'a, D, S> PaginationController<'a, D, S>
where
    D: PageDriver + ?Sized,
    S: SubmissionStore + ?Sized,
{
    pub fn new(driver: &'a D, store: &'a S, config: &'a Config) -> Self {
        Self {
            driver,
            store,
            config,
            cursor: PaginationCursor::default(),
        }
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// 运行状态机直到 Done 或 Failed
    ///
    /// 只有连接级错误（浏览器或数据库）会以 Err 返回。
    pub async fn run(&mut self) -> AppResult<ScrapeReport> {
        let mut report = ScrapeReport::default();
        let mut state = PageState::Rendering;

        loop {
            debug!("[第 {} 页] 状态: {:?}", self.cursor.page_number, state);
            state = match state {
                PageState::Rendering => {
                    self.render().await?;
                    PageState::Ready
                }
                PageState::Ready => {
                    if self.wait_ready().await? {
                        PageState::Extracting
                    } else {
                        info!(
                            "[第 {} 页] 等待内容超时，视为没有更多数据",
                            self.cursor.page_number
                        );
                        PageState::Done
                    }
                }
                PageState::Extracting => {
                    self.extract_page(&mut report).await?;
                    PageState::Advancing
                }
                PageState::Advancing => {
                    let next = self.advance().await?;
                    if next == PageState::Ready {
                        report.advances += 1;
                    }
                    next
                }
                PageState::Done => {
                    report.outcome = ScrapeOutcome::Completed;
                    break;
                }
                PageState::Failed { reason, snapshot } => {
                    report.outcome = ScrapeOutcome::Degraded {
                        page: self.cursor.page_number + 1,
                        reason,
                        snapshot,
                    };
                    break;
                }
            };
        }

        Ok(report)
    }

    /// 等待懒渲染占位元素全部显示，然后逐步滚动到底部
    async fn render(&self) -> AppResult<()> {
        let timings = &self.config.timings;
        let placeholder = self.config.selectors.render_placeholder.as_str();

        info!("等待页面渲染完成...");
        let rendered = self
            .poll_until(timings.render_timeout(), || async move {
                Ok::<_, AppError>(self.driver.pending_placeholders(placeholder).await? == 0)
            })
            .await?;
        if !rendered {
            warn!("⚠️ 等待懒渲染超时，继续执行");
        }

        let scroll_height = self.driver.scroll_height().await?;
        let step = u64::from(timings.scroll_step_px.max(1));
        let mut scrolled = 0u64;
        while scrolled < scroll_height {
            self.driver.scroll_by(timings.scroll_step_px.max(1)).await?;
            scrolled += step;
            tokio::time::sleep(timings.scroll_delay()).await;
        }
        debug!("已滚动 {} 像素", scrolled);

        Ok(())
    }

    /// 姓名与答题块都出现时返回 true，超时返回 false
    async fn wait_ready(&self) -> AppResult<bool> {
        let names = self.config.selectors.student_name.as_str();
        let blocks = self.config.selectors.answer_block.as_str();

        self.poll_until(self.config.timings.ready_timeout(), || async move {
            Ok::<_, AppError>(
                self.driver.exists(names).await? && self.driver.exists(blocks).await?,
            )
        })
        .await
    }

    async fn extract_page(&self, report: &mut ScrapeReport) -> AppResult<()> {
        let page = self.cursor.page_number;
        info!("[第 {} 页] 开始解析", page);

        let html = self.driver.html().await?;
        let extraction = Extractor::new(&self.config.selectors).extract_html(&html)?;
        if extraction.is_mismatch() {
            report.mismatched_pages += 1;
        }
        let records = extraction.into_records();

        let persisted = Reconciler::new(self.store)
            .persist(&records, &self.config.question)
            .await?;

        report.pages += 1;
        report.extracted += records.len();
        report.persisted += persisted.written;
        report.failed_writes += persisted.failed;

        info!(
            "[第 {} 页] ✓ 解析 {} 条，写入 {} 条，失败 {} 条",
            page,
            records.len(),
            persisted.written,
            persisted.failed
        );
        Ok(())
    }

    /// 点击下一页并确认内容已更新
    async fn advance(&mut self) -> AppResult<PageState> {
        let (driver, config) = (self.driver, self.config);
        let timings = &config.timings;
        let names = config.selectors.student_name.as_str();
        let next_page = self.cursor.page_number + 1;
        let next_link = config.selectors.page_link(next_page);

        if !driver.exists(&next_link).await? {
            info!("[第 {} 页] 没有下一页，抓取结束", self.cursor.page_number);
            return Ok(PageState::Done);
        }

        info!(
            "[第 {} 页] 找到下一页按钮，准备翻到第 {} 页",
            self.cursor.page_number, next_page
        );

        let before = self.first_student_name(timings.before_value_timeout()).await?;
        match &before {
            Some(name) => debug!("翻页前第一个学生: {}", name.trim()),
            None => warn!("⚠️ 未能读取翻页前的第一个学生姓名，仍然继续翻页"),
        }
        self.cursor.last_seen_first_student_name = before.clone();

        if !driver.click(&next_link).await? {
            info!("[第 {} 页] 下一页按钮已消失，抓取结束", self.cursor.page_number);
            return Ok(PageState::Done);
        }

        let updated = match before {
            Some(old_name) => {
                self.poll_until(timings.advance_timeout(), || {
                    let old_name = old_name.as_str();
                    async move {
                        Ok::<_, AppError>(matches!(
                            driver.first_text(names).await?,
                            Some(current) if current != old_name
                        ))
                    }
                })
                .await?
            }
            None => {
                tokio::time::sleep(timings.reappear_delay()).await;
                self.poll_until(timings.advance_timeout(), || async move {
                    driver.exists(names).await
                })
                .await?
            }
        };

        if !updated {
            let reason = format!("等待第 {} 页内容更新超时", next_page);
            error!("[第 {} 页] ✗ {}", self.cursor.page_number, reason);
            let snapshot = self.capture_failure(next_page).await;
            return Ok(PageState::Failed { reason, snapshot });
        }

        tokio::time::sleep(timings.settle()).await;
        self.cursor.page_number = next_page;
        info!("[第 {} 页] ✓ 翻页完成", next_page);
        Ok(PageState::Ready)
    }

    async fn first_student_name(&self, timeout: Duration) -> AppResult<Option<String>> {
        let names = self.config.selectors.student_name.as_str();
        let outcome = tokio::time::timeout(timeout, async {
            loop {
                if let Some(text) = self.driver.first_text(names).await? {
                    return Ok::<_, AppError>(text);
                }
                tokio::time::sleep(self.config.timings.poll_interval()).await;
            }
        })
        .await;

        match outcome {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// 保存翻页失败时的整页截图；截图失败只记录日志
    async fn capture_failure(&self, next_page: u32) -> Option<PathBuf> {
        let path = PathBuf::from(&self.config.diagnostics_dir)
            .join(format!("error_page_{}_update_timeout.png", next_page));

        match self.driver.screenshot(&path).await {
            Ok(()) => {
                info!("已保存截图: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("保存截图失败: {}", e);
                None
            }
        }
    }

    /// 按轮询间隔检查条件，满足返回 true，超时返回 false
    async fn poll_until<F, Fut>(&self, timeout: Duration, mut check: F) -> AppResult<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<bool>>,
    {
        let interval = self.config.timings.poll_interval();
        let outcome = tokio::time::timeout(timeout, async {
            loop {
                if check().await? {
                    return Ok::<_, AppError>(true);
                }
                tokio::time::sleep(interval).await;
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_is_completed() {
        let report = ScrapeReport::default();
        assert!(!report.is_degraded());
        assert_eq!(report.pages, 0);
    }
}
