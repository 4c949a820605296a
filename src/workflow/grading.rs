//! 评分调度 - 流程层
//!
//! 独立于抓取运行：读取未评分的记录，按限速逐条调用评分服务，把结果原样写回。

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::SubmissionStore;
use crate::models::Verdict;
use crate::services::Scorer;
use crate::utils::logging::truncate_text;

/// 评分统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradingReport {
    /// 待评分记录数
    pub total: usize,
    pub graded: usize,
    pub failed: usize,
}

/// 评分调度器
///
/// 严格串行：同一时刻最多一个评分请求。
pub struct GradingDispatcher<'a, S, C>
where
    S: SubmissionStore + ?Sized,
    C: Scorer + ?Sized,
{
    store: &'a S,
    scorer: &'a C,
    interval: Duration,
}

impl<'a, S, C> GradingDispatcher<'a, S, C>
where
    S: SubmissionStore + ?Sized,
    C: Scorer + ?Sized,
{
    pub fn new(store: &'a S, scorer: &'a C, config: &Config) -> Self {
        Self {
            store,
            scorer,
            interval: config.grading_interval(),
        }
    }

    /// 为指定题目下所有未评分的记录评分
    ///
    /// 每条记录之后等待固定间隔（最后一条除外）；评分失败的记录保持未评分。
    pub async fn grade_all(&self, question: &str) -> AppResult<GradingReport> {
        let pending = self.store.pending_for_grading(question).await?;
        let mut report = GradingReport {
            total: pending.len(),
            ..GradingReport::default()
        };

        info!(
            "📊 题目 {} 共有 {} 条待评分记录，请求间隔 {} ms",
            question,
            report.total,
            self.interval.as_millis()
        );

        for (index, record) in pending.iter().enumerate() {
            info!(
                "[{}/{}] 正在评分 #{} {}",
                index + 1,
                report.total,
                record.id,
                record.student_name
            );

            match self.scorer.score(&record.code, &record.question).await {
                Some(response) => match self.store.record_grade(record.id, &response).await {
                    Ok(_) => {
                        report.graded += 1;
                        match Verdict::parse(&response) {
                            Some(verdict) => info!(
                                "  ✓ {} 得分 {}: {}",
                                record.student_name,
                                verdict.score,
                                truncate_text(&verdict.rationale, 80)
                            ),
                            None => info!(
                                "  ✓ {} 已评分（未识别分数）: {}",
                                record.student_name,
                                truncate_text(&response, 80)
                            ),
                        }
                    }
                    Err(e) if e.is_connection_level() => return Err(e.into()),
                    Err(e) => {
                        error!("  ✗ 写入 #{} 的评分失败: {}", record.id, e);
                        report.failed += 1;
                    }
                },
                None => {
                    warn!("  ⚠️ #{} {} 评分失败，保持未评分", record.id, record.student_name);
                    report.failed += 1;
                }
            }

            if index + 1 < report.total {
                tokio::time::sleep(self.interval).await;
            }
        }

        Ok(report)
    }
}
