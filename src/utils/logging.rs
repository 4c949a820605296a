/// 日志工具模块
///
/// 提供启动横幅和最终统计的输出
use tracing::{info, warn};

use crate::config::Config;
use crate::workflow::{GradingReport, ScrapeOutcome, ScrapeReport};

/// 记录程序启动信息
pub fn log_startup(command: &str, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if !config.question.is_empty() {
        info!("📝 题目: {}", config.question);
    }
    if !config.table_name.is_empty() {
        info!("🗄️ 数据表: {}", config.table_name);
    }
    info!("{}", "=".repeat(60));
}

/// 打印抓取统计
pub fn print_scrape_stats(report: &ScrapeReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 页数: {}（翻页 {} 次）", report.pages, report.advances);
    info!("👥 解析提交: {}", report.extracted);
    info!("✅ 写入成功: {}", report.persisted);
    info!("❌ 写入失败: {}", report.failed_writes);
    if report.mismatched_pages > 0 {
        warn!("⚠️ 结构不一致被跳过的页: {}", report.mismatched_pages);
    }
    match &report.outcome {
        ScrapeOutcome::Completed => info!("结果: 全部完成"),
        ScrapeOutcome::Degraded {
            page,
            reason,
            snapshot,
        } => {
            warn!("结果: 部分完成，翻到第 {} 页时失败: {}", page, reason);
            if let Some(path) = snapshot {
                warn!("截图: {}", path.display());
            }
        }
    }
    info!("{}", "=".repeat(60));
}

/// 打印评分统计
pub fn print_grading_stats(report: &GradingReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 评分完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.graded, report.total);
    info!("❌ 失败: {}", report.failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("评分结果很好", 2), "评分...");
    }
}
