//! 评分结果解析
//!
//! 评分提示词要求模型按 `反馈 $ 分数` 的格式返回。这里只做"尽力解析"，
//! 用于统计日志；写库时始终保存原文。

use regex::Regex;
use std::sync::LazyLock;

static SCORE_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d+(?:\.\d+)?)\s*$").expect("score regex"));

/// 解析后的评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub rationale: String,
    pub score: f64,
}

impl Verdict {
    /// 从 LLM 原始返回中解析评分
    ///
    /// 取最后一个 `$` 之后的数字作为分数，之前的内容作为理由。
    pub fn parse(response: &str) -> Option<Self> {
        let response = response.trim();
        let caps = SCORE_TAIL.captures(response)?;
        let whole = caps.get(0)?;
        let score = caps.get(1)?.as_str().parse().ok()?;

        Some(Self {
            rationale: response[..whole.start()].trim().to_string(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feedback_and_score() {
        let verdict =
            Verdict::parse("The code completes the prompt but has a few syntax errors $ 9")
                .expect("应当能解析");
        assert_eq!(verdict.score, 9.0);
        assert_eq!(
            verdict.rationale,
            "The code completes the prompt but has a few syntax errors"
        );
    }

    #[test]
    fn test_parse_uses_last_dollar() {
        let verdict = Verdict::parse("uses $var syntax wrongly $4.5\n").expect("应当能解析");
        assert_eq!(verdict.score, 4.5);
        assert_eq!(verdict.rationale, "uses $var syntax wrongly");
    }

    #[test]
    fn test_parse_without_score() {
        assert!(Verdict::parse("no score here").is_none());
        assert!(Verdict::parse("").is_none());
    }
}
