//! DOM 快照 - 业务能力层
//!
//! 解析器不直接接触浏览器，只通过 [`PageAccessor`] 读取元素；
//! [`DomSnapshot`] 是基于渲染后 HTML 的实现，可以离线用固定的 HTML 测试。
//! 学生姓名标签通过 [`PageAccessor::text`] 按 textContent 读取（文本节点拼接）。

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppResult, ExtractionError};

/// 页面读取能力
pub trait PageAccessor {
    /// 元素句柄，只在快照存活期间有效
    type Handle<'a>: Copy
    where
        Self: 'a;

    /// 整个页面中匹配选择器的所有元素（文档顺序）
    fn query_all<'a>(&'a self, selector: &str) -> AppResult<Vec<Self::Handle<'a>>>;

    /// 某个元素内部匹配选择器的所有元素（文档顺序）
    fn query_within<'a>(
        &'a self,
        scope: Self::Handle<'a>,
        selector: &str,
    ) -> AppResult<Vec<Self::Handle<'a>>>;

    /// 元素的文本内容
    fn text<'a>(&'a self, handle: Self::Handle<'a>) -> String;
}

/// 某一时刻渲染完成的页面
pub struct DomSnapshot {
    html: Html,
}

impl DomSnapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

fn compile(selector: &str) -> AppResult<Selector> {
    Selector::parse(selector).map_err(|e| {
        ExtractionError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        }
        .into()
    })
}

impl PageAccessor for DomSnapshot {
    type Handle<'a> = ElementRef<'a>;

    fn query_all<'a>(&'a self, selector: &str) -> AppResult<Vec<ElementRef<'a>>> {
        let selector = compile(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    fn query_within<'a>(
        &'a self,
        scope: ElementRef<'a>,
        selector: &str,
    ) -> AppResult<Vec<ElementRef<'a>>> {
        let selector = compile(selector)?;
        Ok(scope.select(&selector).collect())
    }

    fn text<'a>(&'a self, handle: ElementRef<'a>) -> String {
        handle.text().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_within_is_scoped() {
        let snapshot = DomSnapshot::parse(
            r#"<div class="box"><p>one</p></div><div class="box"><p>two</p><p>three</p></div>"#,
        );
        let boxes = snapshot.query_all(".box").unwrap();
        assert_eq!(boxes.len(), 2);

        let inner = snapshot.query_within(boxes[1], "p").unwrap();
        let texts: Vec<String> = inner.into_iter().map(|p| snapshot.text(p)).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let snapshot = DomSnapshot::parse("<p>x</p>");
        assert!(snapshot.query_all("p[").is_err());
    }
}
