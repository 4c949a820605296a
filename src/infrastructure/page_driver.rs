//! 页面驱动 - 基础设施层
//!
//! 翻页状态机只通过 [`PageDriver`] 操作浏览器，测试时可以替换为假实现。

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::infrastructure::JsExecutor;

/// 翻页流程需要的浏览器原语
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 仍未显示的懒渲染占位元素数量
    async fn pending_placeholders(&self, selector: &str) -> AppResult<usize>;

    /// 文档总高度（像素）
    async fn scroll_height(&self) -> AppResult<u64>;

    /// 向下滚动指定像素
    async fn scroll_by(&self, delta_px: u32) -> AppResult<()>;

    /// 选择器是否至少匹配一个元素
    async fn exists(&self, selector: &str) -> AppResult<bool>;

    /// 第一个匹配元素的可见文本
    async fn first_text(&self, selector: &str) -> AppResult<Option<String>>;

    /// 点击第一个匹配元素，元素不存在时返回 false
    async fn click(&self, selector: &str) -> AppResult<bool>;

    /// 当前渲染结果的 HTML
    async fn html(&self) -> AppResult<String>;

    /// 保存整页截图
    async fn screenshot(&self, path: &Path) -> AppResult<()>;
}

/// 基于 chromiumoxide 的页面驱动
pub struct ChromiumDriver {
    executor: JsExecutor,
}

impl ChromiumDriver {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn pending_placeholders(&self, selector: &str) -> AppResult<usize> {
        let js_code = format!(
            r#"Array.from(document.querySelectorAll({}))
                .filter(p => p.style.display !== 'none').length"#,
            serde_json::to_string(selector)?
        );
        self.executor.eval_as(js_code).await
    }

    async fn scroll_height(&self) -> AppResult<u64> {
        self.executor
            .eval_as("document.body ? document.body.scrollHeight : 0")
            .await
    }

    async fn scroll_by(&self, delta_px: u32) -> AppResult<()> {
        self.executor
            .eval(format!("window.scrollBy(0, {}); true", delta_px))
            .await?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> AppResult<bool> {
        let js_code = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        self.executor.eval_as(js_code).await
    }

    async fn first_text(&self, selector: &str) -> AppResult<Option<String>> {
        let js_code = format!(
            r#"(() => {{
                const el = document.querySelector({});
                return el ? el.innerText : null;
            }})()"#,
            serde_json::to_string(selector)?
        );
        self.executor.eval_as(js_code).await
    }

    async fn click(&self, selector: &str) -> AppResult<bool> {
        let elements = self.executor.page().find_elements(selector).await?;
        match elements.first() {
            Some(element) => {
                element.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn html(&self) -> AppResult<String> {
        self.executor.html().await
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        self.executor.save_full_page_screenshot(path).await
    }
}
