//! 浏览器资源管理
//!
//! 配置了 `BROWSER_DEBUG_PORT` 时连接到已有浏览器，否则自行启动。

mod connection;
mod headless;
mod session;

pub use connection::connect_to_browser;
pub use headless::launch_browser;
pub use session::login_and_open;

use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;

/// 浏览器句柄
///
/// 持有浏览器和事件处理任务，负责在结束时释放。
pub struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
    launched: bool,
}

impl BrowserHandle {
    /// 按配置连接或启动浏览器，返回句柄和一个新页面
    pub async fn open(config: &Config) -> AppResult<(Self, Page)> {
        let (browser, page, handler, launched) = match config.browser_debug_port {
            Some(port) => {
                let (browser, page, handler) = connect_to_browser(port).await?;
                (browser, page, handler, false)
            }
            None => {
                let (browser, page, handler) =
                    launch_browser(config.headless, config.chrome_executable.as_deref()).await?;
                (browser, page, handler, true)
            }
        };

        Ok((
            Self {
                browser,
                handler,
                launched,
            },
            page,
        ))
    }

    /// 释放浏览器
    ///
    /// 自行启动的浏览器会被关闭；连接的外部浏览器保持运行。
    pub async fn close(mut self) {
        if self.launched {
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
            info!("浏览器已关闭");
        }
        self.handler.abort();
    }
}
