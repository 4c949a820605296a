//! 登录并打开目标提交页

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::Page;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};

const EMAIL_INPUT: &str = "#email";
const PASSWORD_INPUT: &str = "#password";
const LOGIN_BUTTON: &str = r#"[class^="ant-btn Container__LoginButton"]"#;
const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(30);

/// 懒渲染的答题块只有进入视口才会渲染，因此使用超高视口
const VIEWPORT_WIDTH: i64 = 1920;
const VIEWPORT_HEIGHT: i64 = 10800;

/// 登录平台并进入目标页面
pub async fn login_and_open(page: &Page, config: &Config) -> AppResult<()> {
    info!("🔐 正在登录: {}", config.login_url);
    goto(page, &config.login_url).await?;

    wait_for_element(page, EMAIL_INPUT, LOGIN_FORM_TIMEOUT).await?;

    page.find_element(EMAIL_INPUT)
        .await?
        .click()
        .await?
        .type_str(&config.email)
        .await?;
    page.find_element(PASSWORD_INPUT)
        .await?
        .click()
        .await?
        .type_str(&config.password)
        .await?;
    debug!("已填写登录信息");

    page.find_element(LOGIN_BUTTON).await?.click().await?;
    page.wait_for_navigation().await.map_err(|e| BrowserError::LoginFailed {
        reason: format!("提交登录表单后没有跳转: {}", e),
    })?;
    info!("✓ 登录成功");

    goto(page, &config.post_login_url).await?;
    goto(page, &config.target_url).await?;

    page.execute(SetDeviceMetricsOverrideParams::new(
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
        1.0,
        false,
    ))
    .await?;
    info!("✓ 已打开目标页面: {}", config.target_url);

    Ok(())
}

async fn goto(page: &Page, url: &str) -> AppResult<()> {
    debug!("导航到: {}", url);
    page.goto(url)
        .await
        .map_err(|e| AppError::navigation_failed(url, e))?;
    Ok(())
}

async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> AppResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::LoginFailed {
                reason: format!("{:?} 内未找到 {}", timeout, selector),
            }
            .into());
        }
        sleep(Duration::from_millis(250)).await;
    }
}
