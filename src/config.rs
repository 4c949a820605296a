use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};
use crate::models::PageSelectors;

/// 运行模式，决定哪些环境变量是必需的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 抓取提交并写库
    Scrape,
    /// 抓取但只保存在内存中
    DryRun,
    /// LLM 评分
    Grade,
    /// 建表
    InitDb,
}

/// 翻页与渲染的时间参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// 等待占位元素全部显示的上限（毫秒）
    pub render_timeout_ms: u64,
    /// 滚动步长（像素）
    pub scroll_step_px: u32,
    /// 每步滚动后的等待（毫秒）
    pub scroll_delay_ms: u64,
    /// 等待姓名与答题块出现的上限（毫秒）
    pub ready_timeout_ms: u64,
    /// 点击翻页前读取第一个学生姓名的上限（毫秒）
    pub before_value_timeout_ms: u64,
    /// 等待翻页完成的上限（毫秒）
    pub advance_timeout_ms: u64,
    /// 未取到翻页前姓名时，点击后的短暂等待（毫秒）
    pub reappear_delay_ms: u64,
    /// 翻页完成后的稳定等待（毫秒）
    pub settle_ms: u64,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            render_timeout_ms: 30_000,
            scroll_step_px: 100,
            scroll_delay_ms: 100,
            ready_timeout_ms: 30_000,
            before_value_timeout_ms: 5_000,
            advance_timeout_ms: 60_000,
            reappear_delay_ms: 1_000,
            settle_ms: 2_000,
            poll_interval_ms: 250,
        }
    }
}

impl Timings {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
    pub fn before_value_timeout(&self) -> Duration {
        Duration::from_millis(self.before_value_timeout_ms)
    }
    pub fn advance_timeout(&self) -> Duration {
        Duration::from_millis(self.advance_timeout_ms)
    }
    pub fn reappear_delay(&self) -> Duration {
        Duration::from_millis(self.reappear_delay_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// 可选的设置文件（TOML），用于覆盖选择器和时间参数
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    selectors: Option<PageSelectors>,
    timings: Option<Timings>,
}

/// 程序配置
///
/// 启动时构造一次，之后以引用形式传入各组件；组件本身不读取环境变量。
#[derive(Clone, Debug)]
pub struct Config {
    // --- 平台 ---
    /// 待抓取的题目页面 URL
    pub target_url: String,
    pub login_url: String,
    /// 登录后先访问的页面（建立会话）
    pub post_login_url: String,
    pub email: String,
    pub password: String,
    /// 题目标识（写入 question 列）
    pub question: String,
    // --- 数据库 ---
    pub table_name: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub grading_prompt_file: Option<String>,
    /// 每分钟评分请求数
    pub requests_per_minute: u32,
    // --- 浏览器 ---
    /// 设置后连接已打开的浏览器，否则启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<String>,
    pub headless: bool,
    /// 诊断截图目录
    pub diagnostics_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 页面结构 ---
    pub selectors: PageSelectors,
    pub timings: Timings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            login_url: "https://app.edulastic.com/login".to_string(),
            post_login_url: "https://app.edulastic.com/author/assignments".to_string(),
            email: String::new(),
            password: String::new(),
            question: String::new(),
            table_name: String::new(),
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: String::new(),
            db_password: String::new(),
            db_name: String::new(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            grading_prompt_file: None,
            requests_per_minute: 10,
            browser_debug_port: None,
            chrome_executable: None,
            headless: true,
            diagnostics_dir: "diagnostics".to_string(),
            verbose_logging: false,
            selectors: PageSelectors::default(),
            timings: Timings::default(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，缺省项使用默认值
    ///
    /// 只校验取值格式；必需项是否存在由 [`Config::missing_for`] 交给调用方判断。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 使用自定义的变量来源构造配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let default = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            target_url: get("DATAURL").unwrap_or(default.target_url),
            login_url: get("LOGIN_URL").unwrap_or(default.login_url),
            post_login_url: get("POST_LOGIN_URL").unwrap_or(default.post_login_url),
            email: get("EMAIL").unwrap_or(default.email),
            password: get("PASSWORD").unwrap_or(default.password),
            question: get("QUESTION").unwrap_or(default.question),
            table_name: get("TABLE_NAME").unwrap_or(default.table_name),
            db_host: get("DB_HOST").unwrap_or(default.db_host),
            db_port: parse_var("DB_PORT", get("DB_PORT"))?.unwrap_or(default.db_port),
            db_user: get("DB_USER").unwrap_or(default.db_user),
            db_password: get("DB_PASSWORD").unwrap_or(default.db_password),
            db_name: get("DB_NAME").unwrap_or(default.db_name),
            llm_api_key: get("LLM_API_KEY")
                .or_else(|| get("GEMAPI"))
                .unwrap_or(default.llm_api_key),
            llm_api_base_url: get("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: get("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            grading_prompt_file: get("GRADING_PROMPT_FILE"),
            requests_per_minute: parse_var("REQUESTS_PER_MINUTE", get("REQUESTS_PER_MINUTE"))?
                .unwrap_or(default.requests_per_minute),
            browser_debug_port: parse_var("BROWSER_DEBUG_PORT", get("BROWSER_DEBUG_PORT"))?,
            chrome_executable: get("CHROME_EXECUTABLE"),
            headless: parse_var("HEADLESS", get("HEADLESS"))?.unwrap_or(default.headless),
            diagnostics_dir: get("DIAGNOSTICS_DIR").unwrap_or(default.diagnostics_dir),
            verbose_logging: parse_var("VERBOSE_LOGGING", get("VERBOSE_LOGGING"))?
                .unwrap_or(default.verbose_logging),
            selectors: default.selectors,
            timings: default.timings,
        };

        config.validate()?;
        Ok(config)
    }

    /// 应用 TOML 设置文件中的覆盖项
    pub fn apply_settings_file(&mut self, path: &Path) -> AppResult<()> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileParseFailed {
            path: origin.clone(),
            source: Box::new(e),
        })?;
        self.apply_settings_str(&content, &origin)
    }

    fn apply_settings_str(&mut self, content: &str, origin: &str) -> AppResult<()> {
        let settings: SettingsFile =
            toml::from_str(content).map_err(|e| ConfigError::FileParseFailed {
                path: origin.to_string(),
                source: Box::new(e),
            })?;

        if let Some(selectors) = settings.selectors {
            self.selectors = selectors;
        }
        if let Some(timings) = settings.timings {
            self.timings = timings;
        }
        Ok(())
    }

    /// 列出指定模式下缺失的必需环境变量
    pub fn missing_for(&self, mode: RunMode) -> Vec<&'static str> {
        let mut required: Vec<(&'static str, &str)> = Vec::new();

        match mode {
            RunMode::Scrape | RunMode::DryRun => {
                required.push(("DATAURL", &self.target_url));
                required.push(("EMAIL", &self.email));
                required.push(("PASSWORD", &self.password));
                required.push(("QUESTION", &self.question));
            }
            RunMode::Grade => {
                required.push(("QUESTION", &self.question));
                required.push(("LLM_API_KEY", &self.llm_api_key));
            }
            RunMode::InitDb => {}
        }

        if mode != RunMode::DryRun {
            required.push(("TABLE_NAME", &self.table_name));
            required.push(("DB_USER", &self.db_user));
            required.push(("DB_NAME", &self.db_name));
        }

        required
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// 评分请求之间的最小间隔
    pub fn grading_interval(&self) -> Duration {
        Duration::from_millis(60_000 / u64::from(self.requests_per_minute.max(1)))
    }

    fn validate(&self) -> AppResult<()> {
        if !self.table_name.is_empty() && !is_sql_identifier(&self.table_name) {
            return Err(ConfigError::InvalidValue {
                name: "TABLE_NAME".to_string(),
                value: self.table_name.clone(),
                reason: "只允许字母、数字、下划线，可带一个 schema 前缀".to_string(),
            }
            .into());
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REQUESTS_PER_MINUTE".to_string(),
                value: "0".to_string(),
                reason: "必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> AppResult<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value: raw.clone(),
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
    }
}

/// 表名会直接拼进 SQL，只接受 `name` 或 `schema.name`
fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.requests_per_minute, 10);
        assert_eq!(config.db_port, 5432);
        assert!(config.headless);
        assert_eq!(config.grading_interval(), Duration::from_millis(6_000));
    }

    #[test]
    fn test_gemapi_fallback_for_api_key() {
        let config = Config::from_lookup(lookup(&[("GEMAPI", "k-123")])).unwrap();
        assert_eq!(config.llm_api_key, "k-123");
    }

    #[test]
    fn test_bad_number_is_reported() {
        let err = Config::from_lookup(lookup(&[("DB_PORT", "abc")])).unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        assert!(Config::from_lookup(lookup(&[("TABLE_NAME", "grading.submissions")])).is_ok());
        assert!(Config::from_lookup(lookup(&[("TABLE_NAME", "x; drop table y")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TABLE_NAME", "1abc")])).is_err());
    }

    #[test]
    fn test_missing_for_modes() {
        let config = Config::from_lookup(lookup(&[
            ("QUESTION", "FRQ1"),
            ("TABLE_NAME", "submissions"),
            ("DB_USER", "postgres"),
            ("DB_NAME", "grading"),
        ]))
        .unwrap();

        assert_eq!(config.missing_for(RunMode::Grade), vec!["LLM_API_KEY"]);
        assert_eq!(
            config.missing_for(RunMode::Scrape),
            vec!["DATAURL", "EMAIL", "PASSWORD"]
        );
        assert!(config.missing_for(RunMode::InitDb).is_empty());
    }

    #[test]
    fn test_settings_override_selectors_and_timings() {
        let mut config = Config::default();
        config
            .apply_settings_str(
                r#"
                [selectors]
                student_name = ".student"

                [timings]
                settle_ms = 500
                "#,
                "inline",
            )
            .unwrap();

        assert_eq!(config.selectors.student_name, ".student");
        assert_eq!(config.selectors.part_label, PageSelectors::default().part_label);
        assert_eq!(config.timings.settle(), Duration::from_millis(500));
        assert_eq!(config.timings.advance_timeout_ms, 60_000);
    }
}
