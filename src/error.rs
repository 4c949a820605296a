use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 数据库相关错误
    #[error("数据库错误: {0}")]
    Storage(#[from] StorageError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 页面解析错误
    #[error("解析错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 登录失败
    #[error("登录失败: {reason}")]
    LoginFailed { reason: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 截图失败
    #[error("截图保存失败 ({path}): {source}")]
    ScreenshotFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 数据库相关错误
///
/// 区分"连接级"和"单条记录级"失败：前者终止整个运行，后者只跳过当前记录。
#[derive(Debug, Error)]
pub enum StorageError {
    /// 建立连接失败
    #[error("无法连接到数据库 {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接已断开
    #[error("数据库连接已断开: {source}")]
    ConnectionLost {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 单条语句执行失败（约束冲突、数据错误等）
    #[error("SQL执行失败: {source}")]
    QueryFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    /// 是否为连接级错误
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectFailed { .. } | StorageError::ConnectionLost { .. }
        )
    }
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 提示词文件读取失败
    #[error("无法读取评分提示词文件 {path}: {source}")]
    PromptFileFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 页面解析错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// CSS 选择器无效
    #[error("无效的CSS选择器 '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 取值不合法
    #[error("配置项 {name} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            StorageError::ConnectionLost {
                source: Box::new(err),
            }
        } else {
            StorageError::QueryFailed {
                source: Box::new(err),
            }
        }
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::Storage(err.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 是否为需要终止整个运行的连接级错误
    pub fn is_connection_level(&self) -> bool {
        match self {
            AppError::Storage(e) => e.is_connection_level(),
            AppError::Browser(_) => true,
            _ => false,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_level_classification() {
        let lost = StorageError::ConnectionLost {
            source: "socket closed".into(),
        };
        let rejected = StorageError::QueryFailed {
            source: "duplicate key value".into(),
        };

        assert!(lost.is_connection_level());
        assert!(!rejected.is_connection_level());
        assert!(AppError::from(lost).is_connection_level());
        assert!(!AppError::Other("x".into()).is_connection_level());
    }

    #[test]
    fn test_error_display_is_prefixed() {
        let err = AppError::Config(ConfigError::EnvVarNotFound {
            var_name: "QUESTION".to_string(),
        });
        assert_eq!(err.to_string(), "配置错误: 环境变量 QUESTION 不存在");
    }
}
