//! 评分服务 - 业务能力层
//!
//! 只负责"给一份代码打分"，不关心存储和节流。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（默认 Gemini 的 OpenAI 兼容端点）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 默认评分提示词：宽松的 AP 风格评分标准
pub const DEFAULT_RUBRIC: &str = r#"Grade the submission. **I ONLY want the feedback followed by a Dollar Sign then the score**
like this format: The code completes the prompt but has a few syntax errors $ 9

Scoring Notes:

Focus on Core Concepts: This rubric prioritizes understanding interfaces, implementation, method overriding, and basic class structure.
Minor Syntax Errors: Small typos or syntax errors that don't fundamentally break the concept (e.g., missing semicolon if easily inferred) should not prevent points from being awarded, especially at the "attempt" or "basic structure" levels.
Unnecessary Code: Default constructors or unused instance variables that the prompt did not require should not result in point deductions.
Generosity: The goal is leniency. Award points if the student demonstrates understanding of the key requirement for that point, even if execution isn't perfect. Getting the details exactly right earns the final points.

There is no Penalty for:
- Extraneous code with no side-effect (e.g., valid precondition check, no-op)
- Spelling/case discrepancies for variables and identifiers
- Local variable not declared provided other variables are declared in some part
- private or public qualifier on a local variable
- Missing public qualifier on class or constructor header
- Keyword used as an identifier
- Common mathematical symbols used for operators (× • ÷ ≤ ≥ <> ≠)
- [] vs. () vs. <>
- = instead of == and vice versa
- length/size confusion for array, String, List, or ArrayList; with or without ( )
- Extraneous [] when referencing entire array
- [i,j] instead of [i][j]
- Extraneous size in array declaration, e.g., int[size] nums = new int[size];
- Missing ; where structure clearly conveys intent
- Missing { } where indentation clearly conveys intent
- Missing ( ) on parameter-less method or constructor invocations
- Missing ( ) around if or while conditions"#;

/// 评分能力
///
/// 失败时返回 None（已记录日志），不会把错误抛给调用方。
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, code: &str, question: &str) -> Option<String>;
}

/// 基于 LLM 的评分服务
pub struct LlmScorer {
    client: Client<OpenAIConfig>,
    model_name: String,
    rubric: String,
}

impl LlmScorer {
    /// 创建评分服务；配置了提示词文件时从文件读取评分标准
    pub fn new(config: &Config) -> AppResult<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let rubric = match &config.grading_prompt_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| {
                    LlmError::PromptFileFailed {
                        path: path.clone(),
                        source,
                    }
                })?;
                info!("使用自定义评分提示词: {}", path);
                content
            }
            None => DEFAULT_RUBRIC.to_string(),
        };

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            rubric,
        })
    }

    /// 通用的 LLM 调用
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

/// 评分请求中的用户消息
pub fn build_user_message(code: &str, question: &str) -> String {
    format!("Question: {}\n\nAnd their code was:\n{}", question, code)
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, code: &str, question: &str) -> Option<String> {
        let user_message = build_user_message(code, question);
        match self.send_to_llm(&user_message, Some(&self.rubric)).await {
            Ok(response) => {
                debug!("LLM 响应: {}", response);
                Some(response)
            }
            Err(e) => {
                warn!("⚠️ 评分失败: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_carries_code() {
        let message = build_user_message("class A {}", "Q7");
        assert!(message.contains("Q7"));
        assert!(message.ends_with("class A {}"));
    }

    #[test]
    fn test_missing_prompt_file_is_error() {
        let config = Config {
            grading_prompt_file: Some("/nonexistent/rubric.txt".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            LlmScorer::new(&config),
            Err(AppError::Llm(LlmError::PromptFileFailed { .. }))
        ));
    }

    #[test]
    fn test_default_rubric_asks_for_dollar_format() {
        assert!(DEFAULT_RUBRIC.contains("Dollar Sign"));
    }

    /// 需要 LLM_API_KEY
    #[tokio::test]
    #[ignore]
    async fn test_live_score() {
        let config = Config::from_env().expect("配置无效");
        let scorer = LlmScorer::new(&config).expect("创建评分服务失败");
        let response = scorer
            .score("public interface Bell { void ring(); }", "Bell")
            .await;
        println!("{:?}", response);
        assert!(response.is_some());
    }
}
