//! LLM 服务 - 业务能力层
//!
//! 只负责"给 prompt，拿回原始文本"，不关心重试和解析
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（Gemini 的 OpenAI 兼容端点等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::services::extraction_client::parse_retry_in;

/// 生成服务返回的失败
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// 客户端已明确识别为限流 / 配额耗尽
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
    /// 未分类的失败，由调用方按错误信息判断是否可重试
    Failed { message: String },
}

impl GenerationError {
    pub fn failed(message: impl Into<String>) -> Self {
        GenerationError::Failed {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GenerationError::RateLimited { message, .. } | GenerationError::Failed { message } => {
                message
            }
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GenerationError {}

/// 文本生成能力
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// 服务端表示限流 / 配额耗尽的错误码（忽略大小写）
const RATE_LIMIT_CODES: &[&str] = &[
    "rate_limit_exceeded",
    "insufficient_quota",
    "resource_exhausted",
    "429",
];

/// 按服务端返回的错误码分类，识别不了的交给调用方按信息判断
pub fn classify_error(err: OpenAIError) -> GenerationError {
    if let OpenAIError::ApiError(api) = &err {
        let rate_limited = [api.code.as_deref(), api.r#type.as_deref()]
            .into_iter()
            .flatten()
            .any(|code| {
                RATE_LIMIT_CODES
                    .iter()
                    .any(|known| code.eq_ignore_ascii_case(known))
            });
        if rate_limited {
            return GenerationError::RateLimited {
                message: err.to_string(),
                retry_after: parse_retry_in(&api.message)
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            };
        }
    }
    GenerationError::failed(err.to_string())
}

const SYSTEM_MESSAGE: &str = "You are a precise document-structuring assistant. \
Reply with a single JSON object and nothing else: no markdown fences, no commentary.";

/// 基于 OpenAI 兼容接口的 LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl TextGenerator for LlmService {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("prompt 长度: {} 字符", prompt.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()
            .map_err(|e| GenerationError::failed(e.to_string()))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| GenerationError::failed(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.2)
            .build()
            .map_err(|e| GenerationError::failed(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_error(e)
        })?;

        debug!("LLM API 调用成功");

        // 没有 choice 视为失败；content 为空时交给调用方判定
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::failed("LLM 返回结果为空"))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
