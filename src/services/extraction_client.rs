//! 结构化提取客户端 - 业务能力层
//!
//! 在 `TextGenerator` 之上负责：构建 prompt、限流重试与退避、解析 JSON。
//!
//! 重试规则：
//! - 只有限流 / 配额类失败可重试，最多 `max_retries` 次尝试
//! - 等待 `base * 2^attempt` 秒；错误信息里带 "retry in Ns" 时改为 `N + padding` 秒
//! - 其它失败（空响应、非 JSON、字段缺失、普通调用失败）立即返回
//! - 退避等待可被取消

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ExtractionError};
use crate::infrastructure::{CancelSignal, SyllabusStore};
use crate::models::topic::MatchedTopicsResponse;
use crate::models::{MatchedTopic, SyllabusDocument};
use crate::services::llm_service::{GenerationError, TextGenerator};
use crate::utils::logging::truncate_text;

/// 限流 / 配额耗尽的特征子串（小写比较）
const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "quota",
    "rate limit",
    "rate_limit",
    "ratelimit",
    "resource_exhausted",
    "resource exhausted",
    "too many requests",
];

/// 单次退避等待的上限
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// 错误信息是否表明限流
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// 提取服务端建议的等待秒数，如 "Please retry in 37.5s"
pub fn parse_retry_in(message: &str) -> Option<f64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(?i)retry in\s+(\d+(?:\.\d+)?)\s*s").expect("静态正则"));
    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 限流重试策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub retry_padding: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(10),
            retry_padding: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            retry_padding: Duration::from_secs(config.retry_padding_secs),
        }
    }

    /// 失败是否可重试
    pub fn is_retryable(&self, err: &GenerationError) -> bool {
        match err {
            GenerationError::RateLimited { .. } => true,
            GenerationError::Failed { message } => is_rate_limit_message(message),
        }
    }

    /// 第 `attempt` 次（从 0 开始）失败后的等待时长，不超过 `MAX_RETRY_DELAY`
    pub fn delay_for(&self, attempt: u32, err: &GenerationError) -> Duration {
        let hinted = match err {
            GenerationError::RateLimited {
                retry_after: Some(after),
                ..
            } => Some(*after),
            _ => parse_retry_in(err.message())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        };

        let delay = match hinted {
            Some(after) => after.saturating_add(self.retry_padding),
            None => self
                .backoff_base
                .checked_mul(2u32.saturating_pow(attempt))
                .unwrap_or(MAX_RETRY_DELAY),
        };
        delay.min(MAX_RETRY_DELAY)
    }
}

/// 结构化提取客户端
pub struct ExtractionClient {
    generator: Arc<dyn TextGenerator>,
    syllabi: Arc<dyn SyllabusStore>,
    policy: RetryPolicy,
    cancel: CancelSignal,
}

impl ExtractionClient {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        syllabi: Arc<dyn SyllabusStore>,
        policy: RetryPolicy,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            generator,
            syllabi,
            policy,
            cancel,
        }
    }

    /// 从试卷文本中提取命中的大纲主题
    ///
    /// 课程没有大纲时返回 `SyllabusMissing`，不会调用 LLM
    pub async fn extract_topics(
        &self,
        course_code: &str,
        document_text: &str,
    ) -> AppResult<Vec<MatchedTopic>> {
        let syllabus = self.load_syllabus(course_code).await?;
        self.extract_topics_with(&syllabus, document_text).await
    }

    /// 读取课程大纲，不存在时为 `SyllabusMissing`
    pub async fn load_syllabus(&self, course_code: &str) -> AppResult<SyllabusDocument> {
        self.syllabi
            .find_by_course_code(course_code)
            .await?
            .ok_or_else(|| AppError::syllabus_missing(course_code))
    }

    /// 用已加载的大纲构建 prompt 并提取主题
    pub async fn extract_topics_with(
        &self,
        syllabus: &SyllabusDocument,
        document_text: &str,
    ) -> AppResult<Vec<MatchedTopic>> {
        let syllabus_json = serde_json::to_string_pretty(&syllabus.modules)
            .map_err(|e| AppError::parse(format!("大纲序列化失败: {}", e)))?;
        let prompt = build_topic_prompt(&syllabus_json, document_text);

        let raw = self.generate_with_retry(&prompt).await?;
        let topics = parse_matched_topics(&raw)?;
        debug!("课程 {} 提取到 {} 条主题", syllabus.course_code, topics.len());
        Ok(topics)
    }

    /// 从教学大纲文本中提取结构化大纲
    pub async fn extract_syllabus(&self, document_text: &str) -> AppResult<SyllabusDocument> {
        let prompt = build_syllabus_prompt(document_text);
        let raw = self.generate_with_retry(&prompt).await?;
        parse_syllabus(&raw)
    }

    async fn generate_with_retry(&self, prompt: &str) -> AppResult<String> {
        let max_attempts = self.policy.max_attempts;
        let mut last_message = String::new();

        for attempt in 0..max_attempts {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let result = tokio::select! {
                result = self.generator.generate(prompt) => result,
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
            };

            match result {
                Ok(raw) => {
                    if raw.trim().is_empty() {
                        return Err(AppError::parse("LLM 返回内容为空"));
                    }
                    if attempt > 0 {
                        info!("✓ 第 {}/{} 次尝试成功", attempt + 1, max_attempts);
                    }
                    return Ok(raw);
                }
                Err(err) if self.policy.is_retryable(&err) => {
                    last_message = err.message().to_string();
                    if attempt + 1 == max_attempts {
                        break;
                    }
                    let wait = self.policy.delay_for(attempt, &err);
                    warn!(
                        "LLM 限流 (尝试 {}/{}), 等待 {:.1} 秒后重试: {}",
                        attempt + 1,
                        max_attempts,
                        wait.as_secs_f64(),
                        truncate_text(&last_message, 120)
                    );
                    tokio::select! {
                        _ = sleep(wait) => {}
                        _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                    }
                }
                Err(err) => {
                    return Err(ExtractionError::Generation {
                        message: err.message().to_string(),
                    }
                    .into());
                }
            }
        }

        warn!("LLM 限流，已重试 {} 次", max_attempts);
        Err(ExtractionError::RateLimitExceeded {
            attempts: max_attempts,
            last_message,
        }
        .into())
    }
}

fn parse_matched_topics(raw: &str) -> AppResult<Vec<MatchedTopic>> {
    let response: MatchedTopicsResponse = serde_json::from_str(raw.trim()).map_err(|e| {
        AppError::parse(format!("{} (响应: {})", e, truncate_text(raw.trim(), 200)))
    })?;
    Ok(response.matched_topics)
}

fn parse_syllabus(raw: &str) -> AppResult<SyllabusDocument> {
    serde_json::from_str(raw.trim()).map_err(|e| {
        AppError::parse(format!("{} (响应: {})", e, truncate_text(raw.trim(), 200)))
    })
}

fn build_topic_prompt(syllabus_json: &str, document_text: &str) -> String {
    format!(
        r#"You are given the canonical syllabus of a course and the OCR text of one of its question papers.

Identify every syllabus topic that the question paper examines, and count how many questions touch each topic.

Rules:
1. Use ONLY topic names that appear in the syllabus below. Never invent topics.
2. A question may cover more than one topic; count it once for each topic it covers.
3. If no syllabus topic is examined, return an empty list.
4. Output strictly valid JSON in exactly this shape, with nothing before or after it:
{{"matched_topics": [{{"topic": "<syllabus topic name>", "count": <positive integer>}}]}}

SYLLABUS MODULES (JSON):
{}

QUESTION PAPER TEXT STARTS BELOW:

{}"#,
        syllabus_json, document_text
    )
}

fn build_syllabus_prompt(document_text: &str) -> String {
    format!(
        r#"Extract a structured syllabus from the OCR text of a course syllabus document.

Rules:
1. Keep the order of the source: course info, objectives, outcomes, modules, textbooks, reference books.
2. Use only information that is explicitly present. Do not hallucinate.
3. Keep every module in its original order with its exact number, title and hours.
4. Missing sections become empty arrays or empty strings.
5. The course code (for example BCHY101L) must always be filled in.
6. Every module has: module_number, module_title, hours, topics (array of strings, copied verbatim).
7. Output strictly valid JSON with no explanations, comments or extra text.

Output shape:
{{
  "course_code": "",
  "course_title": "",
  "pre_requisite": "",
  "course_objectives": [],
  "course_outcomes": [],
  "modules": [{{"module_number": "", "module_title": "", "hours": "", "topics": []}}],
  "text_books": [],
  "reference_books": []
}}

OCR TEXT STARTS BELOW:

{}"#,
        document_text
    )
}
