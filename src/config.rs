use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;

/// 程序配置
///
/// 优先级：环境变量 > 配置文件 > 默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 试卷（待统计文档）目录
    pub document_dir: String,
    /// 教学大纲文档目录
    pub syllabus_dir: String,
    /// 待处理文档的扩展名（不含点）
    pub document_extension: String,
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 文本提取方式：`ocr` 或 `plain`
    pub extractor: String,
    /// OCR 栅格化分辨率
    pub ocr_dpi: u32,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 重试策略 ---
    /// 单次提取的最大尝试次数
    pub max_retries: u32,
    /// 指数退避基数（秒）：第 n 次失败后等待 base * 2^n
    pub backoff_base_secs: u64,
    /// 服务端给出 "retry in Ns" 时额外等待的秒数
    pub retry_padding_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_dir: "question_papers".to_string(),
            syllabus_dir: "syllabi".to_string(),
            document_extension: "pdf".to_string(),
            database_path: "paperscan.db".to_string(),
            extractor: "ocr".to_string(),
            ocr_dpi: 300,
            verbose_logging: false,
            output_log_file: "paperscan_log.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            max_retries: 5,
            backoff_base_secs: 10,
            retry_padding_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 配置文件加载，再叠加环境变量
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            document_dir: env_string("DOCUMENT_DIR", self.document_dir),
            syllabus_dir: env_string("SYLLABUS_DIR", self.syllabus_dir),
            document_extension: env_string("DOCUMENT_EXTENSION", self.document_extension),
            database_path: env_string("DATABASE_PATH", self.database_path),
            extractor: env_string("EXTRACTOR", self.extractor),
            ocr_dpi: env_parsed("OCR_DPI", self.ocr_dpi),
            verbose_logging: env_parsed("VERBOSE_LOGGING", self.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
            llm_api_key: env_string("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME", self.llm_model_name),
            max_retries: env_parsed("MAX_RETRIES", self.max_retries),
            backoff_base_secs: env_parsed("BACKOFF_BASE_SECS", self.backoff_base_secs),
            retry_padding_secs: env_parsed("RETRY_PADDING_SECS", self.retry_padding_secs),
        }
    }

    /// 在发起任何网络请求之前检查必填项
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                name: "llm_api_key",
                env_var: "LLM_API_KEY",
            }
            .into());
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_retries",
                value: self.max_retries.to_string(),
            }
            .into());
        }
        if !matches!(self.extractor.as_str(), "ocr" | "plain") {
            return Err(ConfigError::InvalidValue {
                name: "extractor",
                value: self.extractor.clone(),
            }
            .into());
        }
        Ok(())
    }
}

fn env_string(name: &str, fallback: String) -> String {
    std::env::var(name).unwrap_or(fallback)
}

/// 无法解析的值沿用原配置
fn env_parsed<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = Config::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_secs, 10);
        assert_eq!(config.retry_padding_secs, 5);
    }

    #[test]
    fn test_env_values_override_and_bad_numbers_fall_back() {
        std::env::set_var("PAPERSCAN_TEST_RETRIES", "7");
        std::env::set_var("PAPERSCAN_TEST_DPI", "high");
        std::env::set_var("PAPERSCAN_TEST_DIR", "scans");

        assert_eq!(env_parsed("PAPERSCAN_TEST_RETRIES", 5u32), 7);
        assert_eq!(env_parsed("PAPERSCAN_TEST_DPI", 300u32), 300);
        assert!(env_parsed("PAPERSCAN_TEST_UNSET", true));
        assert_eq!(env_string("PAPERSCAN_TEST_DIR", "papers".to_string()), "scans");
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::MissingValue { name: "llm_api_key", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_extractor() {
        let config = Config {
            llm_api_key: "key".to_string(),
            extractor: "magic".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            document_dir = "papers"
            max_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.document_dir, "papers");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.document_extension, "pdf");
    }
}
