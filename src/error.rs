use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 提取（LLM）相关错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 文件名不符合命名约定
    #[error("文件名错误: {0}")]
    Filename(#[from] FilenameError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件 / 外部命令 I/O 错误
    #[error("I/O 错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 用户中断，必须立即向上传播
    #[error("处理已被取消")]
    Cancelled,
}

/// 提取相关错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 课程没有已加载的教学大纲，重试无意义
    #[error("课程 {course_code} 没有教学大纲记录")]
    SyllabusMissing { course_code: String },
    /// LLM 返回为空、不是 JSON 或缺少必需字段
    #[error("无法解析 LLM 返回内容: {reason}")]
    Parse { reason: String },
    /// 限流重试次数耗尽
    #[error("LLM 限流，已重试 {attempts} 次仍失败: {last_message}")]
    RateLimitExceeded { attempts: u32, last_message: String },
    /// 不可重试的 LLM 调用失败
    #[error("LLM 调用失败: {message}")]
    Generation { message: String },
}

/// 文件名解析错误
#[derive(Debug, Error)]
pub enum FilenameError {
    /// 文件名不是 `<course_code>-<exam_type>[-...].<ext>` 格式
    #[error("无法从文件名解析课程代码和考试类型: {filename}")]
    Unparsable { filename: String },
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite 错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("教学大纲 JSON 编解码失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填配置项为空
    #[error("缺少配置项 {name}（环境变量 {env_var}）")]
    MissingValue {
        name: &'static str,
        env_var: &'static str,
    },
    /// 配置项取值非法
    #[error("配置项 {name} 取值非法: '{value}'")]
    InvalidValue { name: &'static str, value: String },
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    FileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 I/O 错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建 LLM 返回解析错误
    pub fn parse(reason: impl Into<String>) -> Self {
        AppError::Extraction(ExtractionError::Parse {
            reason: reason.into(),
        })
    }

    /// 创建缺少教学大纲错误
    pub fn syllabus_missing(course_code: impl Into<String>) -> Self {
        AppError::Extraction(ExtractionError::SyllabusMissing {
            course_code: course_code.into(),
        })
    }

    /// 是否为用户取消（批处理遇到它必须中止，而不是计为失败）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
