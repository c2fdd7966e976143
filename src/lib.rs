//! # Paperscan
//!
//! 扫描试卷 → 对照课程教学大纲 → 统计各模块主题被考查的次数
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `SqliteStore` - 唯一的数据库连接，实现 `SyllabusStore` / `StatsStore`
//! - `TextExtractor` - OCR / 纯文本提取
//! - `CancelSignal` - 贯穿所有等待点的取消信号
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LlmService` - 调用 LLM
//! - `ExtractionClient` - prompt 构建、限流重试、JSON 解析
//! - `TopicResolver` - 主题 → 模块编号
//! - `SyllabusService` - 大纲导入
//!
//! ### ③ 流程层（Workflow）
//! - `AggregationEngine` - 单份试卷：提取 → 归属 → 累加
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchRunner` - 按课程、按文件名顺序处理整个目录
//! - `App` - 装配与资源生命周期

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CancelSignal, SqliteStore};
pub use models::{DocumentName, MatchedTopic, Module, SyllabusDocument, TopicStat, TopicStatKey};
pub use orchestrator::{App, BatchReport, BatchRunner};
pub use workflow::{AggregationEngine, AggregationResult};
