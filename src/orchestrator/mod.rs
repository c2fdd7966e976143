//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用装配
//! - 打开 / 关闭存储，构造并注入各组件
//!
//! ### `batch_processor` - 批量试卷处理器
//! - 扫描目录、按课程分组、确定处理顺序
//! - 汇总整批统计
//!
//! ### `course_processor` - 单门课程处理器
//! - 逐份处理一门课程的试卷，隔离单份失败
//!
//! ### `syllabus_loader` - 教学大纲批量导入
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Course>)
//!     ↓
//! course_processor (处理 Vec<Document>)
//!     ↓
//! workflow::AggregationEngine (处理单份试卷)
//!     ↓
//! services (能力层：extraction / resolver / llm)
//!     ↓
//! infrastructure (基础设施：store / OCR / cancel)
//! ```

pub mod app;
pub mod batch_processor;
pub mod course_processor;
pub mod syllabus_loader;

pub use app::App;
pub use batch_processor::{BatchReport, BatchRunner};
pub use course_processor::{CourseStats, DocumentFailure};
pub use syllabus_loader::{IngestStats, SyllabusLoader};
