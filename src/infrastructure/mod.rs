//! 基础设施层
//!
//! 持有稀缺资源（数据库连接、外部 OCR 命令、取消信号），只暴露能力

pub mod cancel;
pub mod sqlite_store;
pub mod store;
pub mod text_extractor;

pub use cancel::CancelSignal;
pub use sqlite_store::SqliteStore;
pub use store::{StatsStore, SyllabusStore};
pub use text_extractor::{OcrExtractor, PlainTextExtractor, TextExtractor};
