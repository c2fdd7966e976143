pub mod aggregation;
pub mod document_ctx;

pub use aggregation::{AggregationEngine, AggregationResult};
pub use document_ctx::DocumentCtx;
