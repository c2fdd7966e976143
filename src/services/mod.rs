pub mod extraction_client;
pub mod llm_service;
pub mod syllabus_service;
pub mod topic_resolver;

pub use extraction_client::{ExtractionClient, RetryPolicy};
pub use llm_service::{GenerationError, LlmService, TextGenerator};
pub use syllabus_service::SyllabusService;
pub use topic_resolver::{split_topics, TopicResolver};
