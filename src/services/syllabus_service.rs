//! 教学大纲导入服务 - 业务能力层
//!
//! OCR 文本 → LLM 结构化 → 整体替换写入大纲存储

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::SyllabusStore;
use crate::models::document_name::syllabus_course_code;
use crate::models::SyllabusDocument;
use crate::services::extraction_client::ExtractionClient;

pub struct SyllabusService {
    extraction: Arc<ExtractionClient>,
    syllabi: Arc<dyn SyllabusStore>,
}

impl SyllabusService {
    pub fn new(extraction: Arc<ExtractionClient>, syllabi: Arc<dyn SyllabusStore>) -> Self {
        Self {
            extraction,
            syllabi,
        }
    }

    /// 导入一份大纲
    ///
    /// LLM 未给出课程代码时，使用文件名中第一个 `_` 之前的部分
    pub async fn ingest(
        &self,
        document_text: &str,
        file_name: &str,
    ) -> AppResult<SyllabusDocument> {
        let mut syllabus = self.extraction.extract_syllabus(document_text).await?;

        let course_code = syllabus.course_code.trim().to_string();
        if course_code.is_empty() {
            let fallback = syllabus_course_code(file_name);
            warn!("⚠️ LLM 未返回课程代码，使用文件名推断: {}", fallback);
            syllabus.course_code = fallback;
        } else {
            syllabus.course_code = course_code;
        }

        self.syllabi.replace(&syllabus).await?;
        info!(
            "✓ 大纲已保存: {} ({} 个模块)",
            syllabus.course_code,
            syllabus.modules.len()
        );
        Ok(syllabus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{CancelSignal, SqliteStore};
    use crate::services::extraction_client::RetryPolicy;
    use crate::services::llm_service::{GenerationError, TextGenerator};
    use async_trait::async_trait;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    fn service(response: &'static str, store: Arc<SqliteStore>) -> SyllabusService {
        let extraction = Arc::new(ExtractionClient::new(
            Arc::new(FixedGenerator(response)),
            store.clone(),
            RetryPolicy::default(),
            CancelSignal::new(),
        ));
        SyllabusService::new(extraction, store)
    }

    #[tokio::test]
    async fn test_ingest_stores_syllabus() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let service = service(
            r#"{"course_code": " BITE303L ", "modules": [{"module_number": "1", "topics": ["Processes"]}]}"#,
            store.clone(),
        );

        service.ingest("ocr", "whatever.pdf").await.unwrap();

        let stored = store.find_by_course_code("BITE303L").await.unwrap().unwrap();
        assert_eq!(stored.modules[0].topics, vec!["Processes"]);
    }

    #[tokio::test]
    async fn test_ingest_falls_back_to_filename_course_code() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let service = service(r#"{"modules": []}"#, store.clone());

        let syllabus = service.ingest("ocr", "BCHY101L_syllabus.pdf").await.unwrap();

        assert_eq!(syllabus.course_code, "BCHY101L");
        assert!(store.find_by_course_code("BCHY101L").await.unwrap().is_some());
    }
}
