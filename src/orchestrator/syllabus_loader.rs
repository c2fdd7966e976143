//! 教学大纲批量导入 - 编排层

use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, TextExtractor};
use crate::models::loaders::document_loader::list_documents;
use crate::services::SyllabusService;

/// 导入统计
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// 成功导入的课程代码（按处理顺序）
    pub imported: Vec<String>,
    pub failed: usize,
}

pub struct SyllabusLoader {
    service: SyllabusService,
    extractor: Box<dyn TextExtractor>,
    cancel: CancelSignal,
    extension: String,
}

impl SyllabusLoader {
    pub fn new(
        service: SyllabusService,
        extractor: Box<dyn TextExtractor>,
        cancel: CancelSignal,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            service,
            extractor,
            cancel,
            extension: extension.into(),
        }
    }

    /// 按文件名顺序导入目录下的全部大纲；单份失败不影响其余文件
    pub async fn run_all(&self, syllabus_dir: &Path) -> AppResult<IngestStats> {
        let files = list_documents(syllabus_dir, &self.extension).await?;
        if files.is_empty() {
            warn!("⚠️ 没有找到大纲文件: {}", syllabus_dir.display());
        }

        let mut stats = IngestStats::default();
        for path in &files {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            let file_name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            info!("正在导入大纲: {}", file_name);

            let result = async {
                let text = tokio::select! {
                    text = self.extractor.extract_text(path) => text?,
                    _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                };
                info!("OCR 文本长度: {}", text.chars().count());
                self.service.ingest(&text, &file_name).await
            }
            .await;

            match result {
                Ok(syllabus) => stats.imported.push(syllabus.course_code),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!("❌ 大纲 {} 导入失败: {}", file_name, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "✓ 大纲导入完成: 成功 {}, 失败 {}",
            stats.imported.len(),
            stats.failed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteStore;
    use crate::services::{ExtractionClient, GenerationError, RetryPolicy, TextGenerator};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NeverCalled;

    #[async_trait]
    impl TextGenerator for NeverCalled {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::failed("unexpected call"))
        }
    }

    /// 模拟卡住的 OCR
    struct StuckExtractor;

    #[async_trait]
    impl TextExtractor for StuckExtractor {
        async fn extract_text(&self, _path: &Path) -> AppResult<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_syllabus_extraction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BITE301L_syllabus.txt"), "ocr").unwrap();

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cancel = CancelSignal::new();
        let extraction = Arc::new(ExtractionClient::new(
            Arc::new(NeverCalled),
            store.clone(),
            RetryPolicy::default(),
            cancel.clone(),
        ));
        let loader = SyllabusLoader::new(
            SyllabusService::new(extraction, store),
            Box::new(StuckExtractor),
            cancel.clone(),
            "txt",
        );

        let trigger = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let err = loader.run_all(dir.path()).await.unwrap_err();
        trigger.await.unwrap();
        assert!(err.is_cancelled());
    }
}
