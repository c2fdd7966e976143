//! 单门课程处理器 - 编排层
//!
//! 按文件名顺序逐份处理一门课程的试卷。
//! 单份失败只计数、记日志，不影响后续试卷；只有取消会中止。

use std::path::Path;

use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{CancelSignal, TextExtractor};
use crate::models::DocumentEntry;
use crate::utils::logging::truncate_text;
use crate::workflow::{AggregationEngine, AggregationResult, DocumentCtx};

/// 单份失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub file_name: String,
    pub message: String,
}

/// 课程处理统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseStats {
    pub processed: usize,
    pub errored: usize,
    pub unique_topics: usize,
    pub total_occurrences: u64,
    pub failures: Vec<DocumentFailure>,
}

/// 处理一门课程的全部试卷
///
/// 只在取消时返回 `Err`
pub async fn process_course(
    engine: &AggregationEngine,
    extractor: &dyn TextExtractor,
    cancel: &CancelSignal,
    documents: &[DocumentEntry],
) -> AppResult<CourseStats> {
    let mut stats = CourseStats::default();

    for (index, entry) in documents.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let ctx = DocumentCtx::new(entry, index + 1);
        info!("{} 开始处理 ({}/{})", ctx, index + 1, documents.len());

        match process_document(engine, extractor, cancel, &ctx, &entry.path).await {
            Ok(result) => {
                info!(
                    "{} ✓ 命中 {} 个主题，共 {} 次，归属 {} 条，丢弃 {} 条",
                    ctx,
                    result.unique_topics,
                    result.total_occurrences,
                    result.resolved,
                    result.unresolved
                );
                stats.processed += 1;
                stats.unique_topics += result.unique_topics;
                stats.total_occurrences += result.total_occurrences;
            }
            Err(e) if e.is_cancelled() => {
                info!("{} 已取消", ctx);
                return Err(e);
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                stats.errored += 1;
                stats.failures.push(DocumentFailure {
                    file_name: ctx.file_name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(stats)
}

async fn process_document(
    engine: &AggregationEngine,
    extractor: &dyn TextExtractor,
    cancel: &CancelSignal,
    ctx: &DocumentCtx,
    path: &Path,
) -> AppResult<AggregationResult> {
    let text = tokio::select! {
        text = extractor.extract_text(path) => text?,
        _ = cancel.cancelled() => return Err(AppError::Cancelled),
    };
    info!(
        "{} 文本长度: {} 字符 | {}",
        ctx,
        text.chars().count(),
        truncate_text(text.trim(), 40).replace('\n', " ")
    );

    engine
        .process_document(&text, &ctx.course_code, &ctx.exam_type)
        .await
}
