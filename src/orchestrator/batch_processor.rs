//! 批量试卷处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **扫描**：列出目录中指定扩展名的试卷，按文件名解析课程代码分组
//! 2. **顺序处理**：课程按代码排序、课程内按文件名排序，逐份串行处理
//! 3. **失败隔离**：单份失败计入错误数，不中止批处理；取消立即中止
//! 4. **统计**：按课程汇总成功 / 失败数量
//!
//! 不并发调用外部服务：LLM 的限流让并发得不偿失

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::{CancelSignal, TextExtractor};
use crate::models::load_inventory;
use crate::orchestrator::course_processor::{self, CourseStats};
use crate::utils::logging::{log_course_complete, log_course_start};
use crate::workflow::AggregationEngine;

/// 整批处理报告
#[derive(Debug, Default)]
pub struct BatchReport {
    pub courses: BTreeMap<String, CourseStats>,
    /// 文件名不符合约定而跳过的文件
    pub skipped_files: Vec<String>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.courses.values().map(|c| c.processed).sum()
    }

    pub fn errored(&self) -> usize {
        self.courses.values().map(|c| c.errored).sum()
    }

    /// 渲染为纯文本（写入日志文件）
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(
            out,
            "📊 全部处理完成统计 - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out, "{}", "=".repeat(60));
        for (course_code, stats) in &self.courses {
            let _ = writeln!(
                out,
                "{}: 成功 {} / 失败 {} | 主题 {} | 出现次数 {}",
                course_code,
                stats.processed,
                stats.errored,
                stats.unique_topics,
                stats.total_occurrences
            );
            for failure in &stats.failures {
                let _ = writeln!(out, "    ❌ {}: {}", failure.file_name, failure.message);
            }
        }
        if !self.skipped_files.is_empty() {
            let _ = writeln!(
                out,
                "跳过（文件名无法解析）: {}",
                self.skipped_files.join(", ")
            );
        }
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "✅ 成功: {}", self.processed());
        let _ = writeln!(out, "❌ 失败: {}", self.errored());
        let _ = writeln!(out, "{}", "=".repeat(60));
        out
    }
}

/// 批量处理器
pub struct BatchRunner {
    engine: AggregationEngine,
    extractor: Box<dyn TextExtractor>,
    cancel: CancelSignal,
    document_extension: String,
}

impl BatchRunner {
    pub fn new(
        engine: AggregationEngine,
        extractor: Box<dyn TextExtractor>,
        cancel: CancelSignal,
        document_extension: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            extractor,
            cancel,
            document_extension: document_extension.into(),
        }
    }

    /// 处理目录下的全部试卷
    ///
    /// 只有目录不可读或被取消时返回 `Err`
    pub async fn run_all(&self, document_dir: &Path) -> AppResult<BatchReport> {
        info!("\n📁 正在扫描待处理的试卷...");
        let inventory = load_inventory(document_dir, &self.document_extension).await?;

        let mut report = BatchReport {
            skipped_files: inventory.skipped,
            ..Default::default()
        };

        if inventory.courses.is_empty() {
            warn!("⚠️ 没有找到待处理的试卷");
            return Ok(report);
        }

        let total_courses = inventory.courses.len();
        for (course_index, (course_code, documents)) in inventory.courses.iter().enumerate() {
            log_course_start(course_index + 1, total_courses, course_code, documents.len());

            let stats = course_processor::process_course(
                &self.engine,
                self.extractor.as_ref(),
                &self.cancel,
                documents,
            )
            .await?;

            log_course_complete(course_code, stats.processed, stats.errored);
            report.courses.insert(course_code.clone(), stats);
        }

        Ok(report)
    }
}
