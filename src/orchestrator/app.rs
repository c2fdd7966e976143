//! 应用装配
//!
//! 唯一持有存储连接的地方：初始化时打开，各组件通过 `Arc` 注入使用，结束时显式关闭

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{text_extractor, CancelSignal, SqliteStore, StatsStore};
use crate::models::TopicStat;
use crate::orchestrator::batch_processor::{BatchReport, BatchRunner};
use crate::orchestrator::syllabus_loader::{IngestStats, SyllabusLoader};
use crate::services::{ExtractionClient, LlmService, RetryPolicy, SyllabusService};
use crate::utils::logging::{append_to_log_file, init_log_file, log_startup};
use crate::workflow::AggregationEngine;

pub struct App {
    config: Config,
    store: Arc<SqliteStore>,
    cancel: CancelSignal,
}

impl App {
    /// 初始化应用（打开数据库）
    pub fn initialize(config: Config, cancel: CancelSignal) -> AppResult<Self> {
        let store = Arc::new(SqliteStore::open(&config.database_path)?);
        Ok(Self {
            config,
            store,
            cancel,
        })
    }

    fn extraction_client(&self) -> AppResult<Arc<ExtractionClient>> {
        self.config.validate()?;
        Ok(Arc::new(ExtractionClient::new(
            Arc::new(LlmService::new(&self.config)),
            self.store.clone(),
            RetryPolicy::from_config(&self.config),
            self.cancel.clone(),
        )))
    }

    /// 统计目录下全部试卷
    pub async fn run(&self, document_dir: Option<&Path>) -> AppResult<BatchReport> {
        let dir = document_dir.unwrap_or_else(|| Path::new(&self.config.document_dir));
        init_log_file(&self.config.output_log_file, "试卷主题统计日志")?;
        log_startup("试卷主题统计", &dir.display().to_string());

        let engine = AggregationEngine::new(self.extraction_client()?, self.store.clone());
        let runner = BatchRunner::new(
            engine,
            text_extractor::from_config(&self.config),
            self.cancel.clone(),
            self.config.document_extension.clone(),
        );

        let report = runner.run_all(dir).await?;

        let rendered = report.render();
        for line in rendered.lines() {
            info!("{}", line);
        }
        append_to_log_file(&self.config.output_log_file, &rendered)?;
        info!("\n日志已保存至: {}", self.config.output_log_file);

        Ok(report)
    }

    /// 导入目录下全部教学大纲
    pub async fn ingest_syllabi(&self, syllabus_dir: Option<&Path>) -> AppResult<IngestStats> {
        let dir = syllabus_dir.unwrap_or_else(|| Path::new(&self.config.syllabus_dir));
        log_startup("教学大纲导入", &dir.display().to_string());

        let service = SyllabusService::new(self.extraction_client()?, self.store.clone());
        let loader = SyllabusLoader::new(
            service,
            text_extractor::from_config(&self.config),
            self.cancel.clone(),
            self.config.document_extension.clone(),
        );
        loader.run_all(dir).await
    }

    /// 查询已有统计
    pub async fn report(
        &self,
        course_code: &str,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<TopicStat>> {
        self.store.list_stats(course_code, exam_type).await
    }

    /// 关闭数据库连接
    pub fn shutdown(self) -> AppResult<()> {
        match Arc::try_unwrap(self.store) {
            Ok(store) => store.close(),
            Err(_) => {
                warn!("⚠️ 存储仍被其它组件持有，连接将在释放时关闭");
                Ok(())
            }
        }
    }
}
