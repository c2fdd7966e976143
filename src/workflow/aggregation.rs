//! 主题统计流程 - 流程层
//!
//! 定义"一份试卷"的完整处理流程：
//! 1. 读取一次课程大纲，LLM 据此提取命中主题
//! 2. 在同一份大纲内逐条解析所属模块（找不到就静默丢弃）
//! 3. 对 (课程, 考试类型, 模块, 主题) 做原子累加
//!
//! 唯一的持久化副作用是第 3 步的累加；每份试卷的累加彼此独立，
//! 因此任意处理顺序得到相同的最终统计。

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::StatsStore;
use crate::models::TopicStatKey;
use crate::services::topic_resolver::resolve_in_syllabus;
use crate::services::ExtractionClient;

/// 单份试卷的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationResult {
    /// 去重后的命中主题数（不论能否归属模块）
    pub unique_topics: usize,
    /// 命中主题出现次数之和（不论能否归属模块）
    pub total_occurrences: u64,
    /// 成功归属并写入统计的条目数
    pub resolved: usize,
    /// 无法归属而丢弃的条目数
    pub unresolved: usize,
}

pub struct AggregationEngine {
    extraction: Arc<ExtractionClient>,
    stats: Arc<dyn StatsStore>,
}

impl AggregationEngine {
    pub fn new(extraction: Arc<ExtractionClient>, stats: Arc<dyn StatsStore>) -> Self {
        Self { extraction, stats }
    }

    /// 处理一份试卷
    ///
    /// `SyllabusMissing` / `RateLimitExceeded` / `Cancelled` 原样向上返回，由调用方决定如何处理
    pub async fn process_document(
        &self,
        document_text: &str,
        course_code: &str,
        exam_type: &str,
    ) -> AppResult<AggregationResult> {
        let syllabus = self.extraction.load_syllabus(course_code).await?;
        let matched = self
            .extraction
            .extract_topics_with(&syllabus, document_text)
            .await?;

        let mut result = AggregationResult::default();
        let mut seen = HashSet::new();

        for item in &matched {
            let topic = item.topic.trim();
            if topic.is_empty() {
                continue;
            }
            let occurrences = item.occurrences();
            if seen.insert(topic.to_string()) {
                result.unique_topics += 1;
            }
            result.total_occurrences += occurrences;

            let Some(module_number) = resolve_in_syllabus(&syllabus, topic) else {
                debug!("主题 '{}' 未能归属到 {} 的任何模块，跳过", topic, course_code);
                result.unresolved += 1;
                continue;
            };

            let key = TopicStatKey::new(course_code, exam_type, module_number, topic);
            self.stats.increment_count(&key, occurrences).await?;
            result.resolved += 1;
        }

        Ok(result)
    }
}
