//! 主题归属解析 - 业务能力层
//!
//! 把 LLM 给出的自由文本主题名对应到大纲中的模块编号。
//! 匹配规则是刻意保持简单的子串启发式：完全相等，或任一方包含另一方，
//! 按"模块顺序 → 模块内主题顺序"取第一个命中。
//! 短词会误命中（如 "set" 命中 "subset"），这是已知且被接受的行为，
//! 统计结果依赖这条规则，修改前必须同步评估。

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::SyllabusStore;
use crate::models::SyllabusDocument;

fn dash_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // 连字符、en-dash、em-dash
    PATTERN.get_or_init(|| Regex::new(r"[-–—]").expect("静态正则"))
}

/// 把一条原始主题字符串按破折号拆成多个主题名（去空白、去空段）
pub fn split_topics(raw: &str) -> Vec<String> {
    dash_pattern()
        .split(raw)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize(topic: &str) -> String {
    topic.trim().to_lowercase()
}

fn is_match(candidate: &str, topic: &str) -> bool {
    candidate == topic || candidate.contains(topic) || topic.contains(candidate)
}

/// 在给定大纲内查找主题所属模块编号
pub fn resolve_in_syllabus(syllabus: &SyllabusDocument, topic_name: &str) -> Option<String> {
    let topic = normalize(topic_name);
    // 空串是任何字符串的子串，会命中第一个模块
    if topic.is_empty() {
        return None;
    }

    for module in &syllabus.modules {
        for raw in &module.topics {
            for candidate in split_topics(raw) {
                if is_match(&normalize(&candidate), &topic) {
                    return Some(module.module_number.clone());
                }
            }
        }
    }
    None
}

/// 主题解析服务
pub struct TopicResolver {
    syllabi: Arc<dyn SyllabusStore>,
}

impl TopicResolver {
    pub fn new(syllabi: Arc<dyn SyllabusStore>) -> Self {
        Self { syllabi }
    }

    /// 返回模块编号；课程无大纲或无命中时为 `None`（不是错误）
    pub async fn resolve(&self, course_code: &str, topic_name: &str) -> AppResult<Option<String>> {
        let Some(syllabus) = self.syllabi.find_by_course_code(course_code).await? else {
            debug!("课程 {} 没有大纲，主题 '{}' 无法归属", course_code, topic_name);
            return Ok(None);
        };
        Ok(resolve_in_syllabus(&syllabus, topic_name))
    }
}
