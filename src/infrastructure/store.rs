//! 存储能力接口
//!
//! 组件只依赖这两个 trait，由调用方显式注入具体存储

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{SyllabusDocument, TopicStat, TopicStatKey};

/// 教学大纲存储（统计流程只读）
#[async_trait]
pub trait SyllabusStore: Send + Sync {
    /// 按课程代码精确查找，不存在时返回 `None`
    async fn find_by_course_code(&self, course_code: &str) -> AppResult<Option<SyllabusDocument>>;

    /// 整体写入或替换某门课程的大纲
    async fn replace(&self, syllabus: &SyllabusDocument) -> AppResult<()>;
}

/// 主题统计存储
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// 原子地"不存在则以 delta 创建，存在则累加 delta"
    async fn increment_count(&self, key: &TopicStatKey, delta: u64) -> AppResult<()>;

    /// 读取单条统计，不存在时为 0
    async fn get_count(&self, key: &TopicStatKey) -> AppResult<u64>;

    /// 列出某门课程（可选限定考试类型）的全部统计
    async fn list_stats(
        &self,
        course_code: &str,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<TopicStat>>;
}
