use serde::{Deserialize, Deserializer, Serialize};

/// 单份试卷单个主题可累加的最大次数，保证累计值一直是 SQLite 整数
pub const MAX_OCCURRENCES: u64 = u32::MAX as u64;

/// LLM 针对单份试卷返回的一条主题命中
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedTopic {
    /// 自由文本主题名，不保证与大纲中的主题逐字相同
    #[serde(default)]
    pub topic: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub count: Option<i64>,
}

impl MatchedTopic {
    pub fn new(topic: impl Into<String>, count: i64) -> Self {
        Self {
            topic: topic.into(),
            count: Some(count),
        }
    }

    /// 出现次数；缺失或非正数时按 1 计，过大时截断为 `MAX_OCCURRENCES`
    pub fn occurrences(&self) -> u64 {
        match self.count {
            Some(n) if n > 0 => (n as u64).min(MAX_OCCURRENCES),
            _ => 1,
        }
    }
}

/// LLM 输出契约：`{"matched_topics": [{"topic": ..., "count": ...}]}`
#[derive(Debug, Deserialize)]
pub struct MatchedTopicsResponse {
    pub matched_topics: Vec<MatchedTopic>,
}

/// 统计记录的唯一键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicStatKey {
    pub course_code: String,
    pub exam_type: String,
    pub module_number: String,
    pub topic: String,
}

impl TopicStatKey {
    pub fn new(
        course_code: impl Into<String>,
        exam_type: impl Into<String>,
        module_number: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            course_code: course_code.into(),
            exam_type: exam_type.into(),
            module_number: module_number.into(),
            topic: topic.into(),
        }
    }
}

/// 持久化的主题统计，count 只增不减
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStat {
    #[serde(flatten)]
    pub key: TopicStatKey,
    pub count: u64,
}

// 兼容 2 / 2.0 / null 三种写法；字符串视为格式错误
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = Option<i64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or null")
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(i64::try_from(value).unwrap_or(i64::MAX)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value as i64))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_non_positive_count_is_one() {
        let parsed: MatchedTopicsResponse = serde_json::from_str(
            r#"{"matched_topics": [
                {"topic": "Recursion"},
                {"topic": "Stacks", "count": 0},
                {"topic": "Queues", "count": -2},
                {"topic": "Heaps", "count": null},
                {"topic": "Trees", "count": 3},
                {"topic": "Graphs", "count": 2.0}
            ]}"#,
        )
        .unwrap();
        let counts: Vec<u64> = parsed.matched_topics.iter().map(|t| t.occurrences()).collect();
        assert_eq!(counts, vec![1, 1, 1, 1, 3, 2]);
    }

    #[test]
    fn test_oversized_count_is_clamped() {
        let parsed: MatchedTopicsResponse = serde_json::from_str(
            r#"{"matched_topics": [
                {"topic": "Recursion", "count": 18446744073709551615},
                {"topic": "Stacks", "count": 1e30},
                {"topic": "Queues", "count": 4294967296}
            ]}"#,
        )
        .unwrap();
        for topic in &parsed.matched_topics {
            assert_eq!(topic.occurrences(), MAX_OCCURRENCES);
        }
    }

    #[test]
    fn test_string_count_is_rejected() {
        let parsed = serde_json::from_str::<MatchedTopicsResponse>(
            r#"{"matched_topics": [{"topic": "Recursion", "count": "two"}]}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_matched_topics_field_is_rejected() {
        assert!(serde_json::from_str::<MatchedTopicsResponse>(r#"{"topics": []}"#).is_err());
    }
}
