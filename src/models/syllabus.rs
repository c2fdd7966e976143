use serde::{Deserialize, Deserializer, Serialize};

/// 课程教学大纲（每门课程一份）
///
/// 由大纲导入流程整体写入 / 替换，统计流程只读
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyllabusDocument {
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub course_title: String,
    /// 模块顺序与原始文档一致
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// 大纲中的一个模块
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    /// 模块编号，统计时作为聚合键（而不是标题）
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub module_number: String,
    #[serde(default)]
    pub module_title: String,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub hours: Option<String>,
    /// 原始主题字符串，每条可能用破折号打包了多个主题
    #[serde(default, deserialize_with = "deserialize_topics")]
    pub topics: Vec<String>,
}

impl SyllabusDocument {
    pub fn new(course_code: impl Into<String>, modules: Vec<Module>) -> Self {
        Self {
            course_code: course_code.into(),
            course_title: String::new(),
            modules,
        }
    }
}

impl Module {
    pub fn new(module_number: impl Into<String>, topics: Vec<&str>) -> Self {
        Self {
            module_number: module_number.into(),
            module_title: String::new(),
            hours: None,
            topics: topics.into_iter().map(str::to_string).collect(),
        }
    }
}

// LLM 有时把编号写成数字，有时写成字符串
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

fn deserialize_topics<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_number_accepts_integer() {
        let module: Module =
            serde_json::from_str(r#"{"module_number": 3, "topics": ["Trees - Graphs"]}"#).unwrap();
        assert_eq!(module.module_number, "3");
        assert_eq!(module.topics, vec!["Trees - Graphs"]);
    }

    #[test]
    fn test_topics_accepts_single_string() {
        let module: Module = serde_json::from_str(
            r#"{"module_number": "1", "module_title": "Intro", "hours": 6, "topics": "Arrays – Strings"}"#,
        )
        .unwrap();
        assert_eq!(module.hours.as_deref(), Some("6"));
        assert_eq!(module.topics, vec!["Arrays – Strings"]);
    }

    #[test]
    fn test_syllabus_ignores_unknown_sections() {
        let doc: SyllabusDocument = serde_json::from_str(
            r#"{
                "course_code": "BITE301L",
                "course_title": "Data Structures",
                "course_objectives": ["x"],
                "reference_books": [],
                "modules": [{"module_number": "1", "topics": []}]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.course_code, "BITE301L");
        assert_eq!(doc.modules.len(), 1);
    }
}
