//! 试卷文件名约定：`<course_code>-<exam_type>[-...].<ext>`

use crate::error::{AppResult, FilenameError};
use std::path::Path;

/// 从文件名解析出的课程代码和考试类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentName {
    pub course_code: String,
    pub exam_type: String,
}

impl DocumentName {
    /// 去掉扩展名后按 `-` 切分，取前两段；其余段忽略
    pub fn parse(filename: &str) -> AppResult<Self> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        let mut segments = stem.split('-');
        match (segments.next(), segments.next()) {
            (Some(course_code), Some(exam_type)) => Ok(Self {
                course_code: course_code.to_string(),
                exam_type: exam_type.to_string(),
            }),
            _ => Err(FilenameError::Unparsable {
                filename: filename.to_string(),
            }
            .into()),
        }
    }
}

/// 教学大纲文件名中的课程代码（第一个 `_` 之前的部分）
pub fn syllabus_course_code(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    stem.split('_').next().unwrap_or(stem).to_string()
}
