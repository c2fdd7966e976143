//! 试卷处理上下文
//!
//! 封装"我正在处理哪门课程的哪份试卷"这一信息

use std::fmt::Display;

use crate::models::DocumentEntry;

#[derive(Debug, Clone)]
pub struct DocumentCtx {
    pub course_code: String,
    pub exam_type: String,
    pub file_name: String,
    /// 试卷在本课程中的序号（从1开始，仅用于日志）
    pub document_index: usize,
}

impl DocumentCtx {
    pub fn new(entry: &DocumentEntry, document_index: usize) -> Self {
        Self {
            course_code: entry.name.course_code.clone(),
            exam_type: entry.name.exam_type.clone(),
            file_name: entry.file_name.clone(),
            document_index,
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}#{} {}]",
            self.course_code, self.document_index, self.file_name
        )
    }
}
