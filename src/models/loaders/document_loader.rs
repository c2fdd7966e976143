use crate::error::{AppError, AppResult};
use crate::models::document_name::DocumentName;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// 一份待处理的试卷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub name: DocumentName,
}

/// 按课程分组后的待处理试卷
///
/// 课程按代码排序，课程内按文件名排序，保证重复运行的处理顺序一致
#[derive(Debug, Default)]
pub struct DocumentInventory {
    pub courses: BTreeMap<String, Vec<DocumentEntry>>,
    /// 文件名不符合约定而被跳过的文件
    pub skipped: Vec<String>,
}

impl DocumentInventory {
    pub fn document_count(&self) -> usize {
        self.courses.values().map(Vec::len).sum()
    }
}

/// 列出目录下指定扩展名的文件（不区分大小写），按文件名排序
pub async fn list_documents(folder_path: &Path, extension: &str) -> AppResult<Vec<PathBuf>> {
    if !folder_path.is_dir() {
        return Err(AppError::io(
            folder_path.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "目录不存在"),
        ));
    }

    let mut entries = fs::read_dir(folder_path)
        .await
        .map_err(|e| AppError::io(folder_path.display().to_string(), e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::io(folder_path.display().to_string(), e))?
    {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// 扫描试卷目录并按课程分组
pub async fn load_inventory(folder_path: &Path, extension: &str) -> AppResult<DocumentInventory> {
    let mut inventory = DocumentInventory::default();

    for path in list_documents(folder_path, extension).await? {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        match DocumentName::parse(&file_name) {
            Ok(name) => {
                inventory
                    .courses
                    .entry(name.course_code.clone())
                    .or_default()
                    .push(DocumentEntry {
                        path,
                        file_name,
                        name,
                    });
            }
            Err(e) => {
                warn!("⚠️ 跳过文件 {}: {}", file_name, e);
                inventory.skipped.push(file_name);
            }
        }
    }

    for docs in inventory.courses.values_mut() {
        docs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    }

    info!(
        "✓ 找到 {} 门课程，共 {} 份试卷",
        inventory.courses.len(),
        inventory.document_count()
    );

    Ok(inventory)
}
