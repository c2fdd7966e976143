/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::error::{AppError, AppResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅者
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件（写入带时间戳的文件头）
pub fn init_log_file(log_file_path: &str, title: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n{} - {}\n{}\n\n",
        "=".repeat(60),
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::io(log_file_path, e))
}

/// 向日志文件追加内容
pub fn append_to_log_file(log_file_path: &str, content: &str) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| AppError::io(log_file_path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::io(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, folder: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!("📁 目录: {}", folder);
    info!("{}", "=".repeat(60));
}

/// 记录课程开始
pub fn log_course_start(
    course_index: usize,
    total_courses: usize,
    course_code: &str,
    documents: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 开始处理第 {}/{} 门课程: {}",
        course_index, total_courses, course_code
    );
    info!("📄 本课程试卷: {} 份", documents);
    info!("{}", "=".repeat(60));
}

/// 记录课程完成
pub fn log_course_complete(course_code: &str, processed: usize, errored: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 课程 {} 完成: 成功 {}/{}",
        course_code,
        processed,
        processed + errored
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("教学大纲主题统计", 4), "教学大纲...");
    }

    #[test]
    fn test_log_file_header_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let path = path.to_str().unwrap();

        init_log_file(path, "试卷统计日志").unwrap();
        append_to_log_file(path, "课程 BITE301L\n").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("试卷统计日志"));
        assert!(content.ends_with("课程 BITE301L\n"));
    }
}
