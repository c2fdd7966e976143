//! 文本提取 - 基础设施层
//!
//! 只暴露"给一个文档路径，返回全文"的能力

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// 多页文档按页顺序拼接，页间以换行分隔
    async fn extract_text(&self, path: &Path) -> AppResult<String>;
}

/// 根据配置构造提取器
pub fn from_config(config: &Config) -> Box<dyn TextExtractor> {
    match config.extractor.as_str() {
        "plain" => Box::new(PlainTextExtractor),
        _ => Box::new(OcrExtractor::new(config.ocr_dpi)),
    }
}

/// 直接读取已经提取好的 UTF-8 文本文件
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, path: &Path) -> AppResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::io(path.display().to_string(), e))
    }
}

/// 扫描件 OCR：`pdftoppm` 栅格化后逐页调用 `tesseract`
pub struct OcrExtractor {
    dpi: u32,
}

impl OcrExtractor {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// 子进程随 future 一起释放，取消时不会留下孤儿进程
    fn rasterize_command(&self, pdf_path: &Path, prefix: &Path) -> Command {
        let mut command = Command::new("pdftoppm");
        command
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(prefix)
            .kill_on_drop(true);
        command
    }

    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> AppResult<Vec<PathBuf>> {
        let output = self
            .rasterize_command(pdf_path, &out_dir.join("page"))
            .output()
            .await
            .map_err(|e| AppError::io("pdftoppm", e))?;
        check_status("pdftoppm", &output)?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir)
            .await
            .map_err(|e| AppError::io(out_dir.display().to_string(), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::io(out_dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("png") {
                pages.push(path);
            }
        }
        // pdftoppm 输出 page-01.png, page-02.png ...，位数固定，按名排序即页序
        pages.sort();
        Ok(pages)
    }

    async fn ocr_page(&self, image: &Path) -> AppResult<String> {
        let output = ocr_command(image).output().await
            .map_err(|e| AppError::io("tesseract", e))?;
        check_status("tesseract", &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn ocr_command(image: &Path) -> Command {
    let mut command = Command::new("tesseract");
    command
        .arg(image)
        .arg("stdout")
        .arg("--psm")
        .arg("6")
        .kill_on_drop(true);
    command
}

#[async_trait]
impl TextExtractor for OcrExtractor {
    async fn extract_text(&self, path: &Path) -> AppResult<String> {
        let work_dir = tempfile::tempdir().map_err(|e| AppError::io("tempdir", e))?;
        let pages = self.rasterize(path, work_dir.path()).await?;
        debug!("{} 栅格化为 {} 页", path.display(), pages.len());

        let mut chunks = Vec::with_capacity(pages.len());
        for page in &pages {
            chunks.push(self.ocr_page(page).await?);
        }
        Ok(chunks.join("\n"))
    }
}

fn check_status(program: &str, output: &std::process::Output) -> AppResult<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(AppError::io(
        program,
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "退出码 {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_extractor_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BITE301L-CAT1.txt");
        std::fs::write(&path, "Q1. Explain recursion.").unwrap();

        let text = PlainTextExtractor.extract_text(&path).await.unwrap();
        assert_eq!(text, "Q1. Explain recursion.");
    }

    #[tokio::test]
    async fn test_plain_extractor_missing_file_is_io_error() {
        let err = PlainTextExtractor
            .extract_text(Path::new("/nonexistent/paper.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }

    #[test]
    fn test_ocr_commands_are_killed_on_drop() {
        let rasterize = OcrExtractor::new(150)
            .rasterize_command(Path::new("paper.pdf"), Path::new("/tmp/work/page"));
        assert!(rasterize.get_kill_on_drop());
        let args: Vec<_> = rasterize.as_std().get_args().collect();
        assert_eq!(args, ["-r", "150", "-png", "paper.pdf", "/tmp/work/page"]);

        let ocr = ocr_command(Path::new("page-1.png"));
        assert!(ocr.get_kill_on_drop());
        assert_eq!(ocr.as_std().get_program(), "tesseract");
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 poppler-utils 与 tesseract
    async fn test_ocr_extractor_on_sample_pdf() {
        let path = Path::new("question_papers/BITE301L-CAT1.pdf");
        let text = OcrExtractor::new(300).extract_text(path).await.unwrap();
        assert!(!text.trim().is_empty());
    }
}
