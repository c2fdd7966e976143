use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paperscan::utils::logging;
use paperscan::{App, CancelSignal, Config};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "paperscan", version, about = "统计试卷对教学大纲各主题的考查次数")]
struct Cli {
    /// TOML 配置文件（环境变量优先级更高）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 处理试卷目录并累加主题统计（默认）
    Run {
        /// 覆盖配置中的试卷目录
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// 导入教学大纲目录
    IngestSyllabi {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// 查看某门课程的统计
    Report {
        course_code: String,
        #[arg(long)]
        exam: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，正在停止...");
                cancel.cancel();
            }
        });
    }

    let app = App::initialize(config, cancel).context("初始化失败")?;

    let outcome = match cli.command.unwrap_or(Command::Run { dir: None }) {
        Command::Run { dir } => app.run(dir.as_deref()).await.map(|_| ()),
        Command::IngestSyllabi { dir } => app.ingest_syllabi(dir.as_deref()).await.map(|_| ()),
        Command::Report { course_code, exam } => {
            app.report(&course_code, exam.as_deref()).await.map(|stats| {
                if stats.is_empty() {
                    info!("课程 {} 暂无统计", course_code);
                }
                for stat in stats {
                    info!(
                        "{} | 模块 {} | {} | {}",
                        stat.key.exam_type, stat.key.module_number, stat.key.topic, stat.count
                    );
                }
            })
        }
    };

    app.shutdown()?;
    outcome?;

    Ok(())
}
