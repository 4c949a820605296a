use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

use submission_grader::error::ConfigError;
use submission_grader::orchestrator::{init_db, GradeApp, ScrapeApp};
use submission_grader::{logger, Config, RunMode};

/// 抓取学生提交并用 LLM 评分
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// 覆盖选择器和时间参数的 TOML 文件
    #[arg(long, global = true, env = "GRADER_SETTINGS_FILE")]
    settings: Option<PathBuf>,

    /// 输出详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录平台，逐页抓取提交并写入数据库
    Scrape {
        /// 只解析不写库
        #[arg(long)]
        dry_run: bool,
    },
    /// 为尚未评分的提交评分
    Grade,
    /// 创建数据表
    InitDb,
}

impl Command {
    fn mode(&self) -> RunMode {
        match self {
            Command::Scrape { dry_run: true } => RunMode::DryRun,
            Command::Scrape { dry_run: false } => RunMode::Scrape,
            Command::Grade => RunMode::Grade,
            Command::InitDb => RunMode::InitDb,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env()?;
    if let Some(path) = &cli.settings {
        config.apply_settings_file(path)?;
    }

    // 初始化日志
    logger::init(cli.verbose || config.verbose_logging);

    let mode = cli.command.mode();
    let missing = config.missing_for(mode);
    if !missing.is_empty() {
        for var_name in &missing {
            error!("缺少环境变量: {}", var_name);
        }
        return Err(ConfigError::EnvVarNotFound {
            var_name: missing.join(", "),
        }
        .into());
    }

    match cli.command {
        Command::Scrape { dry_run } => {
            let report = ScrapeApp::initialize(config, dry_run).await?.run().await?;
            if report.is_degraded() {
                warn!("⚠️ 抓取未完整结束，已写入的数据保留");
            }
        }
        Command::Grade => {
            GradeApp::initialize(config).await?.run().await?;
        }
        Command::InitDb => {
            init_db(&config).await?;
        }
    }

    Ok(())
}
