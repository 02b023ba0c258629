//! srs-merger 命令行入口

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use srs_merger::config::DEFAULT_CONFIG_FILE;
use srs_merger::{ConfigManager, CustomConfigBuilder, Pipeline, RetentionPolicy, SourceFailurePolicy};

/// 拉取并合并 sing-box 规则集
#[derive(Parser, Debug, Clone)]
#[command(name = "srs-merger", version, about = "Merge remote sing-box rule-sets per routing category")]
struct Args {
    /// 配置文件路径（含 routing_domain）
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// 产物输出目录
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// sing-box 可执行文件
    #[arg(long)]
    codec_binary: Option<PathBuf>,

    /// 产物保留策略
    #[arg(long, value_enum)]
    retention: Option<RetentionPolicy>,

    /// 单个规则源失败时的处理方式
    #[arg(long, value_enum)]
    on_source_error: Option<SourceFailurePolicy>,

    /// 单个分类内的最大并发拉取数
    #[arg(long)]
    concurrency: Option<usize>,

    /// HTTP 超时（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let file_config = ConfigManager::load_file(&args.config)
        .with_context(|| format!("加载配置 {} 失败", args.config.display()))?;

    let mut builder = CustomConfigBuilder::from_config(file_config);
    if let Some(dir) = args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(bin) = args.codec_binary {
        builder = builder.codec_binary(bin);
    }
    if let Some(policy) = args.retention {
        builder = builder.retention(policy);
    }
    if let Some(policy) = args.on_source_error {
        builder = builder.on_source_error(policy);
    }
    if let Some(limit) = args.concurrency {
        builder = builder.max_concurrent_fetches(limit);
    }
    if let Some(secs) = args.timeout {
        builder = builder.http_timeout(secs);
    }

    let pipeline = Pipeline::from_config(builder.build()).context("初始化流水线失败")?;
    let report = pipeline.run().await.context("准备输出目录失败")?;

    for (category, err) in report.failures() {
        error!("分类 [{}] 在 {} 阶段失败：{}", category, err.stage(), err);
    }
    if report.is_success() {
        info!("全部 {} 个分类处理完成", report.categories.len());
    }
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
