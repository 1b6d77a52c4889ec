mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use settings::{DEFAULT_CONFIG_PATH, init_tracing, load_config};
use sigpool_core::common::time::{RealTimeProvider, format_capture_time};
use sigpool_core::config::AppConfig;
use sigpool_core::store::port::SignalStore;
use sigpool_feed::http::HttpJsonFeed;
use sigpool_ingest::{CycleRunner, IngestCycle, Normalizer, Scheduler};
use sigpool_store::memory::MemorySignalStore;
use sigpool_store::sqlite::SqliteSignalStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "sigpool")]
#[command(about = "Polls trading-signal sources and stores normalized signals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Keep signals in memory instead of writing to the database
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Poll all sources on a fixed interval until interrupted (default)
    Run,
    /// Run a single ingestion cycle and exit
    Once,
    /// Print the most recently stored signals
    Recent {
        /// Number of rows to show
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 读取 `.env` 与配置文件。
/// 2. 初始化全局日志。
/// 3. 按子命令实例化 Feed、Store 与采集周期并运行。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let _log_guard = init_tracing(&config.log);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config, cli.dry_run).await,
        Command::Once => once(config, cli.dry_run).await,
        Command::Recent { limit } => recent(config, limit).await,
    }
}

/// 中断信号通道；收到 Ctrl-C 后置为 `true`。
fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Finishing current source...");
                tx.send_replace(true);
            }
            Err(e) => {
                // 发送端释放会被视为退出请求，监听失败时保持持有
                error!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

/// # Summary
/// 装配一个采集周期。
///
/// # Logic
/// 1. 空跑模式使用内存存储，否则使用 SQLite。
/// 2. 归一化器使用系统时钟与配置的采集时区。
/// 3. 数据源列表为空时只告警，周期照常运行。
fn build_cycle(
    config: &AppConfig,
    dry_run: bool,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<IngestCycle> {
    if config.sources.is_empty() {
        warn!("No sources configured; every cycle will insert nothing");
    }

    let feed = Arc::new(HttpJsonFeed::new()?);
    let store: Arc<dyn SignalStore> = if dry_run {
        warn!("Running in DRY RUN mode - signals are kept in memory only");
        Arc::new(MemorySignalStore::new())
    } else {
        Arc::new(SqliteSignalStore::new(&config.database.path)?)
    };
    let normalizer = Normalizer::new(Arc::new(RealTimeProvider), config.capture.utc_offset_secs);

    Ok(IngestCycle::new(config.sources.clone(), feed, store, normalizer).with_shutdown(shutdown))
}

async fn run(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    info!(
        "Signal pool starting with {} sources, interval {}s",
        config.sources.len(),
        config.scheduler.interval_secs
    );
    let shutdown = shutdown_channel();
    let cycle = build_cycle(&config, dry_run, shutdown.clone())?;

    let report = Scheduler::new(Arc::new(cycle), config.scheduler.interval())
        .run(shutdown)
        .await;

    info!(
        "Exiting after {} cycles, {} signals inserted",
        report.cycles, report.inserted
    );
    Ok(())
}

async fn once(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let cycle = build_cycle(&config, dry_run, shutdown_channel())?;
    let summary = cycle.run_once().await?;

    for failure in &summary.failures {
        warn!("{} ({}) failed: {}", failure.url, failure.tag, failure.error);
    }
    info!(
        "Cycle {} inserted {} signals, {} of {} sources failed",
        summary.cycle_id,
        summary.inserted,
        summary.failures.len(),
        summary.sources_polled
    );
    Ok(())
}

async fn recent(config: AppConfig, limit: u32) -> anyhow::Result<()> {
    let store = SqliteSignalStore::new(&config.database.path)?;
    let signals = store.recent(limit).await?;

    if signals.is_empty() {
        println!("No signals stored in {}", config.database.path);
        return Ok(());
    }

    println!(
        "{:<19}  {:<4}  {:<12}  {:<5}  {:>8}  {:<16}  {}",
        "captured_at", "pair", "coin", "grade", "profit%", "strategy", "exchange"
    );
    for s in signals {
        println!(
            "{:<19}  {:<4}  {:<12}  {:<5}  {:>8}  {:<16}  {}",
            format_capture_time(&s.captured_at),
            s.pair,
            s.coin.as_deref().unwrap_or("-"),
            s.grade.as_str(),
            s.profit_percent.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            s.strategy_name.as_deref().unwrap_or("-"),
            s.exchange.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
