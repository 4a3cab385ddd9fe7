//! Reclaim - Storage quota enforcement for recording directories

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use reclaim_core::logging::{init_logger, Component};
use reclaim_core::{
    usage, Config, ConfigOverrides, Evictor, FileConfigSource, LogNotifier, Scheduler,
};
use reclaim_store::{format_bytes, FsVideoStore};

#[derive(Parser)]
#[command(name = "reclaim")]
#[command(about = "Keep a recordings directory within its storage quota")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Clone)]
struct QuotaArgs {
    /// Recordings directory
    #[arg(short, long)]
    storage_path: Option<PathBuf>,

    /// Storage budget in GB (0 = unlimited)
    #[arg(short, long)]
    max_storage_gb: Option<u64>,
}

impl From<QuotaArgs> for ConfigOverrides {
    fn from(args: QuotaArgs) -> Self {
        Self {
            storage_path: args.storage_path,
            max_storage_gb: args.max_storage_gb,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sweep
    Sweep {
        #[command(flatten)]
        quota: QuotaArgs,
    },

    /// Sweep periodically until Ctrl+C
    Watch {
        #[command(flatten)]
        quota: QuotaArgs,

        /// Seconds between sweeps
        #[arg(long)]
        interval: Option<u64>,

        /// Cancel sweeps running longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show storage usage against the quota
    Status {
        #[command(flatten)]
        quota: QuotaArgs,
    },

    /// Exempt a recording from eviction
    Protect {
        /// Path to the video file
        video: PathBuf,
    },

    /// Make a recording evictable again
    Unprotect {
        /// Path to the video file
        video: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let component = match cli.command {
        Commands::Sweep { .. } => Component::Sweep,
        Commands::Watch { .. } => Component::Watch,
        _ => Component::Main,
    };
    init_logger(component, level)?;

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Sweep { quota } => {
            cmd_sweep(config_path, quota.into())?;
        }
        Commands::Watch { quota, interval, timeout } => {
            cmd_watch(config_path, quota.into(), interval, timeout)?;
        }
        Commands::Status { quota } => {
            cmd_status(config_path, quota.into())?;
        }
        Commands::Protect { video } => {
            cmd_protect(video, true)?;
        }
        Commands::Unprotect { video } => {
            cmd_protect(video, false)?;
        }
    }

    Ok(())
}

fn build_evictor(config_path: PathBuf, overrides: ConfigOverrides) -> Evictor {
    Evictor::new(
        Arc::new(FileConfigSource::new(config_path, overrides)),
        Arc::new(FsVideoStore::new()),
        Arc::new(LogNotifier),
    )
}

#[tokio::main]
async fn cmd_sweep(config_path: PathBuf, overrides: ConfigOverrides) -> Result<()> {
    info!("config: {:?}", config_path);

    let evictor = build_evictor(config_path, overrides);
    let report = evictor.sweep().await.context("sweep aborted")?;

    if report.unlimited {
        println!("storage is unlimited, nothing to do");
        return Ok(());
    }

    println!("listed: {}", report.listed);
    println!("protected: {}", report.protected);
    println!("evicted: {}", report.evicted.len());
    println!("corrupt removed: {}", report.corrupt_removed.len());
    println!("freed: {}", format_bytes(report.bytes_freed));

    if !report.failed.is_empty() {
        println!("failed to delete {} file(s):", report.failed.len());
        for name in &report.failed {
            println!("  {}", name);
        }
    }

    Ok(())
}

#[tokio::main]
async fn cmd_watch(
    config_path: PathBuf,
    overrides: ConfigOverrides,
    interval: Option<u64>,
    timeout: Option<u64>,
) -> Result<()> {
    let config = FileConfigSource::new(&config_path, overrides.clone())
        .load()
        .await
        .context("failed to load config")?;

    let interval = Duration::from_secs(interval.unwrap_or(config.sweep_interval_secs).max(1));
    let timeout = timeout.or(config.sweep_timeout_secs).map(Duration::from_secs);

    info!("starting reclaim watcher");
    info!("config: {:?}", config_path);
    info!("storage: {:?}", config.storage_path);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        warn!("received shutdown signal, cancelling the running sweep");
        signal.cancel();
    })?;

    let evictor = Arc::new(build_evictor(config_path, overrides));
    Scheduler::new(evictor, interval)
        .with_sweep_timeout(timeout)
        .run(shutdown)
        .await;

    info!("watcher stopped");
    Ok(())
}

#[tokio::main]
async fn cmd_status(config_path: PathBuf, overrides: ConfigOverrides) -> Result<()> {
    let quota = FileConfigSource::new(&config_path, overrides)
        .load()
        .await
        .and_then(|config| config.quota())
        .context("failed to load config")?;

    let report = usage(&FsVideoStore::new(), &quota)
        .await
        .with_context(|| format!("failed to read {:?}", quota.storage_root))?;

    println!("storage: {:?}", quota.storage_root);
    println!(
        "quota: {}",
        if quota.is_unlimited() {
            "unlimited".to_string()
        } else {
            format_bytes(quota.max_bytes)
        }
    );
    println!(
        "recordings: {} ({})",
        report.total_files,
        format_bytes(report.total_bytes)
    );
    println!(
        "protected: {} ({})",
        report.protected_files,
        format_bytes(report.protected_bytes)
    );
    println!(
        "unprotected: {} ({})",
        report.unprotected_files,
        format_bytes(report.unprotected_bytes)
    );

    if report.unreadable_files > 0 {
        println!(
            "unreadable metadata: {} ({}), removed on next sweep",
            report.unreadable_files,
            format_bytes(report.unreadable_bytes)
        );
    }

    if let Some(headroom) = report.headroom() {
        println!("headroom: {}", format_bytes(headroom));
        if report.over_quota_files > 0 {
            println!("over quota: {} recording(s) will be evicted", report.over_quota_files);
        }
    }

    Ok(())
}

#[tokio::main]
async fn cmd_protect(video: PathBuf, protected: bool) -> Result<()> {
    FsVideoStore::new()
        .set_protected(&video, protected)
        .await
        .with_context(|| format!("failed to update {:?}", video))?;

    println!(
        "{} {:?}",
        if protected { "protected" } else { "unprotected" },
        video
    );
    Ok(())
}
