//! upsync daemon - one-way upload of new local files
//!
//! This binary watches a local folder by polling it and uploads every file
//! that appears there to the configured remote (Google Drive or a Synology
//! NAS), optionally deleting the local copy once it is on the remote.
//!
//! # Startup
//!
//! Configuration is assembled from built-in defaults, the YAML file, the
//! environment and the command line, in that order. Configuration problems
//! and any failure to reach or set up the remote are reported as a single
//! error line and the process exits successfully without scanning. Errors
//! raised while the loop is running end the process with a failure status.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use upsync_core::config::{Config, ConfigError};
use upsync_sync::orchestrator::UploadOrchestrator;
use upsync_sync::retry::RetryPolicy;
use upsync_sync::scheduler::{SyncLoop, TickOutcome};

mod backend;

#[derive(Debug, Parser)]
#[command(name = "upsyncd", version, about = "Upload new local files to a remote drive")]
struct Cli {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between two scans of the local folder
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single scan and exit
    #[arg(long)]
    once: bool,

    /// Delete local files once they are on the remote
    #[arg(long)]
    clear_downloads: bool,
}

// ============================================================================
// Configuration
// ============================================================================

/// Assembles the configuration: defaults < YAML < environment < CLI
fn build_config<F>(cli: &Cli, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            }
        }
    };

    config.apply_env(env)?;

    if let Some(interval) = cli.interval {
        config.sync.poll_interval = interval;
    }
    if cli.clear_downloads {
        config.sync.clear_downloads = true;
    }

    config.ensure_valid()?;
    Ok(config)
}

/// Installs the fmt subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// SIGINT and SIGTERM listeners
///
/// Both are registered when the value is built, so a signal arriving before
/// anything awaits [`ShutdownSignals::wait`] is still seen.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Resolves with the name of the first signal received
    #[cfg(unix)]
    async fn wait(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(windows)]
    async fn wait(mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl+C"
    }
}

/// Waits for a shutdown signal and triggers the cancellation token
async fn shutdown_signal(signals: ShutdownSignals, token: CancellationToken) {
    let signal = signals.wait().await;
    info!(signal, "Received shutdown signal");
    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli, |var| std::env::var(var).ok());

    let level = config
        .as_ref()
        .map_or("info", |c| c.logging.level.as_str())
        .to_string();
    init_tracing(&level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Ok(());
        }
    };

    info!(
        backend = %config.remote.drive_type,
        local = %config.sync.local_folder.display(),
        remote = %config.remote.folder,
        clear_downloads = config.sync.clear_downloads,
        "upsync daemon starting (upsyncd)"
    );

    let store = match backend::connect(&config).await {
        Ok(store) => store,
        Err(e) if backend::is_fatal_setup(&e) => {
            error!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let orchestrator = UploadOrchestrator::new(store, &config.sync.local_folder)
        .with_clear_downloads(config.sync.clear_downloads)
        .with_list_retry(RetryPolicy::with_retries(config.remote.list_retries));

    let mut sync_loop = SyncLoop::new(orchestrator, &config.sync.local_folder)
        .with_interval(Duration::from_secs(config.sync.poll_interval));

    if cli.once {
        return match sync_loop.tick().await {
            Ok(TickOutcome::Idle) => {
                info!("No new files");
                Ok(())
            }
            Ok(TickOutcome::Processed(report)) => {
                info!(
                    uploaded = report.uploaded.len(),
                    already_remote = report.already_remote.len(),
                    deleted = report.deleted.len(),
                    "Single scan finished"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Scan failed");
                Err(e.into())
            }
        };
    }

    let signals = ShutdownSignals::install().context("Failed to install signal handlers")?;
    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(signals, shutdown_token.clone()));

    let result = sync_loop.run(shutdown_token).await;

    match &result {
        Ok(()) => info!("upsync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "upsync daemon exiting with error"),
    }

    result.map_err(Into::into)
}

// ============================================================================
// Tests
// ============================================================================
