//! # moe-build
//!
//! Command-line driver of the asset pipeline.
//!
//! ```text
//! moe-build [--watch] [--analyze] [--config <PATH>]
//! ```
//!
//! Settings come from `assets.toml` (or the file named by `--config` /
//! `MOE_CONFIG`) overlaid with `MOE__*` environment variables. A one-shot
//! build that fails exits with status 1; in watch mode failures are logged
//! and the watcher keeps going until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use moe_assets::{BuildConfig, BuildFlags, Pipeline};
use moe_domain::config::BuildSettings;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

/// Builds the front-end assets.
#[derive(Debug, Clone, Parser)]
#[command(name = "moe-build", version, about)]
pub struct Cli {
    /// Rebuild whenever an entry file changes.
    #[arg(long)]
    pub watch: bool,

    /// Log a bundle composition report after each successful build.
    #[arg(long)]
    pub analyze: bool,

    /// Settings file; the extension may be omitted.
    #[arg(long, short, env = "MOE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub const fn flags(&self) -> BuildFlags {
        BuildFlags { watch: self.watch, analyze: self.analyze }
    }
}

/// Runs one build, or watches until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if the settings are unusable or, outside watch mode, if
/// the build fails.
pub async fn run(cli: &Cli, settings: &BuildSettings) -> Result<()> {
    let config = BuildConfig::from_settings(settings, cli.flags())
        .context("Critical: Build settings are invalid")?;
    info!(entries = config.entries.len(), out_dir = %config.out_dir.display(), "Starting build");

    let pipeline = Pipeline::new(config);
    if cli.watch {
        pipeline.watch(shutdown_signal()).await.context("Watch failed")?;
        return Ok(());
    }

    pipeline.run_once().await.context("Build failed")?;
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
