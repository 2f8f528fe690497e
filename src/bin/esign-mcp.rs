//! CLI binary for esign-mcp.
//!
//! Maps flags and environment variables to `EsignConfig`, sets up logging
//! away from stdout, and serves MCP over stdio.

use anyhow::{Context, Result};
use clap::Parser;
use esign_mcp::{run_stdio, EsignConfig, ToolRouter};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// MCP server for creating and tracking e-sign signature flows.
#[derive(Parser, Debug)]
#[command(
    name = "esign-mcp",
    version,
    about = "MCP server for creating and tracking e-sign signature flows",
    long_about = "Serves the create_sign_flow and query_sign_flow tools over MCP stdio. \
Documents are uploaded to the e-sign Open API v3, converted to PDF when needed, and sent \
to the signer with an SMS notification.",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Open API base URL (sandbox: https://smlopenapi.esign.cn).
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Application id issued by the e-sign open platform.
    #[arg(long, env = "APP_ID")]
    app_id: Option<String>,

    /// Application secret issued by the e-sign open platform.
    #[arg(long, env = "APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,

    /// Maximum file status checks before giving up.
    #[arg(long, env = "ESIGN_MCP_POLL_ATTEMPTS", default_value_t = 30,
          value_parser = clap::value_parser!(u32).range(1..))]
    poll_attempts: u32,

    /// Delay between file status checks, in milliseconds.
    #[arg(long, env = "ESIGN_MCP_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// HTTP download timeout for remote files, in seconds.
    #[arg(long, env = "ESIGN_MCP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Append diagnostic logs to this file instead of stderr.
    #[arg(long, env = "ESIGN_MCP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ESIGN_MCP_VERBOSE")]
    verbose: bool,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout belongs to the protocol.
    match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // ── Configuration ────────────────────────────────────────────────────
    let mut builder = EsignConfig::builder()
        .poll_max_attempts(cli.poll_attempts)
        .poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .download_timeout_secs(cli.download_timeout);
    if let Some(host) = cli.host {
        builder = builder.host(host);
    }
    if let Some(app_id) = cli.app_id {
        builder = builder.app_id(app_id);
    }
    if let Some(secret) = cli.app_secret {
        builder = builder.app_secret(secret);
    }

    // Missing credentials are reported per tool call, not at startup.
    let router = ToolRouter::from_config(builder.build()).context("Failed to start service")?;
    if router.is_configured() {
        info!("esign-mcp {} ready", env!("CARGO_PKG_VERSION"));
    }

    run_stdio(router).await.context("stdio transport failed")?;
    info!("esign-mcp shutting down");
    Ok(())
}
