//! CLI for popsub-notify
//!
//! Loads configuration (refusing to start on invalid settings), connects to
//! the broker in the background and serves the HTTP endpoint until Ctrl-C or
//! SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use popsub_notify::broker::{Publisher, mqtt};
use popsub_notify::config::{self, LogFormat, Settings};
use popsub_notify::ratelimit::{EvictionSweeper, WindowRateLimiter};
use popsub_notify::transport::{AppState, http};
use popsub_notify::utils::{Result, logging};
use tracing::{error, info, warn};

/// Publish HTTP notifications onto an MQTT topic
#[derive(Parser, Debug)]
#[command(name = "popsub-notify")]
#[command(version)]
struct Args {
    /// Configuration file path (defaults to config/default.*, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let settings = match config::load_config_from(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(args.log_level.as_deref().unwrap_or("info"), LogFormat::Text);
            error!("Refusing to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        settings.logging.format
    };
    logging::init(
        args.log_level.as_deref().unwrap_or(&settings.logging.level),
        format,
    );

    match run_server(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    let (sink, eventloop) = mqtt::connect(&settings.broker)?;
    let publisher = Arc::new(Publisher::new(&settings.broker.topic, Arc::new(sink)));
    let limiter = Arc::new(WindowRateLimiter::new(&settings.rate_limit)?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        topic = publisher.topic(),
        window_ms = settings.rate_limit.window_ms,
        max_requests = limiter.max_requests(),
        policy = ?limiter.policy(),
        "Starting popsub-notify"
    );

    let listener = http::bind(&settings.server).await?;

    let connection = tokio::spawn(mqtt::run_connection_loop(
        eventloop,
        Arc::clone(&publisher),
        Duration::from_millis(settings.broker.reconnect_period_ms),
    ));

    let mut sweeper = EvictionSweeper::new(Arc::clone(&limiter), settings.rate_limit.sweep_interval_ms);
    sweeper.start();

    let state = AppState {
        publisher: Arc::clone(&publisher),
        limiter,
        trust_forwarded_headers: settings.server.trust_forwarded_headers,
    };

    let result = http::serve(listener, state, http::shutdown_signal()).await;

    sweeper.stop();
    connection.abort();

    let undelivered = publisher.pending_len();
    if undelivered > 0 {
        warn!(undelivered, "exiting with queued messages that were never sent");
    }

    result
}
