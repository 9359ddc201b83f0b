//! Querygate Server Binary
//!
//! Starts the SQL query gateway HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! # Start server with querygate.toml / environment settings
//! cargo run --bin querygate-server
//!
//! # Explicit config file and bind address
//! cargo run --bin querygate-server -- --config /etc/querygate.toml --host 0.0.0.0 --port 8000
//! ```
//!
//! ## Logging
//!
//! `QUERYGATE_LOG` takes an `EnvFilter` directive and overrides
//! `logging.level`. `logging.format = "json"` switches to JSON lines.

use querygate::config::LoggingConfig;
use querygate::protocol::rest;
use querygate::{Config, Gateway};

use std::env;
use std::sync::Arc;
use std::sync::OnceLock;

use clap::Parser;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "querygate-server", version, about = "HTTP gateway for SQL queries")]
struct Args {
    /// Configuration file (defaults to querygate.toml + querygate.local.toml)
    #[arg(long)]
    config: Option<String>,

    /// Bind address, overrides http.host
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides http.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // An explicit --config must load; the implicit search may fall back
    let (mut config, load_error) = match &args.config {
        Some(path) => (Config::from_file(path)?, None),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    init_tracing(&config.logging);

    if let Some(e) = load_error {
        tracing::warn!(error = %e, "config_defaulted");
    }

    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let gateway = Arc::new(Gateway::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "gateway_init_failed");
        Box::<dyn std::error::Error + Send + Sync>::from(e)
    })?);

    tracing::info!(version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        cache = ?config.cache.backend,
        host = %config.http.host,
        port = config.http.port, "gateway_started");

    rest::start_http_server(gateway, &config.http).await?;

    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    // QUERYGATE_LOG takes precedence over the config file level
    let level = env::var("QUERYGATE_LOG")
        .ok()
        .unwrap_or_else(|| logging_config.level.clone());
    let json = logging_config.format == "json";

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = TRACE_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_new(&level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let base = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(non_blocking)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base.json().finish())
    } else {
        Box::new(base.compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
