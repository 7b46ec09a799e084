// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configstate Discovery Daemon
//!
//! Watches one key in Consul KV or NATS KV and serves the decoded service
//! list over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Consul on the local agent
//! configstate-discover --key services
//!
//! # NATS KV bucket
//! configstate-discover --nats-url nats://127.0.0.1:4222 --bucket discovery --key services
//!
//! # Using configuration file
//! configstate-discover --config discover.toml
//! ```
//!
//! # Endpoints
//!
//! - `GET /services` - Discovered services
//! - `GET /config` - Loaded configuration
//! - `GET /health` - Health check

mod config;

use axum::{extract::State, response::Response, routing::get, Router};
use clap::{Parser, Subcommand};
use config::{AppConfig, BackendConfig};
use configstate::{
    respond, ConfigError, ConsulConfig, ConsulPoller, Discover, HttpKvClient, NatsConfig,
    NatsPoller, Poller,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Configstate service discovery daemon
#[derive(Parser, Debug)]
#[command(name = "configstate-discover")]
#[command(about = "Serve the live service list from Consul KV or NATS KV")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key holding the service list
    #[arg(short, long, conflicts_with = "config")]
    key: Option<String>,

    /// Consul HTTP API endpoint
    #[arg(long, conflicts_with_all = ["config", "nats_url"])]
    consul_addr: Option<String>,

    /// Consul long polling duration (seconds)
    #[arg(long, default_value = "60", conflicts_with_all = ["config", "nats_url"])]
    poll_interval: u64,

    /// NATS server url (selects the NATS backend)
    #[arg(long, conflicts_with = "config")]
    nats_url: Option<String>,

    /// NATS KV bucket
    #[arg(short, long, requires = "nats_url")]
    bucket: Option<String>,

    /// HTTP server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "discover.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Handle subcommands
    if let Some(cmd) = args.command {
        init_logging(args.log_level.as_deref().unwrap_or("info"));
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    // Build configuration
    let config = build_config(&args)?;
    init_logging(&config.log_level);

    info!("Configstate Discover v{}", env!("CARGO_PKG_VERSION"));
    info!(name = %config.name, backend = config.backend.kind(), "starting");

    match config.backend.clone() {
        BackendConfig::Consul(consul) => {
            let client = HttpKvClient::new(&consul)?;
            run(config, ConsulPoller::new(&consul, client)).await
        }
        BackendConfig::Nats(nats) => {
            // Setup failures are fatal
            let poller = NatsPoller::connect(&nats).await?;
            run(config, poller).await
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> Result<AppConfig, ConfigError> {
    let mut config = match args.config {
        // Load from file if specified
        Some(ref config_path) => AppConfig::from_file(config_path)?,
        None => AppConfig::new(backend_from_args(args)?),
    };

    // Command line overrides
    if let Some(ref level) = args.log_level {
        config.log_level = level.clone();
    }
    if let Some(port) = args.port {
        config.http_server.port = port;
    }
    if let Some(ref bind) = args.bind {
        config.http_server.bind = bind.clone();
    }

    config.validate()?;
    Ok(config)
}

fn backend_from_args(args: &Args) -> Result<BackendConfig, ConfigError> {
    let key = args
        .key
        .clone()
        .ok_or_else(|| ConfigError::Invalid("Missing --key (or use --config)".into()))?;

    if let Some(ref url) = args.nats_url {
        let bucket = args
            .bucket
            .clone()
            .ok_or_else(|| ConfigError::Invalid("Missing --bucket for --nats-url".into()))?;
        return Ok(BackendConfig::Nats(NatsConfig::new(url.clone(), bucket, key)));
    }

    let mut consul = ConsulConfig::new(key).with_poll_interval_secs(args.poll_interval);
    if let Some(ref addr) = args.consul_addr {
        consul = consul.with_addr(addr.clone());
    }
    Ok(BackendConfig::Consul(consul))
}

/// Run the worker and the HTTP server until Ctrl+C.
async fn run<P: Poller + 'static>(
    config: AppConfig,
    poller: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    let mut discover = Discover::new(poller);
    discover.start(cancel.clone(), &tracker)?;

    let addr = config.listen_addr();
    let app = build_router(&discover, config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server: http://{}", addr);

    tracker.spawn({
        let cancel = cancel.clone();
        async move {
            let shutdown = cancel.clone().cancelled_owned();
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "http server failed");
                cancel.cancel();
            }
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down...");
        }
        _ = cancel.cancelled() => {}
    }

    cancel.cancel();
    tracker.close();
    tracker.wait().await;

    info!("stopped");
    Ok(())
}

fn build_router<P: Poller + 'static>(discover: &Discover<P>, config: AppConfig) -> Router {
    let router = Router::new()
        .route("/config", get(show_config))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(Arc::new(config));

    discover
        .register(router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// GET /config
async fn show_config(State(config): State<Arc<AppConfig>>) -> Response {
    respond::objects(config.as_ref())
}

/// GET /health
async fn health() -> Response {
    respond::ok()
}

async fn not_found() -> Response {
    respond::not_found()
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&AppConfig::example())?;

    // Add comments
    let content = format!(
        r#"# Configstate Discover Configuration
# Generated by configstate-discover gen-config
#
# [backend] kind is "consul" (addr, key, poll_interval_secs)
# or "nats" (url, bucket, key, replay_current)

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match AppConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Name:    {}", config.name);
            println!("Listen:  {}", config.listen_addr());
            match config.backend {
                BackendConfig::Consul(consul) => println!(
                    "Backend: consul {} key={} poll={}s",
                    consul.addr, consul.key, consul.poll_interval_secs
                ),
                BackendConfig::Nats(nats) => println!(
                    "Backend: nats {} bucket={} key={}",
                    nats.url, nats.bucket, nats.key
                ),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
