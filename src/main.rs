//! CRM API gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http server ──▶ dispatcher ──▶ route table ──▶ middleware ──▶ handler
//!                (axum, TLS)     (prefix strip)  (first match)   (auth, rate)    (timeout)
//!     Client Response                                                              │
//!     ◀────────── JSON body ◀──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use crm_gateway::config::{load_config, GatewayConfig};
use crm_gateway::http::HttpServer;
use crm_gateway::lifecycle::{build_dispatcher, signals, Shutdown};
use crm_gateway::net::tls::load_tls_config;
use crm_gateway::observability::{logging, metrics};
use crm_gateway::routing::{HandlerRegistry, RouteTable};

#[derive(Parser)]
#[command(name = "crm-gateway")]
#[command(about = "HTTP routing and dispatch gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "crm-gateway starting");
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        handler_timeout_secs = config.timeouts.handler_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let dispatcher = build_dispatcher(Arc::clone(&config), RouteTable::new(), &HandlerRegistry::new())?;

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(Arc::clone(&shutdown));

    let server = HttpServer::new(Arc::clone(&config), dispatcher);
    match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            server.run_tls(tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
