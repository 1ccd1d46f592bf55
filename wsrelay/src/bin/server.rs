//! Relay server binary.
//!
//! Run with: `cargo run --bin wsrelay-server -- --bind 0.0.0.0:3030`

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wsrelay_server::ServerBuilder;
use wsrelay_transport::TransportKind;

/// Message relay server.
#[derive(Parser, Debug)]
#[command(name = "wsrelay-server", version, about = "Message relay server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "WSRELAY_BIND", default_value = "0.0.0.0:3030")]
    bind: SocketAddr,

    /// Wire transport: "ws" or "tcp".
    #[arg(long, env = "WSRELAY_TRANSPORT", default_value = "ws")]
    transport: TransportKind,

    /// WebSocket upgrade path.
    #[arg(long, env = "WSRELAY_PATH", default_value = "/ws")]
    path: String,

    /// Maximum concurrent connections.
    #[arg(long, env = "WSRELAY_MAX_CONNECTIONS", default_value_t = 1000)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let transport = match cli.transport {
        TransportKind::WebSocket { .. } => TransportKind::WebSocket { path: cli.path },
        other => other,
    };

    let (mut server, handle) = ServerBuilder::new()
        .bind(cli.bind)
        .transport(transport)
        .max_connections(cli.max_connections)
        .build();

    let handle = Arc::new(handle);
    let shutdown_handle = Arc::clone(&handle);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down server");
        shutdown_handle.shutdown();
    });

    server
        .run()
        .await
        .with_context(|| format!("server on {} failed", cli.bind))?;

    tracing::info!("Server stopped");
    Ok(())
}
