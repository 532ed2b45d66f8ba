//! oraclerun Node

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oraclerun_adapters::{bridge_client, DisconnectedTxManager, ExecutionContext};
use oraclerun_node::{http, AppState, Config, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load config
    let config = Config::parse();
    let http_addr: SocketAddr = config.http_bind_addr.parse()?;

    let http_client = bridge_client(config.bridge_timeout())?;

    // No ethereum node is wired in yet; EthTx tasks wait for a connection.
    warn!("No ethereum client configured - ethtx tasks will stay pending_connection");
    let mut ctx = ExecutionContext::new(Arc::new(DisconnectedTxManager)).with_http_client(http_client);
    if let Some(url) = &config.bridge_response_url {
        ctx = ctx.with_bridge_response_url(url.clone());
    }

    // Create shared state
    let state = AppState::new(
        MemoryStore::new(),
        ctx,
        config.min_incoming_confirmations,
        config.resume_interval(),
    );

    let resumer_handle = state.resumer.clone().spawn();

    let http_router = http::create_router(state);
    let http_listener = TcpListener::bind(http_addr).await?;

    info!(
        http_addr = %http_addr,
        bridge_response_url = ?config.bridge_response_url,
        min_incoming_confirmations = config.min_incoming_confirmations,
        "Starting oraclerun node"
    );

    tokio::select! {
        result = axum::serve(http_listener, http_router) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    resumer_handle.abort();
    Ok(())
}
