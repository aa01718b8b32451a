mod analysis;
mod config;
mod documents;
mod error;
mod model;
mod rate_limit;
mod report;
mod rulebook;
mod rules;
mod server;
mod session;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use knot_common::gemini::{GeminiClient, GeminiClientConfig};

use analysis::GeminiAnalyzer;
use config::Config;
use rate_limit::RateLimiter;
use server::AuditorServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting knot-auditor MCP server");

    let config = Config::from_env()?;
    let gemini_config = GeminiClientConfig::from_env()?;
    info!(
        model = %config.model,
        temperature = config.temperature,
        base_url = %gemini_config.base_url,
        timeout_ms = gemini_config.default_timeout.as_millis(),
        max_retries = gemini_config.max_retries,
        "configuration loaded"
    );

    let client = Arc::new(GeminiClient::new(gemini_config)?);
    let analyzer = Arc::new(GeminiAnalyzer::new(
        client,
        config.model.clone(),
        config.temperature,
    ));

    let limiter = RateLimiter::from_env();
    match &limiter {
        Some(l) => info!(per_minute = l.per_minute(), "analysis rate limit enabled"),
        None => info!("analysis rate limit disabled"),
    }

    let server = AuditorServer::new(analyzer, limiter);

    if let Some(addr) = config.tcp_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            tokio::spawn(serve_connection(server.clone(), stream, peer));
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}

/// Serve one TCP client until it disconnects. Failures end only this connection.
async fn serve_connection(server: AuditorServer, stream: TcpStream, peer: SocketAddr) {
    info!(peer = %peer, "MCP client connected");
    match serve_session(server, stream).await {
        Ok(()) => info!(peer = %peer, "MCP client disconnected"),
        Err(e) => error!(peer = %peer, error = %e, "MCP connection failed"),
    }
}

async fn serve_session(server: AuditorServer, stream: TcpStream) -> anyhow::Result<()> {
    let service = server.serve(stream).await?;
    service.waiting().await?;
    Ok(())
}
