//! Chess Relay - two-player chess over TCP
//!
//! Run with: `cargo run --package chess-relay -- --listen 0.0.0.0:3000`

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chess_relay::config::ServerConfig;
use chess_relay::metrics::ServerMetrics;
use chess_relay::protocol::Terminator;
use chess_relay::server::Server;

#[derive(Parser, Debug)]
#[command(name = "chess-relay")]
#[command(about = "Pairs TCP clients into chess games and relays validated moves")]
struct Args {
    /// Address to accept players on.
    #[arg(long, env = "CHESS_RELAY_LISTEN", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Maximum simultaneously open connections.
    #[arg(long, env = "CHESS_RELAY_MAX_CONNECTIONS", default_value_t = 32)]
    max_connections: usize,

    /// Longest accepted inbound frame in bytes.
    #[arg(long, env = "CHESS_RELAY_MAX_FRAME_LEN", default_value_t = 64)]
    max_frame_len: usize,

    /// Byte appended to every outbound message.
    #[arg(long, env = "CHESS_RELAY_TERMINATOR", value_enum, default_value_t = Terminator::Newline)]
    terminator: Terminator,

    /// Unsent messages allowed per connection before it is dropped.
    #[arg(long, env = "CHESS_RELAY_OUTBOX_CAPACITY", default_value_t = 64)]
    outbox_capacity: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("chess_relay=info".parse()?))
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        listen_addr: args.listen,
        max_connections: args.max_connections,
        max_frame_len: args.max_frame_len,
        terminator: args.terminator,
        outbox_capacity: args.outbox_capacity,
        ..ServerConfig::default()
    };

    let registry = Registry::new();
    let metrics = ServerMetrics::new(&registry)?;
    let server = Server::bind(config, metrics).await?;
    tracing::info!(addr = %server.local_addr()?, "chess relay listening");

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    tracing::info!(metrics = %String::from_utf8_lossy(&buf), "chess relay shutdown");
    Ok(())
}
