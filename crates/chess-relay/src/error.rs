use std::net::SocketAddr;

/// Errors that can stop the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("metrics registration failed")]
    Metrics(#[from] prometheus::Error),
}
