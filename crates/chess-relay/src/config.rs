use std::net::SocketAddr;

use crate::error::ServerError;
use crate::protocol::Terminator;

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to accept players on. Default: 0.0.0.0:3000.
    pub listen_addr: SocketAddr,
    /// Maximum simultaneously open connections, waiting or playing. Default: 32.
    pub max_connections: usize,
    /// Longest accepted inbound frame in bytes, excluding the delimiter. Default: 64.
    pub max_frame_len: usize,
    /// Byte ending every outbound message. Default: newline.
    pub terminator: Terminator,
    /// Capacity of the queue feeding connection events to the dispatch loop. Default: 256.
    pub event_queue_capacity: usize,
    /// Messages that may wait unsent for one connection before it is dropped. Default: 64.
    pub outbox_capacity: usize,
}

impl ServerConfig {
    /// Validate configuration values.
    ///
    /// Checks:
    /// - `max_connections >= 2` (a game needs two players)
    /// - `max_frame_len >= 5` (`O-O-O` must fit)
    /// - `event_queue_capacity >= 1`
    /// - `outbox_capacity >= 2` (`setup` and `your turn` are queued together)
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections < 2 {
            return Err(ServerError::InvalidConfig {
                reason: format!("max_connections must be >= 2, got {}", self.max_connections),
            });
        }
        if self.max_frame_len < 5 {
            return Err(ServerError::InvalidConfig {
                reason: format!("max_frame_len must be >= 5, got {}", self.max_frame_len),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ServerError::InvalidConfig {
                reason: "event_queue_capacity must be >= 1".to_string(),
            });
        }
        if self.outbox_capacity < 2 {
            return Err(ServerError::InvalidConfig {
                reason: format!("outbox_capacity must be >= 2, got {}", self.outbox_capacity),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 32,
            max_frame_len: 64,
            terminator: Terminator::Newline,
            event_queue_capacity: 256,
            outbox_capacity: 64,
        }
    }
}
