//! Two-player chess relay.
//!
//! Clients connect over TCP, are paired first-come first-served, and exchange
//! move tokens through the server, which validates every move against the
//! rules before echoing it to both players.
//!
//! ```
//! use chess_relay::chess::{Acceptance, MoveRejection, RuleEngine};
//! use chess_relay::types::Color;
//!
//! let mut engine = RuleEngine::new();
//! assert_eq!(engine.submit_move("e2e4"), Ok(Acceptance::Accepted));
//! assert_eq!(engine.turn(), Color::Black);
//! assert_eq!(engine.submit_move("e2e4"), Err(MoveRejection::NoSuchPiece));
//! ```

pub mod chess;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod session;
pub mod types;
