//! Shared value types.

pub mod chess;
pub mod ids;

pub use chess::{Color, Coord, ParseCoordError, PieceKind};
pub use ids::{ConnectionId, GameId};
