//! Chess rules: pieces, board, attack detection, and the move-acceptance
//! state machine.

pub mod attacks;
pub mod board;
pub mod engine;
pub mod piece;
pub mod token;

pub use board::{Board, PlacementError};
pub use engine::{Acceptance, ChessError, MoveRejection, MoveResult, RuleEngine};
pub use piece::{Legality, Piece};
pub use token::{CastleSide, MoveToken};
