//! Rule engine: turn state, check detection, castling, en passant, promotion.
//!
//! [`RuleEngine::submit_move`] is the only mutating entry point. A rejected
//! move never changes the board or the engine state.

use thiserror::Error;

use super::attacks;
use super::board::{Board, PlacementError};
use super::piece::{Legality, Piece};
use super::token::{CastleSide, MoveToken};
use crate::types::{Color, Coord, PieceKind};

/// Errors building an engine from a custom position.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChessError {
    #[error("no {0} king on the board")]
    MissingKing(Color),

    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// A move the engine took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Applied; the turn passed to the other side.
    Accepted,
    /// A pawn reached its last rank. The same side must now send `=<letter>`.
    PromotionPending,
}

/// Why a move was refused. The display text is what the mover is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("invalid format")]
    InvalidFormat,
    #[error("idle move")]
    IdleMove,
    #[error("no such piece")]
    NoSuchPiece,
    #[error("not your turn")]
    NotInTurn,
    #[error("square occupied")]
    SquareOccupied,
    #[error("check")]
    Check,
    #[error("invalid move")]
    InvalidMove,
}

pub type MoveResult = Result<Acceptance, MoveRejection>;

/// Game state for one chess game.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    board: Board,
    turn: Color,
    /// Square of the pawn that may be taken en passant on this ply.
    en_passant: Option<Coord>,
    /// Square of the pawn waiting for its promotion choice.
    pending_promotion: Option<Coord>,
    /// King squares, indexed by [`Color::index`].
    kings: [Coord; 2],
}

impl RuleEngine {
    /// A new game from the standard starting position, White to move.
    #[must_use]
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            turn: Color::White,
            en_passant: None,
            pending_promotion: None,
            kings: [Coord::new(7, 4), Coord::new(0, 4)],
        }
    }

    /// A game from an arbitrary position with `turn` to move.
    pub fn from_board(board: Board, turn: Color) -> Result<Self, ChessError> {
        let white = board
            .find_king(Color::White)
            .ok_or(ChessError::MissingKing(Color::White))?;
        let black = board
            .find_king(Color::Black)
            .ok_or(ChessError::MissingKing(Color::Black))?;
        Ok(Self {
            board,
            turn,
            en_passant: None,
            pending_promotion: None,
            kings: [white, black],
        })
    }

    /// Shorthand for [`RuleEngine::from_board`] over a FEN placement field.
    pub fn from_placement(placement: &str, turn: Color) -> Result<Self, ChessError> {
        Self::from_board(Board::from_placement(placement)?, turn)
    }

    /// Side to move.
    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn king(&self, color: Color) -> Coord {
        self.kings[color.index()]
    }

    #[must_use]
    pub fn pending_promotion(&self) -> Option<Coord> {
        self.pending_promotion
    }

    /// Square of the pawn currently capturable en passant.
    #[must_use]
    pub fn en_passant(&self) -> Option<Coord> {
        self.en_passant
    }

    /// Whether `square` would be captured by a piece not of `defender`'s color.
    #[must_use]
    pub fn is_attacked(&self, square: Coord, defender: Color) -> bool {
        attacks::is_attacked(&self.board, square, defender)
    }

    /// Parse and evaluate one client token.
    pub fn submit_move(&mut self, token: &str) -> MoveResult {
        let token: MoveToken = token.parse()?;
        self.apply(token)
    }

    /// Evaluate an already parsed token.
    pub fn apply(&mut self, token: MoveToken) -> MoveResult {
        match token {
            MoveToken::Step { from, to } => self.step(from, to),
            MoveToken::Castle(side) => self.castle(side),
            MoveToken::Promote(letter) => self.promote(letter),
        }
    }

    fn step(&mut self, from: Coord, to: Coord) -> MoveResult {
        if self.pending_promotion.is_some() {
            return Err(MoveRejection::InvalidMove);
        }
        if from == to {
            return Err(MoveRejection::IdleMove);
        }
        let piece = *self.board.get(from).ok_or(MoveRejection::NoSuchPiece)?;
        if piece.color() != self.turn {
            return Err(MoveRejection::NotInTurn);
        }
        if self
            .board
            .get(to)
            .is_some_and(|occupant| occupant.color() == piece.color())
        {
            return Err(MoveRejection::SquareOccupied);
        }

        let legality = piece.legality(to, &self.board);
        if self.exposes_king(&piece, to, legality) {
            return Err(MoveRejection::Check);
        }

        match legality {
            Legality::Rejected => Err(MoveRejection::InvalidMove),
            Legality::Simple => {
                self.relocate(from, to);
                self.switch_turn();
                Ok(Acceptance::Accepted)
            }
            Legality::DoublePawnPush => {
                self.relocate(from, to);
                self.switch_turn();
                if let Some(pawn) = self.board.get_mut(to) {
                    pawn.set_en_passant(true);
                }
                self.en_passant = Some(to);
                Ok(Acceptance::Accepted)
            }
            Legality::EnPassantCapture => {
                self.board.take(Coord::new(from.row, to.col));
                self.en_passant = None;
                self.relocate(from, to);
                self.switch_turn();
                Ok(Acceptance::Accepted)
            }
            Legality::PromotionTrigger => {
                self.relocate(from, to);
                self.pending_promotion = Some(to);
                Ok(Acceptance::PromotionPending)
            }
        }
    }

    /// Play `piece` to `to` on a scratch copy of the board and report whether
    /// the mover's king is then attacked.
    fn exposes_king(&self, piece: &Piece, to: Coord, legality: Legality) -> bool {
        let from = piece.position();
        let mut scratch = self.board.clone();
        if legality == Legality::EnPassantCapture {
            scratch.take(Coord::new(from.row, to.col));
        }
        scratch.relocate(from, to);
        let king = if piece.kind() == PieceKind::King {
            to
        } else {
            self.king(self.turn)
        };
        attacks::is_attacked(&scratch, king, self.turn)
    }

    fn castle(&mut self, side: CastleSide) -> MoveResult {
        if self.pending_promotion.is_some() {
            return Err(MoveRejection::InvalidMove);
        }
        let row = self.turn.home_row();
        let (rook_col, king_to_col, rook_to_col) = match side {
            CastleSide::Kingside => (7, 6, 5),
            CastleSide::Queenside => (0, 2, 3),
        };
        let king_from = Coord::new(row, 4);
        let rook_from = Coord::new(row, rook_col);
        let king_to = Coord::new(row, king_to_col);
        let rook_to = Coord::new(row, rook_to_col);

        let own = |at: Coord, kind: PieceKind| {
            self.board
                .get(at)
                .filter(|p| p.kind() == kind && p.color() == self.turn)
                .copied()
                .ok_or(MoveRejection::NoSuchPiece)
        };
        let king = own(king_from, PieceKind::King)?;
        let rook = own(rook_from, PieceKind::Rook)?;

        if king.has_moved() || rook.has_moved() {
            return Err(MoveRejection::InvalidMove);
        }
        if !rook.legality(king_from, &self.board).is_legal() {
            return Err(MoveRejection::SquareOccupied);
        }

        let step = (king_to - king_from).signum();
        let mut square = king_from;
        loop {
            if self.is_attacked(square, self.turn) {
                return Err(MoveRejection::Check);
            }
            if square == king_to {
                break;
            }
            square += step;
        }

        self.relocate(king_from, king_to);
        self.relocate(rook_from, rook_to);
        self.switch_turn();
        Ok(Acceptance::Accepted)
    }

    fn promote(&mut self, letter: char) -> MoveResult {
        let at = self.pending_promotion.ok_or(MoveRejection::InvalidMove)?;
        let kind = PieceKind::promotion_choice(letter).ok_or(MoveRejection::InvalidFormat)?;
        self.board.put(at, Piece::new(kind, self.turn).moved());
        self.pending_promotion = None;
        self.switch_turn();
        Ok(Acceptance::Accepted)
    }

    /// Move a piece for real, dropping any captured piece and tracking kings.
    fn relocate(&mut self, from: Coord, to: Coord) {
        self.board.move_piece(from, to);
        if let Some(piece) = self.board.get(to) {
            if piece.kind() == PieceKind::King {
                self.kings[piece.color().index()] = to;
            }
        }
    }

    /// Clear en passant eligibility and pass the move to the other side.
    fn switch_turn(&mut self) {
        if let Some(square) = self.en_passant.take() {
            if let Some(pawn) = self.board.get_mut(square) {
                pawn.set_en_passant(false);
            }
        }
        self.turn = self.turn.opposite();
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Coord {
        name.parse().unwrap()
    }

    fn play(engine: &mut RuleEngine, moves: &[&str]) {
        for m in moves {
            assert_eq!(engine.submit_move(m), Ok(Acceptance::Accepted), "{m}");
        }
    }

    #[test]
    fn opening_move_switches_turn() {
        let mut engine = RuleEngine::new();
        assert_eq!(engine.submit_move("e2e4"), Ok(Acceptance::Accepted));
        assert_eq!(engine.turn(), Color::Black);
        assert_eq!(engine.en_passant(), Some(sq("e4")));
        assert!(engine.board().get(sq("e4")).unwrap().en_passant_eligible());
    }

    #[test]
    fn rejections_in_order() {
        let mut engine = RuleEngine::new();
        assert_eq!(engine.submit_move("e2e2"), Err(MoveRejection::IdleMove));
        assert_eq!(engine.submit_move("e4e5"), Err(MoveRejection::NoSuchPiece));
        assert_eq!(engine.submit_move("e7e5"), Err(MoveRejection::NotInTurn));
        assert_eq!(engine.submit_move("a1a2"), Err(MoveRejection::SquareOccupied));
        assert_eq!(engine.submit_move("a1a5"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("e2e5"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("hello"), Err(MoveRejection::InvalidFormat));
        assert_eq!(engine.turn(), Color::White);
        assert_eq!(engine.board(), &Board::standard());
    }

    #[test]
    fn capture_removes_piece() {
        let mut engine = RuleEngine::new();
        play(&mut engine, &["e2e4", "d7d5", "e4d5"]);
        assert_eq!(engine.board().pieces().count(), 31);
        let pawn = engine.board().get(sq("d5")).unwrap();
        assert_eq!(pawn.color(), Color::White);
    }

    #[test]
    fn en_passant_capture_removes_passed_pawn() {
        let mut engine = RuleEngine::new();
        play(&mut engine, &["e2e4", "a7a6", "e4e5", "d7d5", "e5d6"]);
        assert!(engine.board().get(sq("d5")).is_none());
        assert_eq!(engine.board().get(sq("d6")).unwrap().kind(), PieceKind::Pawn);
        assert_eq!(engine.board().pieces().count(), 31);
        assert_eq!(engine.en_passant(), None);
    }

    #[test]
    fn en_passant_expires_after_one_ply() {
        let mut engine = RuleEngine::new();
        play(&mut engine, &["e2e4", "a7a6", "e4e5", "d7d5", "h2h3", "a6a5"]);
        assert!(!engine.board().get(sq("d5")).unwrap().en_passant_eligible());
        assert_eq!(engine.submit_move("e5d6"), Err(MoveRejection::InvalidMove));
    }

    #[test]
    fn pinned_piece_cannot_move() {
        let mut engine = RuleEngine::from_placement("k3r3/8/8/8/8/8/4B3/4K3", Color::White).unwrap();
        let before = engine.board().clone();
        assert_eq!(engine.submit_move("e2d3"), Err(MoveRejection::Check));
        assert_eq!(engine.board(), &before);
        assert_eq!(engine.turn(), Color::White);
    }

    #[test]
    fn king_cannot_step_into_attack() {
        let mut engine = RuleEngine::from_placement("k4r2/8/8/8/8/8/8/4K3", Color::White).unwrap();
        assert_eq!(engine.submit_move("e1f1"), Err(MoveRejection::Check));
        assert_eq!(engine.submit_move("e1d2"), Ok(Acceptance::Accepted));
        assert_eq!(engine.king(Color::White), sq("d2"));
    }

    #[test]
    fn must_answer_check() {
        let mut engine = RuleEngine::from_placement("k3r3/8/8/8/8/8/P7/4K3", Color::White).unwrap();
        assert_eq!(engine.submit_move("a2a3"), Err(MoveRejection::Check));
        assert_eq!(engine.submit_move("e1d1"), Ok(Acceptance::Accepted));
    }

    #[test]
    fn en_passant_exposing_king_is_check() {
        // Taking d5 en passant would open the fifth rank to the rook.
        let mut engine =
            RuleEngine::from_placement("7k/3p4/8/K3P2r/8/8/8/8", Color::Black).unwrap();
        play(&mut engine, &["d7d5"]);
        assert_eq!(engine.submit_move("e5d6"), Err(MoveRejection::Check));
        assert_eq!(engine.board().get(sq("d5")).unwrap().kind(), PieceKind::Pawn);
    }

    #[test]
    fn castling_both_sides() {
        let mut engine = RuleEngine::from_placement("r3k2r/8/8/8/8/8/8/R3K2R", Color::White).unwrap();
        assert_eq!(engine.submit_move("O-O"), Ok(Acceptance::Accepted));
        assert_eq!(engine.board().get(sq("g1")).unwrap().kind(), PieceKind::King);
        assert_eq!(engine.board().get(sq("f1")).unwrap().kind(), PieceKind::Rook);
        assert_eq!(engine.king(Color::White), sq("g1"));
        assert_eq!(engine.turn(), Color::Black);

        assert_eq!(engine.submit_move("O-O-O"), Ok(Acceptance::Accepted));
        assert_eq!(engine.board().get(sq("c8")).unwrap().kind(), PieceKind::King);
        assert_eq!(engine.board().get(sq("d8")).unwrap().kind(), PieceKind::Rook);
        assert!(engine.board().get(sq("a8")).is_none());
        assert_eq!(engine.king(Color::Black), sq("c8"));
    }

    #[test]
    fn castling_preconditions() {
        let mut engine = RuleEngine::new();
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::SquareOccupied));

        let mut engine = RuleEngine::from_placement("4k3/8/8/8/8/8/8/4K3", Color::White).unwrap();
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::NoSuchPiece));

        let mut engine = RuleEngine::from_placement("4k3/8/8/8/8/8/8/4K2r", Color::White).unwrap();
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::NoSuchPiece));

        let mut engine = RuleEngine::from_placement("4k3/8/8/8/8/8/8/R3K2R", Color::White).unwrap();
        play(&mut engine, &["h1h2", "e8d8", "h2h1", "d8e8"]);
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("O-O-O"), Ok(Acceptance::Accepted));
    }

    #[test]
    fn castling_through_attack_is_check() {
        // Bishop on c4 covers f1 while e1 itself is safe.
        let mut engine = RuleEngine::from_placement("4k3/8/8/8/2b5/8/8/4K2R", Color::White).unwrap();
        assert!(!engine.is_attacked(sq("e1"), Color::White));
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::Check));
        assert_eq!(engine.king(Color::White), sq("e1"));
        assert!(!engine.board().get(sq("h1")).unwrap().has_moved());

        // Knight on h3 covers only the destination.
        let mut engine = RuleEngine::from_placement("4k3/8/8/8/8/7n/8/4K2R", Color::White).unwrap();
        assert!(!engine.is_attacked(sq("f1"), Color::White));
        assert!(engine.is_attacked(sq("g1"), Color::White));
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::Check));

        // Start square attacked.
        let mut engine = RuleEngine::from_placement("4r1k1/8/8/8/8/8/8/4K2R", Color::White).unwrap();
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::Check));
    }

    #[test]
    fn promotion_flow() {
        let mut engine = RuleEngine::from_placement("k7/4P3/8/8/8/8/8/4K3", Color::White).unwrap();
        assert_eq!(engine.submit_move("=Q"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("e7e8"), Ok(Acceptance::PromotionPending));
        assert_eq!(engine.turn(), Color::White);
        assert_eq!(engine.pending_promotion(), Some(sq("e8")));

        assert_eq!(engine.submit_move("e1e2"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("O-O"), Err(MoveRejection::InvalidMove));
        assert_eq!(engine.submit_move("=K"), Err(MoveRejection::InvalidFormat));
        assert_eq!(engine.submit_move("=P"), Err(MoveRejection::InvalidFormat));

        assert_eq!(engine.submit_move("=Q"), Ok(Acceptance::Accepted));
        let queen = engine.board().get(sq("e8")).unwrap();
        assert_eq!(queen.kind(), PieceKind::Queen);
        assert_eq!(queen.color(), Color::White);
        assert_eq!(queen.position(), sq("e8"));
        assert_eq!(engine.pending_promotion(), None);
        assert_eq!(engine.turn(), Color::Black);
    }

    #[test]
    fn capture_promotion_to_knight() {
        let mut engine = RuleEngine::from_placement("k2r4/4P3/8/8/8/8/8/4K3", Color::White).unwrap();
        assert_eq!(engine.submit_move("e7d8"), Ok(Acceptance::PromotionPending));
        assert_eq!(engine.submit_move("=N"), Ok(Acceptance::Accepted));
        assert_eq!(engine.board().get(sq("d8")).unwrap().kind(), PieceKind::Knight);
        assert_eq!(engine.board().pieces().count(), 3);
    }

    #[test]
    fn missing_king() {
        assert_eq!(
            RuleEngine::from_placement("8/8/8/8/8/8/8/4K3", Color::White).unwrap_err(),
            ChessError::MissingKing(Color::Black)
        );
        assert!(matches!(
            RuleEngine::from_placement("8/8", Color::White),
            Err(ChessError::Placement(_))
        ));
    }
}
