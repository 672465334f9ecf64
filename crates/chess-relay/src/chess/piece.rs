//! Pieces and their per-kind legality predicates.

use super::board::Board;
use crate::types::{Color, Coord, PieceKind};

/// What a piece's movement rule says about a proposed destination.
///
/// Pawn moves carry side effects the engine must apply, so this is richer
/// than a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    /// The destination is not reachable.
    Rejected,
    /// An ordinary move or capture.
    Simple,
    /// A pawn's two-square advance from its starting rank.
    DoublePawnPush,
    /// A pawn capture of an adjacent pawn that just double-stepped.
    EnPassantCapture,
    /// A pawn arriving on its last rank.
    PromotionTrigger,
}

impl Legality {
    #[must_use]
    pub const fn is_legal(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    const fn from_bool(legal: bool) -> Self {
        if legal {
            Self::Simple
        } else {
            Self::Rejected
        }
    }
}

/// A piece on the board.
///
/// `position` always equals the address of the cell holding the piece; only
/// [`Board`] writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    kind: PieceKind,
    color: Color,
    position: Coord,
    has_moved: bool,
    en_passant_eligible: bool,
}

impl Piece {
    /// A fresh, unmoved piece. Its position is assigned when placed on a board.
    #[must_use]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            position: Coord::new(0, 0),
            has_moved: false,
            en_passant_eligible: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Whether the piece has left its starting square. Castling and the pawn
    /// double step depend on it.
    #[must_use]
    pub const fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// True only during the ply right after this pawn's double step.
    #[must_use]
    pub const fn en_passant_eligible(&self) -> bool {
        self.en_passant_eligible
    }

    #[must_use]
    pub(crate) const fn moved(mut self) -> Self {
        self.has_moved = true;
        self
    }

    pub(crate) fn place_at(&mut self, at: Coord) {
        self.position = at;
    }

    pub(crate) fn mark_moved(&mut self) {
        self.has_moved = true;
    }

    pub(crate) fn set_en_passant(&mut self, eligible: bool) {
        self.en_passant_eligible = eligible;
    }

    /// FEN letter: uppercase for white, lowercase for black.
    #[must_use]
    pub fn fen_char(&self) -> char {
        let letter = self.kind.letter();
        match self.color {
            Color::White => letter,
            Color::Black => letter.to_ascii_lowercase(),
        }
    }

    /// Decide whether this piece may move to `target` on `board`.
    ///
    /// Only the piece's own movement rule is checked. Ownership of the target
    /// square and king safety are the engine's concern.
    #[must_use]
    pub fn legality(&self, target: Coord, board: &Board) -> Legality {
        if !target.in_range() || target == self.position {
            return Legality::Rejected;
        }
        let d = target - self.position;
        let a = d.abs();
        match self.kind {
            PieceKind::Pawn => self.pawn_legality(target, board),
            PieceKind::Knight => {
                Legality::from_bool((a.row == 2 && a.col == 1) || (a.row == 1 && a.col == 2))
            }
            PieceKind::Bishop => {
                Legality::from_bool(a.row == a.col && path_clear(board, self.position, target))
            }
            PieceKind::Rook => Legality::from_bool(
                (d.row == 0 || d.col == 0) && path_clear(board, self.position, target),
            ),
            PieceKind::Queen => Legality::from_bool(
                (d.row == 0 || d.col == 0 || a.row == a.col)
                    && path_clear(board, self.position, target),
            ),
            PieceKind::King => Legality::from_bool(a.row <= 1 && a.col <= 1),
        }
    }

    fn pawn_legality(&self, target: Coord, board: &Board) -> Legality {
        let d = target - self.position;
        let forward = self.color.forward();
        let arrival = if target.row == self.color.promotion_row() {
            Legality::PromotionTrigger
        } else {
            Legality::Simple
        };

        if d.col == 0 {
            if d.row == forward {
                return if board.is_empty(target) {
                    arrival
                } else {
                    Legality::Rejected
                };
            }
            if d.row == 2 * forward && !self.has_moved {
                let between = self.position + Coord::new(forward, 0);
                return if board.is_empty(target) && board.is_empty(between) {
                    Legality::DoublePawnPush
                } else {
                    Legality::Rejected
                };
            }
            return Legality::Rejected;
        }

        if d.col.abs() != 1 || d.row != forward {
            return Legality::Rejected;
        }
        match board.get(target) {
            Some(occupant) if occupant.color != self.color => return arrival,
            Some(_) => return Legality::Rejected,
            None => {}
        }

        // Diagonal onto an empty square: only an en passant capture of the
        // pawn beside us on our own rank.
        let passed = Coord::new(self.position.row, target.col);
        match board.get(passed) {
            Some(p)
                if p.kind == PieceKind::Pawn
                    && p.color != self.color
                    && p.en_passant_eligible =>
            {
                Legality::EnPassantCapture
            }
            _ => Legality::Rejected,
        }
    }
}

/// Every square strictly between `from` and `to` is empty.
///
/// `to - from` must be a straight or diagonal line.
fn path_clear(board: &Board, from: Coord, to: Coord) -> bool {
    let step = (to - from).signum();
    let mut square = from + step;
    while square != to {
        if !board.is_empty(square) {
            return false;
        }
        square += step;
    }
    true
}
