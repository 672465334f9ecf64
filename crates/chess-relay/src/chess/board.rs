//! The 8x8 board and its text forms.

use super::piece::Piece;
use crate::types::{Color, Coord, PieceKind};

/// Errors from parsing a FEN piece-placement field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("expected 8 ranks, got {0}")]
    RankCount(usize),
    #[error("rank {rank} describes {width} files, expected 8")]
    RankWidth { rank: usize, width: usize },
    #[error("unknown piece letter {0:?}")]
    UnknownPiece(char),
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Grid of optional pieces. Each cell owns its occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
        }
    }

    /// The standard 32-piece starting arrangement.
    #[must_use]
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for color in [Color::White, Color::Black] {
            let home = color.home_row();
            let pawns = home + color.forward();
            for (col, kind) in (0..8).zip(BACK_RANK) {
                board.put(Coord::new(home, col), Piece::new(kind, color));
                board.put(Coord::new(pawns, col), Piece::new(PieceKind::Pawn, color));
            }
        }
        board
    }

    /// Occupant of `at`, or `None` when empty or off the board.
    #[must_use]
    pub fn get(&self, at: Coord) -> Option<&Piece> {
        if !at.in_range() {
            return None;
        }
        let piece = self.squares[at.row as usize][at.col as usize].as_ref();
        if let Some(p) = piece {
            debug_assert_eq!(p.position(), at, "piece position out of sync with its cell");
        }
        piece
    }

    pub(crate) fn get_mut(&mut self, at: Coord) -> Option<&mut Piece> {
        if !at.in_range() {
            return None;
        }
        self.squares[at.row as usize][at.col as usize].as_mut()
    }

    #[must_use]
    pub fn is_empty(&self, at: Coord) -> bool {
        self.get(at).is_none()
    }

    /// Place `piece` on `at`, returning the previous occupant.
    pub fn put(&mut self, at: Coord, mut piece: Piece) -> Option<Piece> {
        piece.place_at(at);
        self.cell(at).replace(piece)
    }

    /// Remove and return the occupant of `at`.
    pub fn take(&mut self, at: Coord) -> Option<Piece> {
        self.cell(at).take()
    }

    /// Move the occupant of `from` to `to` and mark it as moved. Returns the
    /// piece that was standing on `to`, if any.
    pub fn move_piece(&mut self, from: Coord, to: Coord) -> Option<Piece> {
        let captured = self.relocate(from, to);
        if let Some(piece) = self.get_mut(to) {
            piece.mark_moved();
        }
        captured
    }

    /// Like [`Board::move_piece`] but leaves the moved flag alone.
    pub(crate) fn relocate(&mut self, from: Coord, to: Coord) -> Option<Piece> {
        match self.take(from) {
            Some(piece) => self.put(to, piece),
            None => None,
        }
    }

    /// All pieces in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.squares.iter().flatten().flatten()
    }

    /// Square of the first king of `color`, scanning from rank 8.
    #[must_use]
    pub fn find_king(&self, color: Color) -> Option<Coord> {
        self.pieces()
            .find(|p| p.kind() == PieceKind::King && p.color() == color)
            .map(Piece::position)
    }

    /// FEN piece-placement field, rank 8 first.
    #[must_use]
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for row in 0..8 {
            if row > 0 {
                out.push('/');
            }
            let mut empty = 0u8;
            for col in 0..8 {
                match self.get(Coord::new(row, col)) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
        }
        out
    }

    /// Parse a FEN piece-placement field.
    ///
    /// Pawns off their starting rank and kings or rooks off their starting
    /// squares are treated as having moved.
    pub fn from_placement(placement: &str) -> Result<Self, PlacementError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(PlacementError::RankCount(ranks.len()));
        }
        let mut board = Self::empty();
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as usize;
                    continue;
                }
                let kind = PieceKind::from_letter(c.to_ascii_uppercase())
                    .ok_or(PlacementError::UnknownPiece(c))?;
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                if col >= 8 {
                    col += 1;
                    continue;
                }
                let at = Coord::new(row as i8, col as i8);
                let mut piece = Piece::new(kind, color);
                if !on_starting_square(kind, color, at) {
                    piece = piece.moved();
                }
                board.put(at, piece);
                col += 1;
            }
            if col != 8 {
                return Err(PlacementError::RankWidth {
                    rank: 8 - row,
                    width: col,
                });
            }
        }
        Ok(board)
    }

    fn cell(&mut self, at: Coord) -> &mut Option<Piece> {
        debug_assert!(at.in_range(), "square {at:?} off the board");
        &mut self.squares[at.row as usize][at.col as usize]
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

fn on_starting_square(kind: PieceKind, color: Color, at: Coord) -> bool {
    match kind {
        PieceKind::Pawn => at.row == color.home_row() + color.forward(),
        PieceKind::King => at == Coord::new(color.home_row(), 4),
        PieceKind::Rook => at.row == color.home_row() && (at.col == 0 || at.col == 7),
        _ => true,
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..8i8 {
            write!(f, "{}|", 8 - row)?;
            for col in 0..8 {
                match self.get(Coord::new(row, col)) {
                    Some(p) => {
                        let side = if p.color() == Color::White { 'w' } else { 'b' };
                        write!(f, " {side}{}", p.kind().letter())?;
                    }
                    None => write!(f, " []")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, " |________________________")?;
        write!(f, "  ")?;
        for file in 'a'..='h' {
            write!(f, " {file} ")?;
        }
        writeln!(f)
    }
}
