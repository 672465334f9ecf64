//! Chess value types shared by the rule engine and the wire protocol.

use std::ops::{Add, AddAssign, Sub};

/// Chess piece color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// White pieces, moving toward row 0.
    White,
    /// Black pieces, moving toward row 7.
    Black,
}

impl Color {
    /// Get the opposite color.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row delta of a single pawn step for this color.
    #[must_use]
    pub const fn forward(self) -> i8 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }

    /// Row holding this color's king and rooks at setup.
    #[must_use]
    pub const fn home_row(self) -> i8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }

    /// Row on which this color's pawns promote.
    #[must_use]
    pub const fn promotion_row(self) -> i8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// Slot of this color in per-color tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

/// Chess piece kind. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl PieceKind {
    /// Uppercase algebraic letter (`P`, `N`, `B`, `R`, `Q`, `K`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Parse an uppercase algebraic letter.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'P' => Some(Self::Pawn),
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'R' => Some(Self::Rook),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }

    /// Kinds a pawn may promote to, by letter.
    #[must_use]
    pub const fn promotion_choice(letter: char) -> Option<Self> {
        match letter {
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'R' => Some(Self::Rook),
            'Q' => Some(Self::Queen),
            _ => None,
        }
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pawn => write!(f, "pawn"),
            Self::Knight => write!(f, "knight"),
            Self::Bishop => write!(f, "bishop"),
            Self::Rook => write!(f, "rook"),
            Self::Queen => write!(f, "queen"),
            Self::King => write!(f, "king"),
        }
    }
}

/// Error returned when a square name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCoordError {
    #[error("square must be 2 characters, got {0:?}")]
    Length(String),
    #[error("file must be a-h, got {0:?}")]
    File(char),
    #[error("rank must be 1-8, got {0:?}")]
    Rank(char),
}

/// A board address or an offset between two addresses.
///
/// Row 0 is rank 8 and column 0 is file `a`. Values outside `0..8` are only
/// produced by arithmetic and never by parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: i8,
    pub col: i8,
}

impl Coord {
    #[inline]
    pub const fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    /// Create an address, or `None` if it lies off the board.
    #[must_use]
    pub const fn on_board(row: i8, col: i8) -> Option<Self> {
        let c = Self::new(row, col);
        if c.in_range() {
            Some(c)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn in_range(self) -> bool {
        0 <= self.row && self.row <= 7 && 0 <= self.col && self.col <= 7
    }

    /// Component-wise absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self::new(self.row.abs(), self.col.abs())
    }

    /// Component-wise sign, giving the unit step toward this offset.
    #[must_use]
    pub const fn signum(self) -> Self {
        Self::new(self.row.signum(), self.col.signum())
    }

    /// All 64 addresses in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..8).flat_map(|row| (0..8).map(move |col| Coord::new(row, col)))
    }
}

impl Add for Coord {
    type Output = Coord;

    #[inline]
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl AddAssign for Coord {
    #[inline]
    fn add_assign(&mut self, rhs: Coord) {
        self.row += rhs.row;
        self.col += rhs.col;
    }
}

impl Sub for Coord {
    type Output = Coord;

    #[inline]
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.row - rhs.row, self.col - rhs.col)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.in_range() {
            return write!(f, "({}, {})", self.row, self.col);
        }
        let file = (b'a' + self.col as u8) as char;
        let rank = (b'8' - self.row as u8) as char;
        write!(f, "{file}{rank}")
    }
}

impl std::str::FromStr for Coord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseCoordError::Length(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) {
            return Err(ParseCoordError::File(file as char));
        }
        if !(b'1'..=b'8').contains(&rank) {
            return Err(ParseCoordError::Rank(rank as char));
        }
        Ok(Self::new((b'8' - rank) as i8, (file - b'a') as i8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_opposite() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::White);
    }

    #[test]
    fn test_coord_roundtrip() {
        let e2: Coord = "e2".parse().unwrap();
        assert_eq!(e2, Coord::new(6, 4));
        assert_eq!(e2.to_string(), "e2");

        let a8: Coord = "a8".parse().unwrap();
        assert_eq!(a8, Coord::new(0, 0));
        let h1: Coord = "h1".parse().unwrap();
        assert_eq!(h1, Coord::new(7, 7));
    }

    #[test]
    fn test_coord_rejects_out_of_range() {
        assert_eq!("i2".parse::<Coord>(), Err(ParseCoordError::File('i')));
        assert_eq!("a9".parse::<Coord>(), Err(ParseCoordError::Rank('9')));
        assert_eq!("a0".parse::<Coord>(), Err(ParseCoordError::Rank('0')));
        assert!("e".parse::<Coord>().is_err());
        assert!("e22".parse::<Coord>().is_err());
        assert!(Coord::on_board(8, 0).is_none());
        assert!(Coord::on_board(0, -1).is_none());
    }

    #[test]
    fn test_coord_arithmetic() {
        let d = Coord::new(2, 5) - Coord::new(6, 1);
        assert_eq!(d, Coord::new(-4, 4));
        assert_eq!(d.abs(), Coord::new(4, 4));
        assert_eq!(d.signum(), Coord::new(-1, 1));

        let mut c = Coord::new(0, 0);
        c += Coord::new(1, 2);
        assert_eq!(c + Coord::new(1, 1), Coord::new(2, 3));
    }

    #[test]
    fn test_off_board_coord_display() {
        assert_eq!(Coord::new(-4, 4).to_string(), "(-4, 4)");
        assert_eq!(Coord::new(3, 9).to_string(), "(3, 9)");
        assert_eq!(Coord::new(7, 7).to_string(), "h1");
    }

    #[test]
    fn test_promotion_letters() {
        assert_eq!(PieceKind::promotion_choice('Q'), Some(PieceKind::Queen));
        assert_eq!(PieceKind::promotion_choice('N'), Some(PieceKind::Knight));
        assert_eq!(PieceKind::promotion_choice('K'), None);
        assert_eq!(PieceKind::promotion_choice('P'), None);
        assert_eq!(PieceKind::from_letter('K'), Some(PieceKind::King));
    }
}
