//! Textual move tokens as sent by clients.

use super::engine::MoveRejection;
use crate::types::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    /// `O-O`
    Kingside,
    /// `O-O-O`
    Queenside,
}

/// One parsed client move token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveToken {
    /// `<file><rank><file><rank>`, e.g. `e2e4`.
    Step { from: Coord, to: Coord },
    Castle(CastleSide),
    /// `=<letter>`. The letter is validated only once a promotion is pending.
    Promote(char),
}

impl std::str::FromStr for MoveToken {
    type Err = MoveRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O-O" => return Ok(Self::Castle(CastleSide::Kingside)),
            "O-O-O" => return Ok(Self::Castle(CastleSide::Queenside)),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix('=') {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(letter), None) => Ok(Self::Promote(letter)),
                _ => Err(MoveRejection::InvalidFormat),
            };
        }

        if s.len() != 4 || !s.is_ascii() {
            return Err(MoveRejection::InvalidFormat);
        }
        let from = s[..2].parse().map_err(|_| MoveRejection::InvalidFormat)?;
        let to = s[2..].parse().map_err(|_| MoveRejection::InvalidFormat)?;
        Ok(Self::Step { from, to })
    }
}

impl std::fmt::Display for MoveToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step { from, to } => write!(f, "{from}{to}"),
            Self::Castle(CastleSide::Kingside) => write!(f, "O-O"),
            Self::Castle(CastleSide::Queenside) => write!(f, "O-O-O"),
            Self::Promote(letter) => write!(f, "={letter}"),
        }
    }
}
