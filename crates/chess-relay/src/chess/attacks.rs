//! Attack detection by ray casting from the attacked square.
//!
//! King adjacency is not considered: a square next to the enemy king alone
//! is reported as safe.

use super::board::Board;
use crate::types::{Color, Coord, PieceKind};

pub const DIAGONALS: [Coord; 4] = [
    Coord::new(1, 1),
    Coord::new(1, -1),
    Coord::new(-1, 1),
    Coord::new(-1, -1),
];

pub const ORTHOGONALS: [Coord; 4] = [
    Coord::new(0, 1),
    Coord::new(0, -1),
    Coord::new(1, 0),
    Coord::new(-1, 0),
];

pub const KNIGHT_OFFSETS: [Coord; 8] = [
    Coord::new(1, 2),
    Coord::new(1, -2),
    Coord::new(-1, 2),
    Coord::new(-1, -2),
    Coord::new(2, 1),
    Coord::new(2, -1),
    Coord::new(-2, 1),
    Coord::new(-2, -1),
];

/// Offsets from a square to the enemy pawns that would capture onto it,
/// indexed by the defending color.
const PAWN_ATTACKERS: [[Coord; 2]; 2] = [
    // White defends: black pawns sit one row closer to rank 8.
    [Coord::new(-1, 1), Coord::new(-1, -1)],
    [Coord::new(1, 1), Coord::new(1, -1)],
];

/// Kind of some enemy piece attacking `square`, where `defender` is the side
/// that would be captured there.
#[must_use]
pub fn attacker(board: &Board, square: Coord, defender: Color) -> Option<PieceKind> {
    let diagonal = DIAGONALS
        .iter()
        .find_map(|&step| ray(board, square, step, defender, &[PieceKind::Bishop, PieceKind::Queen]));
    if diagonal.is_some() {
        return diagonal;
    }

    let straight = ORTHOGONALS
        .iter()
        .find_map(|&step| ray(board, square, step, defender, &[PieceKind::Rook, PieceKind::Queen]));
    if straight.is_some() {
        return straight;
    }

    let enemy_at = |offset: Coord, kind: PieceKind| {
        board
            .get(square + offset)
            .is_some_and(|p| p.color() != defender && p.kind() == kind)
    };
    if KNIGHT_OFFSETS.iter().any(|&o| enemy_at(o, PieceKind::Knight)) {
        return Some(PieceKind::Knight);
    }
    if PAWN_ATTACKERS[defender.index()]
        .iter()
        .any(|&o| enemy_at(o, PieceKind::Pawn))
    {
        return Some(PieceKind::Pawn);
    }
    None
}

#[must_use]
pub fn is_attacked(board: &Board, square: Coord, defender: Color) -> bool {
    attacker(board, square, defender).is_some()
}

/// Walk from `origin` along `step` to the first occupied square and report
/// it if it is an enemy of one of `kinds`.
fn ray(
    board: &Board,
    origin: Coord,
    step: Coord,
    defender: Color,
    kinds: &[PieceKind],
) -> Option<PieceKind> {
    let mut square = origin + step;
    while square.in_range() {
        if let Some(piece) = board.get(square) {
            if piece.color() != defender && kinds.contains(&piece.kind()) {
                return Some(piece.kind());
            }
            return None;
        }
        square += step;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Coord {
        name.parse().unwrap()
    }

    fn board(placement: &str) -> Board {
        Board::from_placement(placement).unwrap()
    }

    #[test]
    fn bishop_attacks_along_every_diagonal() {
        let b = board("4k3/8/8/8/3b4/8/8/4K3");
        for target in ["a1", "g1", "a7", "h8", "c3", "e5"] {
            assert_eq!(
                attacker(&b, sq(target), Color::White),
                Some(PieceKind::Bishop),
                "{target}"
            );
        }
        assert!(!is_attacked(&b, sq("d5"), Color::White));
        assert!(!is_attacked(&b, sq("a1"), Color::Black));
    }

    #[test]
    fn rays_stop_at_first_piece() {
        let b = board("4k3/8/8/8/r2P3K/8/8/8");
        assert!(is_attacked(&b, sq("c4"), Color::White));
        assert!(!is_attacked(&b, sq("h4"), Color::White));
        assert!(!is_attacked(&b, sq("e4"), Color::White));
    }

    #[test]
    fn queen_attacks_both_ways() {
        let b = board("4k3/8/8/8/3q4/8/8/4K3");
        assert_eq!(attacker(&b, sq("d1"), Color::White), Some(PieceKind::Queen));
        assert_eq!(attacker(&b, sq("g1"), Color::White), Some(PieceKind::Queen));
        assert!(!is_attacked(&b, sq("e2"), Color::White));
    }

    #[test]
    fn knight_attacks_ignore_blockers() {
        let b = board("4k3/8/8/8/8/PPP5/PnP5/PPP1K3");
        assert_eq!(attacker(&b, sq("d1"), Color::White), Some(PieceKind::Knight));
        assert_eq!(attacker(&b, sq("d3"), Color::White), Some(PieceKind::Knight));
        assert!(!is_attacked(&b, sq("d2"), Color::White));
    }

    #[test]
    fn pawns_attack_forward_diagonals() {
        let b = board("4k3/8/8/3p4/8/8/4P3/4K3");
        assert_eq!(attacker(&b, sq("c4"), Color::White), Some(PieceKind::Pawn));
        assert_eq!(attacker(&b, sq("e4"), Color::White), Some(PieceKind::Pawn));
        assert!(!is_attacked(&b, sq("d4"), Color::White));
        assert!(!is_attacked(&b, sq("c6"), Color::White));

        assert_eq!(attacker(&b, sq("d3"), Color::Black), Some(PieceKind::Pawn));
        assert_eq!(attacker(&b, sq("f3"), Color::Black), Some(PieceKind::Pawn));
        assert!(!is_attacked(&b, sq("d1"), Color::Black));
    }

    #[test]
    fn enemy_king_does_not_count() {
        let b = board("8/8/8/8/8/8/3k4/4K3");
        assert!(!is_attacked(&b, sq("e2"), Color::White));
    }
}
