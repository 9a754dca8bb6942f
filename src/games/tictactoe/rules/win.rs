//! Win detection.

use super::super::Board;
use crate::protocol::Seat;
use tracing::instrument;

/// Every row, column and diagonal.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the winning seat and its line, if any.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<(Seat, [usize; 3])> {
    let squares = board.squares();
    LINES.iter().find_map(|&[a, b, c]| match squares[a] {
        Some(seat) if squares[b] == Some(seat) && squares[c] == Some(seat) => Some((seat, [a, b, c])),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(check_winner(&Board::new()), None);
    }

    #[test]
    fn test_winner_column() {
        let mut board = Board::new();
        for pos in [1, 4, 7] {
            board.set(pos, 1);
        }
        assert_eq!(check_winner(&board), Some((1, [1, 4, 7])));
    }

    #[test]
    fn test_mixed_line_is_not_a_win() {
        let mut board = Board::new();
        board.set(0, 0);
        board.set(4, 1);
        board.set(8, 0);
        assert_eq!(check_winner(&board), None);
    }
}
