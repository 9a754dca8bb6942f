//! Draw detection.

use super::super::Board;
use super::win::check_winner;

/// Checks if every square is marked.
pub fn is_full(board: &Board) -> bool {
    board.squares().iter().all(Option::is_some)
}

/// A full board with no winner.
pub fn is_draw(board: &Board) -> bool {
    is_full(board) && check_winner(board).is_none()
}
