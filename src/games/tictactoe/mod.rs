//! Two-player tic-tac-toe.

mod action;
mod game;
mod rules;
mod types;

pub use action::{MAKE_MOVE, MoveError, parse_move};
pub use game::{GAME_TYPE, TicTacToe};
pub use rules::{LINES, check_winner, is_draw, is_full};
pub use types::{BOARD_SIZE, Board, GameState, GameStatus, PLAYER_COUNT, Square, TicTacToeView};
