//! Core domain types for tic-tac-toe.

use crate::protocol::Seat;
use serde::{Deserialize, Serialize};

/// Number of squares on the board.
pub const BOARD_SIZE: usize = 9;

/// Number of seats in a tic-tac-toe game.
pub const PLAYER_COUNT: usize = 2;

/// A square: empty, or marked by the player in a seat.
pub type Square = Option<Seat>;

/// 3x3 tic-tac-toe board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; BOARD_SIZE],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the square at the given position (0-8).
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// Marks a square for `seat`. Out-of-range positions are ignored.
    pub fn set(&mut self, pos: usize, seat: Seat) {
        if let Some(square) = self.squares.get_mut(pos) {
            *square = Some(seat);
        }
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: usize) -> bool {
        matches!(self.get(pos), Some(None))
    }

    /// Returns all squares.
    pub fn squares(&self) -> &[Square; BOARD_SIZE] {
        &self.squares
    }
}

/// Current status of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Game is ongoing.
    InProgress,
    /// Game ended in a win along `line`.
    Won {
        /// Winning seat.
        seat: Seat,
        /// The three positions that won.
        line: [usize; 3],
    },
    /// Game ended in a draw.
    Draw,
}

/// Complete game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    current_player: Seat,
    status: GameStatus,
    history: Vec<usize>,
}

impl GameState {
    /// Creates a new game. Seat 0 moves first.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: 0,
            status: GameStatus::InProgress,
            history: Vec::new(),
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the seat to move.
    pub fn current_player(&self) -> Seat {
        self.current_player
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Returns the positions played, in order.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Applies a move without validation.
    pub(super) fn apply_move(&mut self, pos: usize, seat: Seat) {
        self.board.set(pos, seat);
        self.history.push(pos);
        self.current_player = (seat + 1) % PLAYER_COUNT;
    }

    pub(super) fn set_status(&mut self, status: GameStatus) {
        self.status = status;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// The `game_state` payload broadcast after every move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicTacToeView {
    /// Seat that marked each square, row-major.
    pub board: [Square; BOARD_SIZE],
    /// Positions played, in order.
    pub moves: Vec<usize>,
    /// Seat to move next.
    pub current_player: Seat,
    /// Winning seat, once there is one.
    pub winner: Option<Seat>,
    /// Winning positions, once there is a winner.
    pub winning_line: Option<[usize; 3]>,
    /// True if the board filled without a winner.
    pub is_draw: bool,
}

impl From<&GameState> for TicTacToeView {
    fn from(state: &GameState) -> Self {
        let (winner, winning_line) = match state.status() {
            GameStatus::Won { seat, line } => (Some(seat), Some(line)),
            _ => (None, None),
        };
        Self {
            board: *state.board().squares(),
            moves: state.history().to_vec(),
            current_player: state.current_player(),
            winner,
            winning_line,
            is_draw: state.status() == GameStatus::Draw,
        }
    }
}
