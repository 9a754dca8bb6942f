//! Move requests and the ways they can fail.

use super::types::BOARD_SIZE;
use crate::game::ActionRejected;
use crate::protocol::{Request, Seat};
use serde_json::Value;

/// The only function tic-tac-toe accepts.
pub const MAKE_MOVE: &str = "make_move";

/// Error that can occur when validating or applying a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// The request named some other function.
    #[display("Function {} not supported", _0)]
    UnsupportedFunction(String),

    /// No `position` parameter was sent.
    #[display("Missing position parameter")]
    MissingPosition,

    /// `position` was not an integer.
    #[display("Invalid position parameter type")]
    InvalidPosition,

    /// `position` is outside the board.
    #[display("Position {} out of range (must be 0-8)", _0)]
    OutOfRange(i64),

    /// The game already has a winner.
    #[display("Game already has a winner: player {}", _0)]
    AlreadyWon(Seat),

    /// The board is full.
    #[display("Game is already over")]
    GameOver,

    /// It is another seat's turn.
    #[display("Player {} is not the current player", _0)]
    WrongPlayer(Seat),

    /// The square at the position is already marked.
    #[display("Position {} is already taken", _0)]
    SquareOccupied(usize),
}

impl std::error::Error for MoveError {}

impl From<MoveError> for ActionRejected {
    fn from(err: MoveError) -> Self {
        ActionRejected::new(err.to_string())
    }
}

/// Extracts the board position from a `make_move` request.
pub fn parse_move(request: &Request) -> Result<usize, MoveError> {
    if request.function != MAKE_MOVE {
        return Err(MoveError::UnsupportedFunction(request.function.clone()));
    }

    let raw = request
        .parameters
        .get("position")
        .ok_or(MoveError::MissingPosition)?;

    // Whole-number floats are accepted; clients in some languages only send doubles.
    let position = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or(MoveError::InvalidPosition)?,
        _ => return Err(MoveError::InvalidPosition),
    };

    usize::try_from(position)
        .ok()
        .filter(|&pos| pos < BOARD_SIZE)
        .ok_or(MoveError::OutOfRange(position))
}
