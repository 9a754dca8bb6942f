//! Seat bookkeeping: which user plays which position.

mod seats;

pub use seats::{AI_NAMES, SeatMapping};

use crate::protocol::{PlayerId, Request, Seat, StateMessage};
use derive_more::Display;

/// Looks up human-readable names for user ids.
pub trait UserDirectory: Send + Sync {
    /// Returns the display name for a user, if the user is known.
    fn display_name(&self, user_id: &str) -> Option<String>;
}

/// Why a session event was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SeatError {
    /// A required parameter was missing or had the wrong type.
    #[display("missing or invalid {} parameter", _0)]
    InvalidParameter(&'static str),

    /// The position is outside the game's seats.
    #[display("invalid position {} (must be 0-{})", position, last)]
    OutOfRange {
        /// Requested position.
        position: Seat,
        /// Highest valid position.
        last: Seat,
    },

    /// The user already holds a different seat.
    #[display("user already in position {}", _0)]
    AlreadySeated(Seat),

    /// The seat is taken.
    #[display("position {} is already occupied", _0)]
    Occupied(Seat),

    /// The user holds no seat.
    #[display("user is not in any position")]
    NotSeated,

    /// The seat is empty.
    #[display("position {} is not occupied", _0)]
    Vacant(Seat),

    /// The seat belongs to a human, not an AI.
    #[display("position {} is occupied by a human player, not AI", _0)]
    NotAi(Seat),

    /// The function name is not a session function.
    #[display("unknown session function: {}", _0)]
    UnknownFunction(String),
}

impl std::error::Error for SeatError {}

/// Session-level player management for one game.
///
/// Owned by exactly one session; never shared between tasks.
pub trait PlayerMapping: Send + 'static {
    /// Handles `join_position`, `leave_position`, `add_ai` and `remove_ai`.
    fn handle_session_event(&mut self, player: &PlayerId, request: &Request)
    -> Result<(), SeatError>;

    /// Returns the seat held by `player`, if any.
    fn player_position(&self, player: &PlayerId) -> Option<Seat>;

    /// Returns true if `seat` exists and nobody holds it.
    fn is_seat_free(&self, seat: Seat) -> bool;

    /// Returns the session state to broadcast to every connection.
    fn session_state_for_all(&self) -> Vec<StateMessage>;

    /// Records that `player` has a live connection.
    fn mark_connected(&mut self, player: &PlayerId);

    /// Records that one of `player`'s connections closed.
    ///
    /// The player shows as disconnected only once every connection they
    /// opened has closed.
    fn mark_disconnected(&mut self, player: &PlayerId);
}
