//! The capability set every hosted game implements.

use crate::protocol::{Addressee, PlayerId, Request, Seat, StateMessage};
use derive_more::{Display, Error};
use std::collections::BTreeMap;

/// A game rejected an action.
///
/// The message is sent back verbatim to the player who sent the action.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{message}")]
pub struct ActionRejected {
    /// Human-readable reason.
    pub message: String,
}

impl ActionRejected {
    /// Creates a rejection with the given reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A turn-based game hosted inside a session.
///
/// Implementations are pure state machines: they never block, never spawn
/// and are only ever touched by the session task that owns them.
pub trait Game: Send + 'static {
    /// Applies an action from the player in `seat`.
    fn handle_action(&mut self, seat: Seat, request: &Request) -> Result<(), ActionRejected>;

    /// Returns the state updates to publish after a successful action.
    fn state_for_all(&self) -> Vec<StateMessage>;

    /// Returns the state a single player may see, addressed to that player.
    ///
    /// Used for the snapshot sent on connect, with the player's seat if they
    /// hold one. The default keeps the messages of [`state_for_all`](Self::state_for_all)
    /// that are broadcast or already addressed to `player`; games with hidden
    /// information that want to show a seat its own view override this.
    fn state_for_player(&self, player: &PlayerId, _seat: Option<Seat>) -> Vec<StateMessage> {
        self.state_for_all()
            .into_iter()
            .filter(|message| message.addressee.includes(player))
            .map(|message| StateMessage {
                addressee: Addressee::Player(player.clone()),
                ..message
            })
            .collect()
    }

    /// Returns true once the game has ended.
    fn is_complete(&self) -> bool;

    /// Returns the game type identifier, e.g. `"tictactoe"`.
    fn game_type(&self) -> &'static str;

    /// Returns the supported AI archetypes, keyed by name with a difficulty label.
    fn ai_types(&self) -> BTreeMap<String, String>;

    /// Returns game metadata for the HTTP API.
    fn metadata(&self) -> serde_json::Value;
}
