//! The per-session event loop.

use super::Command;
use crate::game::Game;
use crate::players::PlayerMapping;
use crate::protocol::{
    ActionMessage, Addressee, PlayerId, Request, RequestCategory, Response, Seat, SessionId,
    StateMessage,
};
use derive_more::Display;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Why an `ai` request was refused before reaching the seat mapping.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
enum AiRejection {
    #[display("missing or invalid ai_type parameter")]
    MissingType,
    #[display("unknown AI type: {}", _0)]
    UnknownType(String),
    #[display("missing or invalid position parameter")]
    MissingPosition,
    #[display("position {} is not available", _0)]
    SeatTaken(Seat),
    #[display("unknown AI function: {}", _0)]
    UnknownFunction(String),
}

/// Owns a session's game and seat mapping and applies commands one at a time.
///
/// Nothing outside this task can reach the game or the mapping, so every
/// command sees the state left by the previous one.
pub struct SessionActor {
    session_id: SessionId,
    game: Box<dyn Game>,
    mapping: Box<dyn PlayerMapping>,
    ai_types: BTreeMap<String, String>,
    inbound: mpsc::Receiver<Command>,
    outbound: broadcast::Sender<StateMessage>,
    shutdown: watch::Receiver<bool>,
}

impl SessionActor {
    pub(super) fn new(
        session_id: SessionId,
        game: Box<dyn Game>,
        mapping: Box<dyn PlayerMapping>,
        inbound: mpsc::Receiver<Command>,
        outbound: broadcast::Sender<StateMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let ai_types = game.ai_types();
        Self {
            session_id,
            game,
            mapping,
            ai_types,
            inbound,
            outbound,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or every sender is gone.
    ///
    /// Shutdown is checked before each command, so a command that has
    /// started always finishes and nothing is published after exit.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn run(mut self) {
        info!("Session loop started");

        loop {
            let command = tokio::select! {
                biased;

                _ = self.shutdown.wait_for(|stopped| *stopped) => {
                    debug!("Shutdown signalled");
                    break;
                }

                command = self.inbound.recv() => command,
            };

            match command {
                Some(command) => {
                    let messages = self.handle(command);
                    self.publish(messages);
                }
                None => {
                    debug!("All senders dropped");
                    break;
                }
            }
        }

        info!("Session loop stopped");
    }

    fn publish(&self, messages: Vec<StateMessage>) {
        for message in messages {
            debug!(addressee = %message.addressee, kind = %message.response.kind, "Publishing");
            if self.outbound.send(message).is_err() {
                debug!("No subscribers for message");
            }
        }
    }

    fn handle(&mut self, command: Command) -> Vec<StateMessage> {
        match command {
            Command::Action(action) => self.handle_action(action),
            Command::Connected(player) => self.handle_connected(player),
            Command::Disconnected(player) => self.handle_disconnected(player),
        }
    }

    #[instrument(skip(self, action), fields(player_id = %action.sender, category = %action.request.category, function = %action.request.function))]
    fn handle_action(&mut self, action: ActionMessage) -> Vec<StateMessage> {
        let ActionMessage { sender, request } = action;
        match request.category {
            RequestCategory::Session => self.handle_session_request(&sender, &request),
            RequestCategory::Ai => self.handle_ai_request(&sender, &request),
            RequestCategory::Game => self.handle_game_request(&sender, &request),
            RequestCategory::Other(_) => {
                warn!("Unknown request type");
                vec![reject(&sender, "Unknown request type")]
            }
        }
    }

    fn handle_session_request(&mut self, sender: &PlayerId, request: &Request) -> Vec<StateMessage> {
        match self.mapping.handle_session_event(sender, request) {
            Ok(()) => self.mapping.session_state_for_all(),
            Err(e) => {
                warn!(error = %e, "Session request rejected");
                vec![reject(sender, e.to_string())]
            }
        }
    }

    fn handle_ai_request(&mut self, sender: &PlayerId, request: &Request) -> Vec<StateMessage> {
        if let Err(e) = self.check_ai_request(request) {
            warn!(error = %e, "AI request rejected");
            return vec![reject(sender, e.to_string())];
        }
        self.handle_session_request(sender, request)
    }

    fn check_ai_request(&self, request: &Request) -> Result<(), AiRejection> {
        let ai_type = request
            .str_parameter("ai_type")
            .ok_or(AiRejection::MissingType)?;
        if !self.ai_types.contains_key(ai_type) {
            return Err(AiRejection::UnknownType(ai_type.to_string()));
        }

        match request.function.as_str() {
            "add_ai" => {
                let position = request
                    .parameters
                    .get("position")
                    .and_then(Value::as_u64)
                    .and_then(|position| Seat::try_from(position).ok())
                    .ok_or(AiRejection::MissingPosition)?;
                if !self.mapping.is_seat_free(position) {
                    return Err(AiRejection::SeatTaken(position));
                }
                Ok(())
            }
            "remove_ai" => Ok(()),
            other => Err(AiRejection::UnknownFunction(other.to_string())),
        }
    }

    fn handle_game_request(&mut self, sender: &PlayerId, request: &Request) -> Vec<StateMessage> {
        let Some(seat) = self.mapping.player_position(sender) else {
            warn!("Sender holds no seat");
            return vec![reject(sender, "You are not in a playing position")];
        };

        match self.game.handle_action(seat, request) {
            Ok(()) => {
                if self.game.is_complete() {
                    info!(game_type = self.game.game_type(), "Game complete");
                }
                self.game.state_for_all()
            }
            Err(e) => {
                warn!(seat, error = %e, "Game action rejected");
                vec![reject(sender, e.message)]
            }
        }
    }

    #[instrument(skip(self), fields(session_id = %self.session_id))]
    fn handle_connected(&mut self, player: PlayerId) -> Vec<StateMessage> {
        info!("Player connected");
        self.mapping.mark_connected(&player);

        let greeting = StateMessage::to(
            player.clone(),
            Response::simple(format!("Connected to session {}", self.session_id)),
        );
        let seat = self.mapping.player_position(&player);
        let seats = self
            .mapping
            .session_state_for_all()
            .into_iter()
            .filter(|message| message.addressee.includes(&player))
            .map(|message| StateMessage {
                addressee: Addressee::Player(player.clone()),
                ..message
            });
        let snapshot = seats.chain(self.game.state_for_player(&player, seat));

        std::iter::once(greeting)
            .chain(snapshot)
            .chain(self.mapping.session_state_for_all())
            .collect()
    }

    #[instrument(skip(self), fields(session_id = %self.session_id))]
    fn handle_disconnected(&mut self, player: PlayerId) -> Vec<StateMessage> {
        info!("Player disconnected");
        self.mapping.mark_disconnected(&player);
        self.mapping.session_state_for_all()
    }
}

fn reject(sender: &PlayerId, message: impl Into<String>) -> StateMessage {
    StateMessage::to(sender.clone(), Response::error(message))
}
