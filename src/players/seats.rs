//! Position-based player mapping.

use super::{PlayerMapping, SeatError, UserDirectory};
use crate::protocol::{
    PlayerId, PlayerInfo, Request, Response, Seat, SessionStateParameters, StateMessage,
};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Names handed out to AI players, shown as `AI-{name}`.
pub const AI_NAMES: &[&str] = &[
    "ada", "basil", "clementine", "dorian", "edith", "felix", "greta", "hugo", "iris", "jasper",
    "katya", "leopold",
];

const AI_PREFIX: &str = "AI-";
const FALLBACK_AI_NAME: &str = "alfred";

/// Who holds a seat.
#[derive(Debug, Clone)]
struct SeatSlot {
    user_id: PlayerId,
    display_name: String,
    connected: bool,
    ai_type: Option<String>,
}

impl SeatSlot {
    fn is_ai(&self) -> bool {
        self.ai_type.is_some()
    }

    fn info(&self) -> PlayerInfo {
        PlayerInfo {
            // AI seats expose their archetype instead of the synthetic id
            user_id: self.ai_type.clone().unwrap_or_else(|| self.user_id.clone()),
            display_name: self.display_name.clone(),
            is_ai: self.is_ai(),
            connected: self.connected,
        }
    }
}

/// Maps users to numbered seats `0..max_players`.
pub struct SeatMapping {
    max_players: usize,
    slots: BTreeMap<Seat, SeatSlot>,
    user_to_seat: HashMap<PlayerId, Seat>,
    // Open connections per player; a player may hold several at once.
    connections: HashMap<PlayerId, usize>,
    directory: Arc<dyn UserDirectory>,
}

impl SeatMapping {
    /// Creates an empty mapping with `max_players` seats.
    #[instrument(skip(directory))]
    pub fn new(max_players: usize, directory: Arc<dyn UserDirectory>) -> Self {
        debug!("Creating seat mapping");
        Self {
            max_players,
            slots: BTreeMap::new(),
            user_to_seat: HashMap::new(),
            connections: HashMap::new(),
            directory,
        }
    }

    /// Returns the number of seats.
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Builds the current session state.
    pub fn session_state(&self) -> SessionStateParameters {
        let player_positions = (0..self.max_players)
            .map(|seat| (seat, self.slots.get(&seat).map(SeatSlot::info)))
            .collect();
        SessionStateParameters { player_positions }
    }

    fn check_range(&self, position: Seat) -> Result<(), SeatError> {
        if position >= self.max_players {
            return Err(SeatError::OutOfRange {
                position,
                last: self.max_players.saturating_sub(1),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn join_position(&mut self, user_id: &PlayerId, position: Seat) -> Result<(), SeatError> {
        self.check_range(position)?;

        if let Some(&existing) = self.user_to_seat.get(user_id) {
            if existing == position {
                debug!("User already holds this seat");
                return Ok(());
            }
            return Err(SeatError::AlreadySeated(existing));
        }

        if self.slots.contains_key(&position) {
            return Err(SeatError::Occupied(position));
        }

        let display_name = self
            .directory
            .display_name(user_id)
            .unwrap_or_else(|| user_id.clone());

        info!(display_name = %display_name, "Player joined seat");
        self.slots.insert(
            position,
            SeatSlot {
                user_id: user_id.clone(),
                display_name,
                connected: true,
                ai_type: None,
            },
        );
        self.user_to_seat.insert(user_id.clone(), position);
        Ok(())
    }

    #[instrument(skip(self))]
    fn leave_position(&mut self, user_id: &PlayerId) -> Result<(), SeatError> {
        let position = self
            .user_to_seat
            .remove(user_id)
            .ok_or(SeatError::NotSeated)?;
        self.slots.remove(&position);
        info!(position, "Player left seat");
        Ok(())
    }

    #[instrument(skip(self))]
    fn add_ai(&mut self, position: Seat, ai_type: &str) -> Result<(), SeatError> {
        self.check_range(position)?;

        if self.slots.contains_key(&position) {
            return Err(SeatError::Occupied(position));
        }

        let user_id = format!("ai_{}_{}", ai_type, position);
        let display_name = self.generate_ai_name();

        info!(user_id = %user_id, display_name = %display_name, "AI joined seat");
        self.slots.insert(
            position,
            SeatSlot {
                user_id: user_id.clone(),
                display_name,
                connected: true,
                ai_type: Some(ai_type.to_string()),
            },
        );
        self.user_to_seat.insert(user_id, position);
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove_ai(&mut self, position: Seat) -> Result<(), SeatError> {
        self.check_range(position)?;

        let slot = self.slots.get(&position).ok_or(SeatError::Vacant(position))?;
        if !slot.is_ai() {
            return Err(SeatError::NotAi(position));
        }

        let user_id = slot.user_id.clone();
        self.slots.remove(&position);
        self.user_to_seat.remove(&user_id);
        info!(user_id = %user_id, "AI removed from seat");
        Ok(())
    }

    fn set_connected(&mut self, player: &PlayerId, connected: bool) {
        if let Some(slot) = self
            .user_to_seat
            .get(player)
            .and_then(|seat| self.slots.get_mut(seat))
        {
            slot.connected = connected;
        }
    }

    /// Picks `AI-{name}` from [`AI_NAMES`], skipping names already seated.
    fn generate_ai_name(&self) -> String {
        let used: Vec<&str> = self
            .slots
            .values()
            .filter(|slot| slot.is_ai())
            .filter_map(|slot| slot.display_name.strip_prefix(AI_PREFIX))
            .collect();

        let available: Vec<&str> = AI_NAMES
            .iter()
            .copied()
            .filter(|name| !used.contains(name))
            .collect();

        let name = available
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FALLBACK_AI_NAME);
        format!("{}{}", AI_PREFIX, name)
    }
}

fn position_parameter(request: &Request) -> Result<Seat, SeatError> {
    request
        .parameters
        .get("position")
        .and_then(Value::as_u64)
        .and_then(|position| Seat::try_from(position).ok())
        .ok_or(SeatError::InvalidParameter("position"))
}

fn ai_type_parameter(request: &Request) -> Result<&str, SeatError> {
    request
        .str_parameter("ai_type")
        .ok_or(SeatError::InvalidParameter("ai_type"))
}

impl PlayerMapping for SeatMapping {
    #[instrument(skip(self, request), fields(function = %request.function))]
    fn handle_session_event(
        &mut self,
        player: &PlayerId,
        request: &Request,
    ) -> Result<(), SeatError> {
        match request.function.as_str() {
            "join_position" => {
                let position = position_parameter(request)?;
                self.join_position(player, position)
            }
            "leave_position" => self.leave_position(player),
            "add_ai" => {
                let position = position_parameter(request)?;
                let ai_type = ai_type_parameter(request)?;
                self.add_ai(position, ai_type)
            }
            "remove_ai" => {
                let position = position_parameter(request)?;
                self.remove_ai(position)
            }
            other => Err(SeatError::UnknownFunction(other.to_string())),
        }
    }

    fn player_position(&self, player: &PlayerId) -> Option<Seat> {
        self.user_to_seat.get(player).copied()
    }

    fn is_seat_free(&self, seat: Seat) -> bool {
        seat < self.max_players && !self.slots.contains_key(&seat)
    }

    fn session_state_for_all(&self) -> Vec<StateMessage> {
        match Response::session_state(&self.session_state()) {
            Ok(response) => vec![StateMessage::broadcast(response)],
            Err(e) => {
                error!(error = %e, "Failed to encode session state");
                Vec::new()
            }
        }
    }

    fn mark_connected(&mut self, player: &PlayerId) {
        *self.connections.entry(player.clone()).or_default() += 1;
        self.set_connected(player, true);
    }

    fn mark_disconnected(&mut self, player: &PlayerId) {
        let remaining = self
            .connections
            .get(player)
            .copied()
            .unwrap_or_default()
            .saturating_sub(1);
        if remaining == 0 {
            self.connections.remove(player);
        } else {
            self.connections.insert(player.clone(), remaining);
        }
        debug!(remaining, "Connection closed");
        if remaining == 0 {
            self.set_connected(player, false);
        }
    }
}
