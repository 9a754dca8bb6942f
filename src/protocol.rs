//! Wire protocol shared by connections, sessions and games.
//!
//! Clients send [`Request`] envelopes; sessions answer with [`Response`]
//! envelopes wrapped in [`StateMessage`]s that say who should receive them.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// A playing position inside a game.
pub type Seat = usize;

/// Which part of a session a request targets.
///
/// Unknown categories are kept verbatim so the session can reject them
/// with a proper error instead of the connection dropping the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestCategory {
    /// Seat management (join, leave, add or remove AI).
    #[display("session")]
    Session,
    /// AI player management.
    #[display("ai")]
    Ai,
    /// Game moves.
    #[display("game")]
    Game,
    /// Anything else the client sent.
    #[display("{_0}")]
    Other(String),
}

impl From<String> for RequestCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "session" => Self::Session,
            "ai" => Self::Ai,
            "game" => Self::Game,
            _ => Self::Other(value),
        }
    }
}

impl From<RequestCategory> for String {
    fn from(category: RequestCategory) -> Self {
        category.to_string()
    }
}

/// A request sent by a client over its connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request category.
    #[serde(rename = "request_type", alias = "category")]
    pub category: RequestCategory,
    /// Function to invoke within the category.
    #[serde(rename = "function_name", alias = "function")]
    pub function: String,
    /// Free-form function parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Request {
    /// Creates a request from a category, function name and JSON parameters.
    ///
    /// Non-object parameters are treated as empty.
    pub fn new(category: RequestCategory, function: impl Into<String>, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            category,
            function: function.into(),
            parameters,
        }
    }

    /// Creates a `session` request.
    pub fn session(function: impl Into<String>, parameters: Value) -> Self {
        Self::new(RequestCategory::Session, function, parameters)
    }

    /// Creates an `ai` request.
    pub fn ai(function: impl Into<String>, parameters: Value) -> Self {
        Self::new(RequestCategory::Ai, function, parameters)
    }

    /// Creates a `game` request.
    pub fn game(function: impl Into<String>, parameters: Value) -> Self {
        Self::new(RequestCategory::Game, function, parameters)
    }

    /// Returns a string parameter, if present.
    pub fn str_parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Kind of a server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseKind {
    /// Seat occupancy for the whole session.
    SessionState,
    /// Game-specific state snapshot.
    GameState,
    /// A rejected request.
    Error,
    /// Plain informational text.
    Simple,
    /// AI player listing.
    AiState,
}

/// A response sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response kind.
    #[serde(rename = "message_type")]
    pub kind: ResponseKind,
    /// Kind-specific payload.
    pub parameters: Value,
}

impl Response {
    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Error,
            parameters: json!(ErrorParameters {
                error_message: message.into(),
            }),
        }
    }

    /// Creates a simple text response.
    pub fn simple(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Simple,
            parameters: json!(SimpleParameters {
                message: message.into(),
            }),
        }
    }

    /// Creates a session state response.
    pub fn session_state(parameters: &SessionStateParameters) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: ResponseKind::SessionState,
            parameters: serde_json::to_value(parameters)?,
        })
    }

    /// Creates a game state response from any serializable game view.
    pub fn game_state<T: Serialize>(state: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: ResponseKind::GameState,
            parameters: serde_json::to_value(state)?,
        })
    }

    /// Returns the error text if this is an error response.
    pub fn error_message(&self) -> Option<&str> {
        match self.kind {
            ResponseKind::Error => self.parameters.get("error_message").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Payload of an `error` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorParameters {
    /// Human-readable reason.
    pub error_message: String,
}

/// Payload of a `simple` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleParameters {
    /// Message text.
    pub message: String,
}

/// A seated player as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// User id, or the AI type for AI players.
    pub user_id: String,
    /// Name shown in the lobby.
    pub display_name: String,
    /// Whether the seat is held by an AI.
    pub is_ai: bool,
    /// Whether the player currently has a live connection.
    pub connected: bool,
}

/// Payload of a `session_state` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStateParameters {
    /// Every seat, empty seats mapped to `None`.
    pub player_positions: BTreeMap<Seat, Option<PlayerInfo>>,
}

/// An action from a player, queued for a session.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct ActionMessage {
    /// Authenticated player that sent the action.
    pub sender: PlayerId,
    /// The decoded request.
    pub request: Request,
}

/// Who a state message is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Addressee {
    /// Every connection of the session.
    #[display("broadcast")]
    Broadcast,
    /// Only connections authenticated as this player.
    #[display("{_0}")]
    Player(PlayerId),
}

impl Addressee {
    /// Returns true if a connection for `player` should receive the message.
    pub fn includes(&self, player: &str) -> bool {
        match self {
            Addressee::Broadcast => true,
            Addressee::Player(id) => id == player,
        }
    }
}

/// A response produced by a session together with its addressee.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMessage {
    /// Who receives the message.
    pub addressee: Addressee,
    /// The response itself.
    pub response: Response,
}

impl StateMessage {
    /// Creates a message for every connection.
    pub fn broadcast(response: Response) -> Self {
        Self {
            addressee: Addressee::Broadcast,
            response,
        }
    }

    /// Creates a message for a single player.
    pub fn to(player: impl Into<PlayerId>, response: Response) -> Self {
        Self {
            addressee: Addressee::Player(player.into()),
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_decodes_wire_names() {
        let raw = r#"{"request_type":"game","function_name":"make_move","parameters":{"position":4}}"#;
        let request: Request = serde_json::from_str(raw).expect("valid request");
        assert_eq!(request.category, RequestCategory::Game);
        assert_eq!(request.function, "make_move");
        assert_eq!(request.parameters.get("position"), Some(&json!(4)));
    }

    #[test]
    fn test_unknown_category_is_preserved() {
        let raw = r#"{"category":"chat","function":"say"}"#;
        let request: Request = serde_json::from_str(raw).expect("valid request");
        assert_eq!(request.category, RequestCategory::Other("chat".to_string()));
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_response_wire_shape() {
        let value = serde_json::to_value(Response::error("nope")).expect("serializable");
        assert_eq!(
            value,
            json!({ "message_type": "error", "parameters": { "error_message": "nope" } })
        );
    }

    #[test]
    fn test_payloads_decode_into_typed_parameters() {
        let simple: SimpleParameters =
            serde_json::from_value(Response::simple("hello").parameters).expect("simple payload");
        assert_eq!(simple.message, "hello");

        let error: ErrorParameters =
            serde_json::from_value(Response::error("nope").parameters).expect("error payload");
        assert_eq!(error.error_message, "nope");
    }

    #[test]
    fn test_addressee_filtering() {
        assert!(Addressee::Broadcast.includes("anyone"));
        assert!(Addressee::Player("a".into()).includes("a"));
        assert!(!Addressee::Player("a".into()).includes("b"));
    }
}
