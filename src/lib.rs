//! Strictly Sessions - concurrent turn-based game sessions behind one endpoint.
//!
//! Every game instance runs inside its own session actor: a task that owns
//! the game and its seat mapping and applies actions one at a time from a
//! bounded queue. Results fan out to every connection of the session over
//! a broadcast channel.
//!
//! # Architecture
//!
//! - **Protocol**: request/response envelopes and addressed state messages
//! - **Game** / **PlayerMapping**: the capabilities a session drives
//! - **Session**: actor handle, event loop and the [`Registry`]
//! - **Connection**: pumps a transport into and out of a session
//! - **Server**: axum routes, auth and WebSocket upgrade
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_sessions::{AuthService, Registry, SeatMapping, SessionOptions, TicTacToe};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Registry::new(SessionOptions::default());
//! let auth = Arc::new(AuthService::default());
//! let session = registry
//!     .create_with_unique_id(|_| (TicTacToe::new(), SeatMapping::new(2, auth)))
//!     .await;
//! println!("created {}", session.id());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod auth;
mod config;
mod connection;
mod game;
mod players;
mod protocol;
mod server;
mod session;

pub mod games;

// Crate-level exports - Protocol
pub use protocol::{
    ActionMessage, Addressee, ErrorParameters, PlayerId, PlayerInfo, Request, RequestCategory,
    Response, ResponseKind, Seat, SessionId, SessionStateParameters, SimpleParameters,
    StateMessage,
};

// Crate-level exports - Game and seat capabilities
pub use game::{ActionRejected, Game};
pub use players::{AI_NAMES, PlayerMapping, SeatError, SeatMapping, UserDirectory};

// Crate-level exports - Sessions
pub use session::{
    Command, DEFAULT_ACTION_QUEUE_CAPACITY, DEFAULT_OUTBOUND_CAPACITY, Lagged, Registry, RegistryError,
    SESSION_ID_LEN, Session, SessionActor, SessionError, SessionEvents, SessionOptions,
};

// Crate-level exports - Connections
pub use connection::{Disconnect, run_connection};

// Crate-level exports - Auth and configuration
pub use auth::{AuthError, AuthService, DEFAULT_WS_TOKEN_TTL, User, WS_TOKEN_PREFIX};
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - HTTP boundary
pub use server::{
    ApiError, AppState, Authenticated, BearerToken, Credentials, WsQuery, is_valid_game_id, router,
    run,
};

// Crate-level exports - Games
pub use games::TicTacToe;
