//! In-memory accounts, bearer tokens and single-use WebSocket tokens.

use crate::players::UserDirectory;
use crate::protocol::{PlayerId, SessionId};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use derive_getters::Getters;
use derive_more::Display;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Prefix that marks WebSocket tokens.
pub const WS_TOKEN_PREFIX: &str = "ws-";

/// Default lifetime of a WebSocket token.
pub const DEFAULT_WS_TOKEN_TTL: Duration = Duration::from_secs(10);

const TOKEN_LEN: usize = 32;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AuthError {
    /// Username or password was empty.
    #[display("username and password required")]
    MissingCredentials,
    /// The username is registered already.
    #[display("username already taken")]
    UsernameTaken,
    /// Unknown user or wrong password.
    #[display("invalid credentials")]
    InvalidCredentials,
    /// The bearer token is unknown.
    #[display("invalid or expired token")]
    InvalidToken,
    /// No user has this id.
    #[display("user not found")]
    UserNotFound,
    /// The WebSocket token is unknown or was already redeemed.
    #[display("invalid or expired WebSocket token")]
    InvalidWsToken,
    /// The WebSocket token outlived its TTL.
    #[display("WebSocket token expired")]
    WsTokenExpired,
    /// The WebSocket token was issued for another session.
    #[display("WebSocket token is for game {}, not {}", issued_for, requested)]
    WsTokenWrongGame {
        /// Session the token was issued for.
        issued_for: SessionId,
        /// Session the client tried to join.
        requested: SessionId,
    },
    /// Password hashing failed.
    #[display("failed to hash password: {}", _0)]
    Hashing(String),
}

impl std::error::Error for AuthError {}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct User {
    /// Stable user id.
    id: PlayerId,
    /// Login name, also used as the display name.
    username: String,
    #[getter(skip)]
    password_hash: String,
}

#[derive(Debug, Clone)]
struct WsTicket {
    user_id: PlayerId,
    session_id: SessionId,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct AuthState {
    users_by_name: HashMap<String, User>,
    names_by_id: HashMap<PlayerId, String>,
    bearer_tokens: HashMap<String, PlayerId>,
    ws_tokens: HashMap<String, WsTicket>,
}

/// In-memory authentication service.
#[derive(Debug)]
pub struct AuthService {
    state: RwLock<AuthState>,
    ws_token_ttl: Duration,
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new(DEFAULT_WS_TOKEN_TTL)
    }
}

impl AuthService {
    /// Creates an empty service whose WebSocket tokens live for `ws_token_ttl`.
    #[instrument]
    pub fn new(ws_token_ttl: Duration) -> Self {
        Self {
            state: RwLock::new(AuthState::default()),
            ws_token_ttl,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an account and returns its user id.
    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str) -> Result<PlayerId, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if self.read().users_by_name.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }

        // Hash outside the lock; argon2 is slow on purpose.
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();

        let mut state = self.write();
        if state.users_by_name.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }
        let id = loop {
            let candidate = format!("user-{}", random_token(16));
            if !state.names_by_id.contains_key(&candidate) {
                break candidate;
            }
        };

        state.names_by_id.insert(id.clone(), username.to_string());
        state.users_by_name.insert(
            username.to_string(),
            User {
                id: id.clone(),
                username: username.to_string(),
                password_hash,
            },
        );
        info!(user_id = %id, "User registered");
        Ok(id)
    }

    /// Checks a password and issues a bearer token. Returns `(token, user_id)`.
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> Result<(String, PlayerId), AuthError> {
        let user = self
            .read()
            .users_by_name
            .get(username)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed =
            PasswordHash::new(&user.password_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!("Wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let mut state = self.write();
        let token = loop {
            let candidate = random_token(TOKEN_LEN);
            if !state.bearer_tokens.contains_key(&candidate) {
                break candidate;
            }
        };
        state.bearer_tokens.insert(token.clone(), user.id.clone());
        info!(user_id = %user.id, "User logged in");
        Ok((token, user.id))
    }

    /// Returns the user id a bearer token belongs to.
    pub fn validate_token(&self, token: &str) -> Result<PlayerId, AuthError> {
        self.read()
            .bearer_tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    /// Invalidates a bearer token. Unknown tokens are ignored.
    #[instrument(skip_all)]
    pub fn logout(&self, token: &str) {
        if let Some(user_id) = self.write().bearer_tokens.remove(token) {
            info!(user_id = %user_id, "User logged out");
        }
    }

    /// Looks up a user by id.
    pub fn user(&self, user_id: &str) -> Result<User, AuthError> {
        let state = self.read();
        state
            .names_by_id
            .get(user_id)
            .and_then(|name| state.users_by_name.get(name))
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    /// Issues a single-use token that lets `user_id` open one WebSocket to `session_id`.
    #[instrument(skip(self))]
    pub fn issue_ws_token(&self, user_id: &str, session_id: &str) -> Result<String, AuthError> {
        let mut state = self.write();
        if !state.names_by_id.contains_key(user_id) {
            return Err(AuthError::UserNotFound);
        }

        let now = Instant::now();
        state.ws_tokens.retain(|_, ticket| ticket.expires_at > now);

        let token = loop {
            let candidate = format!("{}{}", WS_TOKEN_PREFIX, random_token(TOKEN_LEN));
            if !state.ws_tokens.contains_key(&candidate) {
                break candidate;
            }
        };
        state.ws_tokens.insert(
            token.clone(),
            WsTicket {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                expires_at: now + self.ws_token_ttl,
            },
        );
        debug!("WebSocket token issued");
        Ok(token)
    }

    /// Redeems a WebSocket token for `session_id` and returns its user id.
    ///
    /// The token is consumed whatever the outcome.
    #[instrument(skip(self, token))]
    pub fn redeem_ws_token(&self, token: &str, session_id: &str) -> Result<PlayerId, AuthError> {
        let ticket = self
            .write()
            .ws_tokens
            .remove(token)
            .ok_or(AuthError::InvalidWsToken)?;

        if Instant::now() >= ticket.expires_at {
            warn!("WebSocket token expired");
            return Err(AuthError::WsTokenExpired);
        }
        if ticket.session_id != session_id {
            warn!(issued_for = %ticket.session_id, "WebSocket token used for another session");
            return Err(AuthError::WsTokenWrongGame {
                issued_for: ticket.session_id,
                requested: session_id.to_string(),
            });
        }

        debug!(user_id = %ticket.user_id, "WebSocket token redeemed");
        Ok(ticket.user_id)
    }
}

impl UserDirectory for AuthService {
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.read().names_by_id.get(user_id).cloned()
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
