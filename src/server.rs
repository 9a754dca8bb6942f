//! HTTP and WebSocket boundary.
//!
//! Routes:
//! - `POST /auth/register`, `POST /auth/login`, `POST /auth/logout`, `GET /auth/me`
//! - `POST /auth/ws-token/{game_id}`
//! - `POST /api/new_game/tictactoe`
//! - `GET /api/game/{game_id}/metadata`, `GET /api/game/{game_id}/models`
//! - `DELETE /api/game/{game_id}`
//! - `GET /ws/game/{game_id}?token=...`

use crate::auth::{AuthError, AuthService};
use crate::config::ServerConfig;
use crate::connection::run_connection;
use crate::games::TicTacToe;
use crate::games::tictactoe::PLAYER_COUNT;
use crate::players::SeatMapping;
use crate::protocol::{PlayerId, Response, ResponseKind};
use crate::session::{Registry, RegistryError, SESSION_ID_LEN, Session};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use derive_more::Display;
use futures::{SinkExt, StreamExt, future};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::pin::pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, instrument, warn};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: Arc<Registry>,
    /// Accounts and tokens.
    pub auth: Arc<AuthService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled on shutdown; every connection holds a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds fresh state from configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(Registry::new(config.session_options())),
            auth: Arc::new(AuthService::new(config.ws_token_ttl())),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }
}

/// An error returned to HTTP clients as an `error` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ApiError {
    /// 400.
    #[display("{}", _0)]
    BadRequest(String),
    /// 401.
    #[display("{}", _0)]
    Unauthorized(String),
    /// 404.
    #[display("{}", _0)]
    NotFound(String),
    /// 409.
    #[display("{}", _0)]
    Conflict(String),
    /// 500.
    #[display("{}", _0)]
    Internal(String),
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(Response::error(self.to_string()))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Self::NotFound("Game not found".to_string()),
            RegistryError::AlreadyExists(_) => Self::Conflict(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::BadRequest(err.to_string()),
            AuthError::UsernameTaken => Self::Conflict(err.to_string()),
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::Hashing(_) => Self::Internal(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidWsToken
            | AuthError::WsTokenExpired
            | AuthError::WsTokenWrongGame { .. } => Self::Unauthorized(err.to_string()),
        }
    }
}

/// The raw bearer token from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))
    }
}

/// A request carrying a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The caller's user id.
    pub user_id: PlayerId,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user_id = state.auth.validate_token(&token)?;
        Ok(Self { user_id })
    }
}

/// Username and password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plain password.
    pub password: String,
}

/// Query string of the WebSocket endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    /// Single-use token from `/auth/ws-token/{game_id}`.
    pub token: Option<String>,
}

/// Returns true for ids of exactly five uppercase ASCII letters.
pub fn is_valid_game_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| b.is_ascii_uppercase())
}

fn check_game_id(id: &str) -> Result<(), ApiError> {
    if is_valid_game_id(id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid game ID".to_string()))
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/ws-token/{game_id}", post(ws_token));

    let api_routes = Router::new()
        .route("/new_game/tictactoe", post(new_tictactoe))
        .route("/game/{game_id}/metadata", get(game_metadata))
        .route("/game/{game_id}/models", get(game_models))
        .route("/game/{game_id}", delete(delete_game));

    let mut app = Router::new()
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .route("/ws/game/{game_id}", get(game_socket));

    if let Some(dir) = state.config.static_dir() {
        info!(dir = %dir.display(), "Serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    let production = *state.config.production();
    let app = app.with_state(state);
    if production {
        app
    } else {
        app.layer(CorsLayer::permissive())
    }
}

/// Serves until Ctrl-C, then cancels every connection and shuts every session down.
#[instrument(skip(config), fields(addr = %config.bind_address()))]
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(config);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(state.config.bind_address()).await?;
    info!("Server ready");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    state.registry.shutdown_all().await;
    info!("Server stopped");
    Ok(())
}

async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Response>, ApiError> {
    let auth = Arc::clone(&state.auth);
    let (token, user_id) = tokio::task::spawn_blocking(move || {
        auth.register(&credentials.username, &credentials.password)?;
        auth.login(&credentials.username, &credentials.password)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(auth_response(token, user_id)))
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Response>, ApiError> {
    let auth = Arc::clone(&state.auth);
    let (token, user_id) =
        tokio::task::spawn_blocking(move || auth.login(&credentials.username, &credentials.password))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(auth_response(token, user_id)))
}

fn auth_response(token: String, user_id: PlayerId) -> Response {
    Response {
        kind: ResponseKind::Simple,
        parameters: json!({ "token": token, "user_id": user_id }),
    }
}

async fn logout(State(state): State<AppState>, BearerToken(token): BearerToken) -> Json<Response> {
    state.auth.logout(&token);
    Json(Response::simple("Logged out"))
}

async fn me(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<Response>, ApiError> {
    let user = state.auth.user(&caller.user_id)?;
    Ok(Json(Response {
        kind: ResponseKind::Simple,
        parameters: json!({ "user_id": user.id(), "username": user.username() }),
    }))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user_id))]
async fn ws_token(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(game_id): Path<String>,
) -> Result<Json<Response>, ApiError> {
    check_game_id(&game_id)?;
    let token = state.auth.issue_ws_token(&caller.user_id, &game_id)?;
    info!("WebSocket token generated");
    Ok(Json(Response {
        kind: ResponseKind::Simple,
        parameters: json!({ "ws_token": token }),
    }))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user_id))]
async fn new_tictactoe(State(state): State<AppState>, caller: Authenticated) -> Json<Response> {
    let directory = Arc::clone(&state.auth);
    let session = state
        .registry
        .create_with_unique_id(|_| (TicTacToe::new(), SeatMapping::new(PLAYER_COUNT, directory)))
        .await;
    info!(session_id = %session.id(), "Game created");
    Json(Response::simple(session.id().clone()))
}

async fn find_session(state: &AppState, game_id: &str) -> Result<Arc<Session>, ApiError> {
    check_game_id(game_id)?;
    Ok(state.registry.get(game_id).await?)
}

async fn game_metadata(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(game_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = find_session(&state, &game_id).await?;
    Ok(Json(session.metadata().clone()))
}

async fn game_models(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(game_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = find_session(&state, &game_id).await?;
    Ok(Json(json!(session.ai_types())))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user_id))]
async fn delete_game(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(game_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    find_session(&state, &game_id).await?;
    state.registry.remove(&game_id).await;
    info!("Game deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query, upgrade))]
async fn game_socket(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(query): Query<WsQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<axum::response::Response, ApiError> {
    check_game_id(&game_id)?;
    let token = query
        .token
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".to_string()))?;
    let user_id = state.auth.redeem_ws_token(&token, &game_id)?;
    let session = state.registry.get(&game_id).await?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            warn!(error = %rejection, "Not a WebSocket upgrade");
            return Ok(rejection.into_response());
        }
    };

    info!(user_id = %user_id, "Upgrading to WebSocket");
    let cancel = state.shutdown.child_token();
    Ok(upgrade.on_upgrade(move |socket| serve_socket(socket, session, user_id, cancel)))
}

async fn serve_socket(
    socket: WebSocket,
    session: Arc<Session>,
    user_id: PlayerId,
    cancel: CancellationToken,
) {
    let (sink, stream) = socket.split();

    let incoming = stream
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });
    let outgoing =
        sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text.into()))));

    let reason = run_connection(session, user_id, pin!(incoming), pin!(outgoing), cancel).await;
    debug!(reason = %reason, "WebSocket closed");
}
