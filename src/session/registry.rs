//! The id → session map.

use super::{RegistryError, Session, SessionOptions};
use crate::game::Game;
use crate::players::PlayerMapping;
use crate::protocol::SessionId;
use futures::future::join_all;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Length of generated session ids.
pub const SESSION_ID_LEN: usize = 5;

/// Creates, finds and tears down sessions.
///
/// Constructed explicitly and shared through an `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    options: SessionOptions,
}

impl Registry {
    /// Creates an empty registry whose sessions use `options`.
    #[instrument]
    pub fn new(options: SessionOptions) -> Self {
        info!("Creating session registry");
        Self {
            sessions: RwLock::new(HashMap::new()),
            options,
        }
    }

    /// Returns the channel sizes used for new sessions.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Registers a new session under `id` and starts its loop.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] if the id is taken; the
    /// existing session is left untouched.
    #[instrument(skip(self, game, mapping), fields(session_id = %id))]
    pub async fn create<G, M>(
        &self,
        id: SessionId,
        game: G,
        mapping: M,
    ) -> Result<Arc<Session>, RegistryError>
    where
        G: Game,
        M: PlayerMapping,
    {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            warn!("Session id already in use");
            return Err(RegistryError::AlreadyExists(id));
        }

        let session = Session::spawn(id.clone(), game, mapping, self.options);
        sessions.insert(id, Arc::clone(&session));
        info!(live_sessions = sessions.len(), "Session registered");
        Ok(session)
    }

    /// Generates a fresh id and registers the session built for it.
    ///
    /// The id is chosen and inserted under one write lock, so it cannot
    /// collide with a concurrent create.
    #[instrument(skip(self, build))]
    pub async fn create_with_unique_id<G, M, F>(&self, build: F) -> Arc<Session>
    where
        G: Game,
        M: PlayerMapping,
        F: FnOnce(&str) -> (G, M),
    {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = random_session_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            debug!(candidate = %candidate, "Generated id collided, retrying");
        };

        let (game, mapping) = build(&id);
        let session = Session::spawn(id.clone(), game, mapping, self.options);
        sessions.insert(id.clone(), Arc::clone(&session));
        info!(session_id = %id, live_sessions = sessions.len(), "Session registered");
        session
    }

    /// Looks up a live session.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Arc<Session>, RegistryError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Removes a session and waits for its loop to stop. No-op if absent.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.shutdown().await;
                info!("Session removed");
            }
            None => debug!("Session already gone"),
        }
    }

    /// Returns a random id not used by any live session.
    ///
    /// Another caller may claim the id before it is used; prefer
    /// [`create_with_unique_id`](Self::create_with_unique_id) when creating.
    pub async fn generate_unique_id(&self) -> SessionId {
        let sessions = self.sessions.read().await;
        loop {
            let candidate = random_session_id();
            if !sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Returns the ids of all live sessions, sorted.
    pub async fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes and shuts down every session.
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) {
        let drained: Vec<Arc<Session>> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();

        info!(count = drained.len(), "Shutting down all sessions");
        join_all(drained.iter().map(|session| session.shutdown())).await;
    }
}

fn random_session_id() -> SessionId {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| char::from(rng.gen_range(b'A'..=b'Z')))
        .collect()
}
