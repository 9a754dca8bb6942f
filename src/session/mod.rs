//! Session actors and the registry that owns them.
//!
//! A [`Session`] is the handle: it holds the sending half of the session's
//! bounded command queue, the outbound broadcast channel and the shutdown
//! signal. The [`SessionActor`] holds the game and seat mapping and runs on
//! its own task.

mod actor;
mod error;
mod registry;

pub use actor::SessionActor;
pub use error::{Lagged, RegistryError, SessionError};
pub use registry::{Registry, SESSION_ID_LEN};

use crate::game::Game;
use crate::players::PlayerMapping;
use crate::protocol::{ActionMessage, PlayerId, SessionId, StateMessage};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Default capacity of a session's inbound command queue.
pub const DEFAULT_ACTION_QUEUE_CAPACITY: usize = 16;

/// Default capacity of a session's outbound broadcast channel.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 16;

/// Work delivered to a session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A player action.
    Action(ActionMessage),
    /// A connection for this player was opened.
    Connected(PlayerId),
    /// A connection for this player was closed.
    Disconnected(PlayerId),
}

/// Channel sizes for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize, derive_new::new)]
pub struct SessionOptions {
    /// Inbound queue capacity; submitters wait when it is full.
    action_queue_capacity: usize,
    /// Outbound buffer per subscriber before it starts skipping.
    outbound_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            action_queue_capacity: DEFAULT_ACTION_QUEUE_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Handle to a running game session.
pub struct Session {
    id: SessionId,
    game_type: &'static str,
    metadata: serde_json::Value,
    ai_types: BTreeMap<String, String>,
    inbound: mpsc::Sender<Command>,
    outbound: broadcast::Sender<StateMessage>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("game_type", &self.game_type)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    /// Builds a session handle and its actor without starting the loop.
    ///
    /// The caller is responsible for running [`SessionActor::run`] and
    /// handing the task back through [`Session::attach`]. Most callers want
    /// [`Session::spawn`].
    #[instrument(skip(game, mapping), fields(session_id = %id))]
    pub fn new<G, M>(
        id: SessionId,
        game: G,
        mapping: M,
        options: SessionOptions,
    ) -> (Self, SessionActor)
    where
        G: Game,
        M: PlayerMapping,
    {
        let (inbound_tx, inbound_rx) = mpsc::channel(options.action_queue_capacity.max(1));
        let (outbound_tx, _) = broadcast::channel(options.outbound_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Self {
            id: id.clone(),
            game_type: game.game_type(),
            metadata: game.metadata(),
            ai_types: game.ai_types(),
            inbound: inbound_tx,
            outbound: outbound_tx.clone(),
            shutdown: shutdown_tx,
            task: Mutex::new(None),
        };
        let actor = SessionActor::new(
            id,
            Box::new(game),
            Box::new(mapping),
            inbound_rx,
            outbound_tx,
            shutdown_rx,
        );
        debug!(game_type = session.game_type, "Session built");
        (session, actor)
    }

    /// Builds a session and spawns its loop on the current runtime.
    pub fn spawn<G, M>(id: SessionId, game: G, mapping: M, options: SessionOptions) -> Arc<Self>
    where
        G: Game,
        M: PlayerMapping,
    {
        let (mut session, actor) = Self::new(id, game, mapping, options);
        *session.task.get_mut() = Some(tokio::spawn(actor.run()));
        info!(session_id = %session.id, "Session spawned");
        Arc::new(session)
    }

    /// Records the task running this session's actor so [`shutdown`](Self::shutdown) can wait for it.
    pub async fn attach(&self, handle: JoinHandle<()>) {
        *self.task.lock().await = Some(handle);
    }

    /// Returns the session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the hosted game's type identifier.
    pub fn game_type(&self) -> &'static str {
        self.game_type
    }

    /// Returns the game metadata captured at creation.
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// Returns the AI archetypes the game supports.
    pub fn ai_types(&self) -> &BTreeMap<String, String> {
        &self.ai_types
    }

    /// Returns true once shutdown has been requested or the loop is gone.
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.inbound.is_closed()
    }

    /// Queues a player action.
    ///
    /// Waits while the queue is full. Fails with [`SessionError::Closed`]
    /// once the session is shutting down.
    #[instrument(skip(self, action), fields(session_id = %self.id, player_id = %action.sender))]
    pub async fn submit(&self, action: ActionMessage) -> Result<(), SessionError> {
        self.send(Command::Action(action)).await
    }

    /// Tells the session a connection for `player` opened.
    pub async fn connected(&self, player: PlayerId) -> Result<(), SessionError> {
        self.send(Command::Connected(player)).await
    }

    /// Tells the session a connection for `player` closed.
    pub async fn disconnected(&self, player: PlayerId) -> Result<(), SessionError> {
        self.send(Command::Disconnected(player)).await
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        if *self.shutdown.borrow() {
            return Err(SessionError::Closed);
        }
        self.inbound.send(command).await.map_err(|_| {
            debug!(session_id = %self.id, "Session loop gone");
            SessionError::Closed
        })
    }

    /// Subscribes to everything the session publishes from now on.
    pub fn outbound(&self) -> SessionEvents {
        SessionEvents {
            session_id: self.id.clone(),
            messages: self.outbound.subscribe(),
            shutdown: self.shutdown.subscribe(),
        }
    }

    /// Stops the loop and waits for it to exit. Safe to call repeatedly.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        // Held across the join so concurrent callers also wait for the exit.
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session task ended abnormally");
            }
            info!("Session shut down");
        }
    }
}

/// A subscription to a session's outbound messages.
#[derive(Debug)]
pub struct SessionEvents {
    session_id: SessionId,
    messages: broadcast::Receiver<StateMessage>,
    shutdown: watch::Receiver<bool>,
}

impl SessionEvents {
    /// Returns the next message, or `None` once the session has shut down.
    ///
    /// Messages already published are delivered before `None`. A subscriber
    /// that falls behind by more than the outbound capacity gets [`Lagged`]
    /// once; it has lost messages and should resynchronise from a fresh
    /// snapshot rather than keep reading.
    pub async fn recv(&mut self) -> Result<Option<StateMessage>, Lagged> {
        tokio::select! {
            biased;

            result = self.messages.recv() => match result {
                Ok(message) => Ok(Some(message)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %self.session_id, skipped, "Subscriber lagged");
                    Err(Lagged { skipped })
                }
                Err(RecvError::Closed) => Ok(None),
            },

            _ = self.shutdown.wait_for(|stopped| *stopped) => Ok(None),
        }
    }
}
