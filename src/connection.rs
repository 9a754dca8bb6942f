//! Bridges one client transport to one session.
//!
//! The adapter is transport-agnostic: anything that yields text frames and
//! accepts text frames can be plugged in. The WebSocket handler in
//! [`server`](crate::server) is one such transport; tests use in-memory
//! channels.

use crate::protocol::{ActionMessage, PlayerId, Request};
use crate::session::{Session, SessionEvents};
use derive_more::Display;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Disconnect {
    /// The client closed the transport.
    #[display("transport closed")]
    TransportClosed,
    /// Reading from the transport failed.
    #[display("read failed")]
    ReadFailed,
    /// Writing to the transport failed.
    #[display("write failed")]
    WriteFailed,
    /// The session shut down.
    #[display("session closed")]
    SessionClosed,
    /// The connection's cancellation token fired.
    #[display("cancelled")]
    Cancelled,
    /// The player fell behind the session's outbound buffer and missed messages.
    ///
    /// The client should reconnect to receive a fresh snapshot.
    #[display("lagged")]
    Lagged,
}

/// Pumps frames between a transport and a session until either side ends.
///
/// Subscribes before announcing the player, so the connect snapshot is
/// always delivered. Inbound frames are decoded as [`Request`]s and
/// submitted under `player`; malformed frames are logged and dropped.
/// Outbound messages are forwarded only when broadcast or addressed to
/// `player`. A connection that falls behind the outbound buffer is closed
/// with [`Disconnect::Lagged`] instead of silently skipping messages.
/// Whatever ends the connection, the session is told the player
/// disconnected.
#[instrument(skip_all, fields(session_id = %session.id(), player_id = %player))]
pub async fn run_connection<S, E, K>(
    session: Arc<Session>,
    player: PlayerId,
    incoming: S,
    outgoing: K,
    cancel: CancellationToken,
) -> Disconnect
where
    S: Stream<Item = Result<String, E>> + Unpin,
    E: std::fmt::Display,
    K: Sink<String> + Unpin,
    K::Error: std::fmt::Display,
{
    let events = session.outbound();
    if session.connected(player.clone()).await.is_err() {
        warn!("Session closed before connection was announced");
        return Disconnect::SessionClosed;
    }
    info!("Connection opened");

    let reason = tokio::select! {
        biased;
        _ = cancel.cancelled() => Disconnect::Cancelled,
        reason = pump_inbound(&session, &player, incoming) => reason,
        reason = pump_outbound(events, &player, outgoing) => reason,
    };

    if session.disconnected(player.clone()).await.is_err() {
        debug!("Session already closed at disconnect");
    }
    info!(reason = %reason, "Connection closed");
    reason
}

async fn pump_inbound<S, E>(session: &Session, player: &PlayerId, mut incoming: S) -> Disconnect
where
    S: Stream<Item = Result<String, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(frame) = incoming.next().await {
        let text = match frame {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Transport read failed");
                return Disconnect::ReadFailed;
            }
        };

        let request: Request = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Dropping malformed request");
                continue;
            }
        };

        debug!(category = %request.category, function = %request.function, "Request received");
        if session
            .submit(ActionMessage::new(player.clone(), request))
            .await
            .is_err()
        {
            return Disconnect::SessionClosed;
        }
    }
    Disconnect::TransportClosed
}

async fn pump_outbound<K>(mut events: SessionEvents, player: &PlayerId, mut outgoing: K) -> Disconnect
where
    K: Sink<String> + Unpin,
    K::Error: std::fmt::Display,
{
    loop {
        let message = match events.recv().await {
            Ok(Some(message)) => message,
            Ok(None) => return Disconnect::SessionClosed,
            Err(lagged) => {
                warn!(skipped = lagged.skipped, "Dropping connection that fell behind");
                return Disconnect::Lagged;
            }
        };
        if !message.addressee.includes(player) {
            continue;
        }

        let text = match serde_json::to_string(&message.response) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode response");
                continue;
            }
        };

        if let Err(e) = outgoing.send(text).await {
            debug!(error = %e, "Transport write failed");
            return Disconnect::WriteFailed;
        }
    }
}
