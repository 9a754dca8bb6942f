//! Session and registry error types.

use crate::protocol::SessionId;
use derive_more::Display;

/// Errors from registry lookups and lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[display("session {} already exists", _0)]
    AlreadyExists(SessionId),

    /// No session is registered under this id.
    #[display("session {} not found", _0)]
    NotFound(SessionId),
}

impl std::error::Error for RegistryError {}

/// Errors from talking to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionError {
    /// The session loop has exited and accepts no more work.
    #[display("session is closed")]
    Closed,
}

impl std::error::Error for SessionError {}

/// A subscriber fell behind the outbound buffer and missed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("subscriber missed {} messages", skipped)]
pub struct Lagged {
    /// How many messages were overwritten before they were read.
    pub skipped: u64,
}

impl std::error::Error for Lagged {}
