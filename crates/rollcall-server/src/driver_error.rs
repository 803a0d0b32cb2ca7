//! Driver error types.

use std::fmt;

/// Errors that can occur during driver event processing.
#[derive(Debug)]
pub enum DriverError {
    /// Session not found in the connection table.
    ///
    /// A handshake or close event referenced a session the driver never
    /// admitted, or one that was already torn down. May be transient if
    /// the session was just disconnected; the client should reconnect.
    SessionNotFound(u64),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
        }
    }
}

impl std::error::Error for DriverError {}
