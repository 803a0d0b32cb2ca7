//! Per-connection handshake lifecycle.
//!
//! Each accepted socket advances through a two-state machine:
//!
//! ```text
//! ┌───────────────────┐  handshake resolved  ┌─────────────┐
//! │ AwaitingHandshake │─────────────────────>│ Established │
//! └───────────────────┘                      └─────────────┘
//!           │ read error / malformed record
//!           ↓
//!      ┌────────┐
//!      │ Failed │
//!      └────────┘
//! ```
//!
//! `Established` is terminal: no further record types are processed after
//! the handshake. Once established, the connection remembers which user
//! and connection id it admitted so teardown can retire exactly that
//! state and nothing else.

use crate::registry::ConnectionId;

/// Handshake progress of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Socket accepted, handshake record not yet processed
    AwaitingHandshake,
    /// Handshake resolved; terminal for this connection
    Established,
    /// Read error or malformed handshake; connection is being dropped
    Failed,
}

/// State for one accepted socket.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Current handshake progress
    state: HandshakeState,
    /// Remote endpoint, recorded at accept time
    remote_addr: String,
    /// User admitted over this connection, set on establishment
    user_id: Option<String>,
    /// Connection id minted for this socket, set on establishment
    connection_id: Option<ConnectionId>,
}

impl Connection {
    /// Create a connection awaiting its handshake.
    pub fn new(remote_addr: String) -> Self {
        Self { state: HandshakeState::AwaitingHandshake, remote_addr, user_id: None, connection_id: None }
    }

    /// Current handshake state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Remote endpoint the socket was accepted from.
    #[must_use]
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// User admitted over this connection. `None` before establishment.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Connection id minted for this socket. `None` before establishment.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    /// Transition to `Established`, binding the admitted user.
    ///
    /// Returns `false` if the connection is not awaiting a handshake;
    /// `Established` is terminal and a duplicate handshake must not
    /// rebind the connection.
    pub fn establish(&mut self, user_id: String, connection_id: ConnectionId) -> bool {
        if self.state != HandshakeState::AwaitingHandshake {
            return false;
        }

        self.state = HandshakeState::Established;
        self.user_id = Some(user_id);
        self.connection_id = Some(connection_id);
        true
    }

    /// Transition to `Failed`.
    pub fn fail(&mut self) {
        self.state = HandshakeState::Failed;
    }
}
