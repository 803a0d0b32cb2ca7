//! Outbound response record.
//!
//! The server sends two kinds of response: a `"connect"` acknowledgment to
//! the client that just completed its handshake, and a `"push"`
//! notification to every other member of the joined namespace. Both share
//! one record shape; the `connection_id` is interpreted per type - for an
//! ack it is the newly connected user's id, for a push it is the
//! originating (joining) user's id.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    handshake::Payload,
    tags::{ConnectionType, Status},
};

/// Response record sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerResponse {
    /// `"connect"` acknowledgment or `"push"` notification
    pub connection_type: ConnectionType,

    /// Namespace this response concerns
    pub namespace: String,

    /// Connection id of the recipient context: the acked user for a
    /// `"connect"`, the joining user for a `"push"`
    pub connection_id: String,

    /// Server timestamp, opaque to clients
    pub date_established: String,

    /// `"OK"` or an error code
    pub status: Status,

    /// Opaque application data
    #[serde(default)]
    pub payload: Payload,
}

impl ServerResponse {
    /// Build the acknowledgment for a completed `"connect"` handshake.
    #[must_use]
    pub fn connect_ack(namespace: &str, connection_id: &str, timestamp: &str) -> Self {
        Self {
            connection_type: ConnectionType::Connect,
            namespace: namespace.to_string(),
            connection_id: connection_id.to_string(),
            date_established: timestamp.to_string(),
            status: Status::Ok,
            payload: Payload::default(),
        }
    }

    /// Build the notification pushed to existing namespace members when a
    /// new member joins.
    #[must_use]
    pub fn push(namespace: &str, connection_id: &str, timestamp: &str) -> Self {
        Self {
            connection_type: ConnectionType::Push,
            namespace: namespace.to_string(),
            connection_id: connection_id.to_string(),
            date_established: timestamp.to_string(),
            status: Status::Ok,
            payload: Payload::default(),
        }
    }

    /// Serialize this record to its wire bytes.
    ///
    /// Deterministic for a given record: fields are written in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encoding` on serialization failure; not expected
    ///   for well-formed records
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encoding(e.to_string()))
    }
}
