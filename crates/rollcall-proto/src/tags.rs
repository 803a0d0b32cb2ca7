//! String-tagged record fields.
//!
//! The wire format carries connection types and statuses as plain strings.
//! Unknown connection types must survive a decode/encode round-trip
//! unchanged - clients may send tags this server does not handle yet, and
//! those are accepted as no-ops rather than rejected.

use serde::{Deserialize, Serialize};

/// Connection type tag of a handshake or response record.
///
/// `"connect"` triggers the join-and-notify path. Any other inbound value
/// is accepted but unhandled, preserved as [`ConnectionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionType {
    /// Join handshake (inbound) or its acknowledgment (outbound)
    Connect,
    /// Membership notification pushed to existing namespace members
    Push,
    /// Unrecognized tag, kept verbatim
    Other(String),
}

impl ConnectionType {
    /// Wire representation of this tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Push => "push",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ConnectionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "connect" => Self::Connect,
            "push" => Self::Push,
            _ => Self::Other(value),
        }
    }
}

impl From<ConnectionType> for String {
    fn from(value: ConnectionType) -> Self {
        match value {
            ConnectionType::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

/// Status code of a response record.
///
/// `"OK"` in normal operation; any other string is an error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Request handled successfully
    Ok,
    /// Error code
    Error(String),
}

impl Status {
    /// Wire representation of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Error(code) => code,
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "OK" => Self::Ok,
            _ => Self::Error(value),
        }
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        match value {
            Status::Ok => "OK".to_string(),
            Status::Error(code) => code,
        }
    }
}
