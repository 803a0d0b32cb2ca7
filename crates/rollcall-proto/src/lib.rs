//! Rollcall wire protocol.
//!
//! The handshake protocol is a single exchange of JSON records over a raw
//! TCP connection: the client sends a [`ClientHandshake`] announcing its
//! identity and namespace, and the server answers with [`ServerResponse`]
//! records - a `"connect"` acknowledgment to the joining client and a
//! `"push"` notification to every other namespace member.
//!
//! Records use PascalCase field names on the wire. There is no framing or
//! length prefix: one read of at most [`MAX_HANDSHAKE_SIZE`] bytes is
//! treated as one complete record, which is only correct for single-packet
//! handshakes.

mod errors;
mod handshake;
mod response;
mod tags;

pub use errors::{ProtocolError, Result};
pub use handshake::{ClientHandshake, MAX_HANDSHAKE_SIZE, Payload};
pub use response::ServerResponse;
pub use tags::{ConnectionType, Status};
