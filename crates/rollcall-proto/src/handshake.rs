//! Inbound handshake record.
//!
//! The first (and in this protocol, only) record a client sends after
//! opening its TCP connection. The server reads at most
//! [`MAX_HANDSHAKE_SIZE`] bytes in a single read and decodes them as one
//! complete JSON record.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    tags::ConnectionType,
};

/// Maximum handshake record size in bytes.
///
/// Bounds the server's fixed read buffer. A handshake larger than this is
/// truncated at the socket and can never decode, so oversized input is
/// rejected before parsing.
pub const MAX_HANDSHAKE_SIZE: usize = 1024;

/// Opaque application data slot carried by handshakes and responses.
///
/// The core never inspects the contents; the single `Data` field accepts
/// any JSON value and defaults to `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payload {
    /// Application data, opaque to the server
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Handshake record sent by a connecting client.
///
/// `connection_type`, `namespace`, and `user_id` are required; `protocol`
/// and `date_established` are opaque and unchecked in this scope, so a
/// record that omits them still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientHandshake {
    /// Protocol identifier, unchecked
    #[serde(default)]
    pub protocol: String,

    /// `"connect"` triggers the join-and-notify path; other tags are
    /// accepted but unhandled
    pub connection_type: ConnectionType,

    /// Namespace the user is joining
    pub namespace: String,

    /// Client-asserted timestamp, opaque
    #[serde(default)]
    pub date_established: String,

    /// Stable client-supplied identity
    pub user_id: String,

    /// Opaque application data
    #[serde(default)]
    pub payload: Payload,
}

impl ClientHandshake {
    /// Decode a handshake record from the bytes of a single read.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HandshakeTooLarge` if the input exceeds
    ///   [`MAX_HANDSHAKE_SIZE`]
    /// - `ProtocolError::MalformedHandshake` if the bytes are not a
    ///   well-formed record for the expected schema
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_HANDSHAKE_SIZE {
            return Err(ProtocolError::HandshakeTooLarge {
                size: bytes.len(),
                max: MAX_HANDSHAKE_SIZE,
            });
        }

        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedHandshake(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_well_formed_handshake() {
        let raw = br#"{
            "Protocol": "rollcall/1",
            "ConnectionType": "connect",
            "Namespace": "lobby",
            "DateEstablished": "1754400000",
            "UserId": "alice",
            "Payload": {"Data": null}
        }"#;

        let handshake = ClientHandshake::decode(raw).unwrap();
        assert_eq!(handshake.connection_type, ConnectionType::Connect);
        assert_eq!(handshake.namespace, "lobby");
        assert_eq!(handshake.user_id, "alice");
        assert_eq!(handshake.payload.data, serde_json::Value::Null);
    }

    #[test]
    fn decode_tolerates_missing_opaque_fields() {
        let raw = br#"{"ConnectionType": "connect", "Namespace": "lobby", "UserId": "alice"}"#;

        let handshake = ClientHandshake::decode(raw).unwrap();
        assert_eq!(handshake.protocol, "");
        assert_eq!(handshake.date_established, "");
        assert_eq!(handshake.payload, Payload::default());
    }

    #[test]
    fn decode_preserves_unknown_connection_type() {
        let raw = br#"{"ConnectionType": "relay", "Namespace": "lobby", "UserId": "alice"}"#;

        let handshake = ClientHandshake::decode(raw).unwrap();
        assert_eq!(handshake.connection_type, ConnectionType::Other("relay".to_string()));
    }

    #[test]
    fn decode_rejects_missing_user_id() {
        let raw = br#"{"ConnectionType": "connect", "Namespace": "lobby"}"#;

        let err = ClientHandshake::decode(raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedHandshake(_)));
    }

    #[test]
    fn decode_rejects_truncated_record() {
        let raw = br#"{"ConnectionType": "connect", "Namespace": "lob"#;

        let err = ClientHandshake::decode(raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedHandshake(_)));
    }

    #[test]
    fn decode_rejects_non_json_input() {
        let err = ClientHandshake::decode(b"not a record").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedHandshake(_)));
    }

    #[test]
    fn decode_rejects_oversized_input() {
        let raw = vec![b'x'; MAX_HANDSHAKE_SIZE + 1];

        let err = ClientHandshake::decode(&raw).unwrap_err();
        assert_eq!(err, ProtocolError::HandshakeTooLarge {
            size: MAX_HANDSHAKE_SIZE + 1,
            max: MAX_HANDSHAKE_SIZE,
        });
    }

    #[test]
    fn decode_carries_application_payload() {
        let raw = br#"{
            "ConnectionType": "connect",
            "Namespace": "lobby",
            "UserId": "alice",
            "Payload": {"Data": {"client": "cli", "version": 2}}
        }"#;

        let handshake = ClientHandshake::decode(raw).unwrap();
        assert_eq!(handshake.payload.data["client"], "cli");
        assert_eq!(handshake.payload.data["version"], 2);
    }
}
