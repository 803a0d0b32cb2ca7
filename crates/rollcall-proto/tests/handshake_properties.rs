//! Property-based tests for handshake decoding.
//!
//! Verifies the codec is total over attacker-controlled input and faithful
//! for all well-formed records, not just hand-picked examples.

use proptest::prelude::*;
use rollcall_proto::{ClientHandshake, ConnectionType, MAX_HANDSHAKE_SIZE};

/// Strategy for namespace and user id strings as clients actually send
/// them: short, printable, occasionally empty.
fn wire_string() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{0,24}"
}

#[test]
fn prop_decode_never_panics_on_arbitrary_bytes() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..MAX_HANDSHAKE_SIZE))| {
        // PROPERTY: decode is total - malformed input becomes an error,
        // never a panic.
        let _ = ClientHandshake::decode(&bytes);
    });
}

#[test]
fn prop_decode_extracts_fields_from_well_formed_records() {
    proptest!(|(
        namespace in wire_string(),
        user_id in wire_string(),
        tag in "[a-z]{1,12}",
    )| {
        let record = serde_json::json!({
            "Protocol": "rollcall/1",
            "ConnectionType": tag,
            "Namespace": namespace,
            "DateEstablished": "0",
            "UserId": user_id,
        });
        let bytes = serde_json::to_vec(&record).unwrap();

        let handshake = ClientHandshake::decode(&bytes).unwrap();

        prop_assert_eq!(&handshake.namespace, &namespace);
        prop_assert_eq!(&handshake.user_id, &user_id);
        // PROPERTY: the tag survives decoding verbatim, known or not.
        prop_assert_eq!(handshake.connection_type.as_str(), tag.as_str());
    });
}

#[test]
fn prop_unknown_tags_round_trip_unchanged() {
    proptest!(|(tag in "[a-z]{1,12}")| {
        let parsed = ConnectionType::from(tag.clone());
        prop_assert_eq!(String::from(parsed), tag);
    });
}
