//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The bytes are not a well-formed handshake record.
    ///
    /// Fatal for that connection attempt only. The server logs and drops
    /// the connection; other connections are unaffected.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    /// Handshake exceeds the fixed read buffer bound.
    ///
    /// Callers must keep handshakes within [`MAX_HANDSHAKE_SIZE`]; larger
    /// records would be truncated by the read buffer and fail decoding
    /// anyway. Rejected up front.
    ///
    /// [`MAX_HANDSHAKE_SIZE`]: crate::MAX_HANDSHAKE_SIZE
    #[error("handshake of {size} bytes exceeds limit of {max}")]
    HandshakeTooLarge {
        /// Actual record size in bytes
        size: usize,
        /// Maximum accepted size in bytes
        max: usize,
    },

    /// A response record failed to serialize.
    ///
    /// Should not occur for well-formed records. Logged and the delivery
    /// to that one recipient is skipped.
    #[error("failed to encode response: {0}")]
    Encoding(String),
}
