//! Environment abstraction for deterministic testing.
//!
//! Decouples the driver from system resources (wall clock, randomness) so
//! its behavior can be reproduced exactly under test with a seeded RNG and
//! a fixed clock.

use uuid::Uuid;

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee that `random_bytes()` uses
/// cryptographically secure entropy in production; connection ids and
/// session ids are derived from it and must be unguessable.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Wall-clock seconds since the Unix epoch.
    ///
    /// Stamped into outbound responses as the server timestamp. Clients
    /// treat it as opaque.
    fn wall_clock_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`, used for runtime session ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Mints a fresh connection id with v4 UUID layout.
    ///
    /// Minted once per physical connection; never reused across
    /// reconnects of the same user.
    fn mint_connection_id(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
