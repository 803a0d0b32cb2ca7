//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` backs the production server with real wall-clock time and
//! OS cryptographic randomness. Behavior is non-deterministic; tests use
//! seeded environments instead.

use crate::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// Uses `std::time::SystemTime` for wall-clock timestamps and getrandom
/// for randomness (e.g., /dev/urandom on Linux, `BCryptGenRandom` on
/// Windows). Suitable for minting session and connection ids.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional - a server that cannot
/// mint unguessable connection ids cannot operate securely, and RNG
/// failure indicates OS-level issues.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)")
            .as_secs()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - server cannot operate securely");
    }
}
