//! Rollcall presence server.
//!
//! Tracks which users belong to which namespace over raw TCP: a client
//! opens a connection, sends one JSON handshake announcing its identity
//! and namespace, and existing namespace members are notified of the
//! join with a `"push"` record.
//!
//! # Architecture
//!
//! The crate follows a Sans-IO split. The [`ServerDriver`] processes
//! [`ServerEvent`]s (connection accepted, handshake received, connection
//! closed) against the authoritative registries and returns
//! [`ServerAction`]s; [`Server`] executes those actions against live
//! sockets using Tokio. All registry access happens inside the driver
//! behind a single lock, so concurrent connection handlers can never
//! mutate shared maps unsynchronized.
//!
//! # Components
//!
//! - [`ServerDriver`]: event-based orchestrator (pure logic, no I/O)
//! - [`UserRegistry`] / [`NamespaceRegistry`]: authoritative presence maps
//! - [`Server`]: production runtime executing driver actions
//! - [`TcpTransport`]: TCP listener and connection acceptor
//! - [`SystemEnv`]: production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod driver;
mod driver_error;
mod env;
mod error;
mod registry;
mod system_env;
mod transport;

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

pub use connection::{Connection, HandshakeState};
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use driver_error::DriverError;
pub use env::Environment;
pub use error::ServerError;
pub use registry::{Admission, ConnectionId, NamespaceRegistry, User, UserRegistry};
use rollcall_proto::{ClientHandshake, MAX_HANDSHAKE_SIZE};
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::tcp::OwnedWriteHalf,
    sync::{Mutex, RwLock},
};
pub use transport::{TcpConnection, TcpTransport};

/// Default time allowed for a client to complete its handshake.
///
/// Bounds the handshake read so a client that never sends its record
/// cannot hold a pending slot forever.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for all connections.
///
/// Holds the socket write half for each session. All records to a client
/// go through its single writer, preserving write ordering per
/// connection.
struct SharedState {
    /// Map of session id to socket write half
    writers: RwLock<HashMap<u64, Mutex<OwnedWriteHalf>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Time allowed for a client to complete its handshake
    pub handshake_timeout: Duration,
    /// Driver configuration (connection limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            driver: DriverConfig::default(),
        }
    }
}

/// Production rollcall server.
///
/// Wraps `ServerDriver` with TCP transport and the system environment.
pub struct Server {
    /// The event-based server driver
    driver: ServerDriver<SystemEnv>,
    /// TCP listener
    transport: TcpTransport,
    /// Environment
    env: SystemEnv,
    /// Handshake read bound
    handshake_timeout: Duration,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);

        let transport = TcpTransport::bind(&config.bind_address).await?;

        Ok(Self { driver, transport, env, handshake_timeout: config.handshake_timeout })
    }

    /// Run the server, accepting connections and processing handshakes.
    ///
    /// This method runs until the server is shut down or an error occurs.
    /// Accept errors are logged and the loop continues; only listener
    /// setup is fatal.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let env = self.env;
        let handshake_timeout = self.handshake_timeout;
        let driver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState { writers: RwLock::new(HashMap::new()) });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, driver, shared, env, handshake_timeout).await
                        {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single TCP connection.
///
/// Reads the handshake (one read of a fixed-size buffer, bounded by the
/// handshake timeout), feeds the driver, then lingers until the peer
/// closes so membership can be torn down.
async fn handle_connection(
    conn: TcpConnection,
    driver: Arc<Mutex<ServerDriver<SystemEnv>>>,
    shared: Arc<SharedState>,
    env: SystemEnv,
    handshake_timeout: Duration,
) -> Result<(), ServerError> {
    let session_id = env.random_u64();
    let remote_addr = conn.remote_addr();

    tracing::debug!("New connection {} from {}", session_id, remote_addr);

    let (mut reader, writer) = conn.into_split();

    {
        let mut writers = shared.writers.write().await;
        writers.insert(session_id, Mutex::new(writer));
    }

    {
        let mut driver = driver.lock().await;
        let actions = driver.process_event(ServerEvent::ConnectionAccepted {
            session_id,
            remote_addr: remote_addr.to_string(),
        })?;
        execute_actions(&mut *driver, actions, &shared).await;

        if !driver.has_session(session_id) {
            // Admission refused; the writer was already torn down
            return Ok(());
        }
    }

    let mut buf = vec![0u8; MAX_HANDSHAKE_SIZE];

    let bytes_read = match tokio::time::timeout(handshake_timeout, reader.read(&mut buf)).await {
        Ok(Ok(0)) => {
            return teardown(&driver, &shared, session_id, "closed before handshake").await;
        },
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            return teardown(&driver, &shared, session_id, &format!("handshake read failed: {e}"))
                .await;
        },
        Err(_) => {
            return teardown(&driver, &shared, session_id, "handshake timed out").await;
        },
    };

    let handshake = match ClientHandshake::decode(&buf[..bytes_read]) {
        Ok(handshake) => handshake,
        Err(e) => {
            // No error response is defined for a malformed handshake; the
            // connection is dropped silently from the client's view.
            tracing::warn!("Dropping connection {}: {}", session_id, e);
            return teardown(&driver, &shared, session_id, "malformed handshake").await;
        },
    };

    {
        let mut driver_guard = driver.lock().await;
        match driver_guard.process_event(ServerEvent::HandshakeReceived { session_id, handshake }) {
            Ok(actions) => execute_actions(&mut *driver_guard, actions, &shared).await,
            Err(e) => {
                drop(driver_guard);
                teardown(&driver, &shared, session_id, "driver rejected handshake").await?;
                return Err(e.into());
            },
        }
    }

    // The handshake is the only record this server processes; linger so
    // the peer's close is observed and membership torn down.
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::trace!("Discarding {} post-handshake bytes from {}", n, session_id);
            },
            Err(e) => {
                tracing::debug!("Connection {} read error: {}", session_id, e);
                break;
            },
        }
    }

    teardown(&driver, &shared, session_id, "connection closed").await
}

/// Retire a session: drop its writer and let the driver tear down any
/// registry state the session still owns.
async fn teardown(
    driver: &Arc<Mutex<ServerDriver<SystemEnv>>>,
    shared: &Arc<SharedState>,
    session_id: u64,
    reason: &str,
) -> Result<(), ServerError> {
    {
        let mut writers = shared.writers.write().await;
        writers.remove(&session_id);
    }

    let mut driver = driver.lock().await;
    let actions = driver.process_event(ServerEvent::ConnectionClosed {
        session_id,
        reason: reason.to_string(),
    })?;
    execute_actions(&mut *driver, actions, shared).await;

    Ok(())
}

/// Execute server actions.
async fn execute_actions(
    driver: &mut ServerDriver<SystemEnv>,
    actions: Vec<ServerAction>,
    shared: &Arc<SharedState>,
) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, response } => {
                let encoded = match response.encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("Failed to encode response for {}: {}", session_id, e);
                        continue;
                    },
                };

                let writers = shared.writers.read().await;
                if let Some(writer) = writers.get(&session_id) {
                    let mut writer = writer.lock().await;
                    if let Err(e) = writer.write_all(&encoded).await {
                        tracing::warn!("SendToSession write failed for {}: {}", session_id, e);
                    }
                } else {
                    tracing::warn!("SendToSession: session {} not found", session_id);
                }
            },

            ServerAction::Broadcast { namespace, exclude_user, response } => {
                // Point-in-time membership snapshot; in-flight joins may
                // or may not be included, no ordering is guaranteed
                // across concurrent joins.
                let peers = driver.members_except(&namespace, &exclude_user);
                if peers.is_empty() {
                    continue;
                }

                let encoded = match response.encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("Failed to encode push for {}: {}", namespace, e);
                        continue;
                    },
                };

                let shared = Arc::clone(shared);
                tokio::spawn(async move {
                    deliver_push(&shared, &namespace, peers, &encoded).await;
                });
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                let mut writers = shared.writers.write().await;
                if let Some(writer) = writers.remove(&session_id) {
                    let mut writer = writer.into_inner();
                    if let Err(e) = writer.shutdown().await {
                        tracing::debug!("Shutdown of {} failed: {}", session_id, e);
                    }
                }
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

/// Deliver one encoded push to each peer in sequence.
///
/// A failed or missing writer affects that recipient only; delivery
/// continues to the remaining peers.
async fn deliver_push(shared: &SharedState, namespace: &str, peers: Vec<User>, encoded: &[u8]) {
    let writers = shared.writers.read().await;

    for peer in peers {
        let Some(writer) = writers.get(&peer.session_id) else {
            tracing::debug!("Push skipped for {}: session gone", peer.user_id);
            continue;
        };

        let mut writer = writer.lock().await;
        if let Err(e) = writer.write_all(encoded).await {
            tracing::warn!("Push to {} in namespace {} failed: {}", peer.user_id, namespace, e);
        }
    }
}
