//! Server driver.
//!
//! Ties together per-connection handshake state, the user registry, and
//! the namespace registry. The driver is pure logic: the runtime feeds it
//! [`ServerEvent`]s and executes the [`ServerAction`]s it returns, so
//! every registry mutation happens on one synchronized path and the
//! join/notify semantics can be tested without sockets.

use std::collections::HashMap;

use rollcall_proto::{ClientHandshake, ConnectionType, ServerResponse};

use crate::{
    connection::{Connection, HandshakeState},
    driver_error::DriverError,
    env::Environment,
    registry::{Admission, ConnectionId, NamespaceRegistry, User, UserRegistry},
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (tests or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique session id assigned by the runtime
        session_id: u64,
        /// Remote endpoint the socket was accepted from
        remote_addr: String,
    },

    /// A handshake record was received and decoded on a connection
    HandshakeReceived {
        /// Connection that sent the handshake
        session_id: u64,
        /// The decoded handshake
        handshake: ClientHandshake,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code against live sockets.
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a response record to a specific session
    SendToSession {
        /// Target session id
        session_id: u64,
        /// Response to send
        response: ServerResponse,
    },

    /// Push a response record to every namespace member except the
    /// originating user.
    ///
    /// The executor snapshots the membership via
    /// [`ServerDriver::members_except`] and delivers on a detached task;
    /// the handshaking connection never waits on peer delivery.
    Broadcast {
        /// Namespace whose members are notified
        namespace: String,
        /// Originating user, excluded from delivery
        exclude_user: String,
        /// Response to push
        response: ServerResponse,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based server driver.
///
/// Owns the authoritative registries and orchestrates the per-connection
/// handshake lifecycle: admission, identity resolution, namespace
/// membership, join notification, and teardown.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Per-connection handshake state (session id → connection)
    connections: HashMap<u64, Connection>,
    /// Authoritative user directory
    users: UserRegistry,
    /// Namespace membership directory
    namespaces: NamespaceRegistry,
    /// Environment (time, RNG)
    env: E,
    /// Server configuration
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self {
            connections: HashMap::new(),
            users: UserRegistry::new(),
            namespaces: NamespaceRegistry::new(),
            env,
            config,
        }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id, remote_addr } => {
                Ok(self.handle_connection_accepted(session_id, remote_addr))
            },
            ServerEvent::HandshakeReceived { session_id, handshake } => {
                self.handle_handshake_received(session_id, &handshake)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.handle_connection_closed(session_id, &reason))
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
        remote_addr: String,
    ) -> Vec<ServerAction> {
        if self.connections.len() >= self.config.max_connections {
            return vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }];
        }

        let message = format!("connection {session_id} accepted from {remote_addr}");
        self.connections.insert(session_id, Connection::new(remote_addr));

        vec![ServerAction::Log { level: LogLevel::Debug, message }]
    }

    /// Handle a decoded handshake record.
    ///
    /// Resolves the user (replace-on-reconnect), records namespace
    /// membership, and for `"connect"` handshakes produces the
    /// acknowledgment and the peer notification. Any other connection
    /// type is admitted as a no-op terminal state.
    fn handle_handshake_received(
        &mut self,
        session_id: u64,
        handshake: &ClientHandshake,
    ) -> Result<Vec<ServerAction>, DriverError> {
        let conn = self
            .connections
            .get(&session_id)
            .ok_or(DriverError::SessionNotFound(session_id))?;

        if conn.state() != HandshakeState::AwaitingHandshake {
            return Ok(vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("duplicate handshake on session {session_id} ignored"),
            }]);
        }

        let remote_addr = conn.remote_addr().to_string();
        let connection_id = self.env.mint_connection_id();
        let (user, admission) = self.users.resolve_or_create(
            &handshake.user_id,
            &remote_addr,
            &handshake.namespace,
            connection_id,
            session_id,
        );

        let mut actions = Vec::new();

        if let Admission::Reconnected { stale_connection, previous_namespace, previous_session } =
            &admission
        {
            // Retire the replaced connection before the new one becomes
            // visible to broadcasts.
            self.namespaces.remove_member(previous_namespace, stale_connection);

            if *previous_session != session_id {
                actions.push(ServerAction::CloseConnection {
                    session_id: *previous_session,
                    reason: "superseded by reconnect".to_string(),
                });
            }

            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "user {} reconnected, replacing connection {}",
                    user.user_id, stale_connection
                ),
            });
        }

        self.namespaces.ensure(&user.namespace);
        self.namespaces.add_member(&user.namespace, user.connection_id);

        if let Some(conn) = self.connections.get_mut(&session_id) {
            conn.establish(user.user_id.clone(), user.connection_id);
        }

        match &handshake.connection_type {
            ConnectionType::Connect => {
                let timestamp = self.env.wall_clock_secs().to_string();
                let connection_id = user.connection_id.to_string();

                actions.push(ServerAction::SendToSession {
                    session_id,
                    response: ServerResponse::connect_ack(
                        &user.namespace,
                        &connection_id,
                        &timestamp,
                    ),
                });
                actions.push(ServerAction::Broadcast {
                    namespace: user.namespace.clone(),
                    exclude_user: user.user_id.clone(),
                    response: ServerResponse::push(&user.namespace, &connection_id, &timestamp),
                });
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!(
                        "user {} joined namespace {} as {}",
                        user.user_id, user.namespace, user.connection_id
                    ),
                });
            },
            other => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!(
                        "unhandled connection type {:?} from user {}; no-op",
                        other.as_str(),
                        user.user_id
                    ),
                });
            },
        }

        Ok(actions)
    }

    /// Handle a connection being closed.
    ///
    /// Tears down the user entry and its namespace membership iff the
    /// closing session still owns the entry; a session superseded by a
    /// reconnect leaves the replacement untouched.
    fn handle_connection_closed(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        let Some(mut conn) = self.connections.remove(&session_id) else {
            // Rejected at admission or already torn down
            return Vec::new();
        };

        if conn.state() == HandshakeState::AwaitingHandshake {
            conn.fail();
            return vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("connection {session_id} failed before establishment: {reason}"),
            }];
        }

        let Some(user_id) = conn.user_id() else {
            return Vec::new();
        };

        let owns = self.users.get(user_id).is_some_and(|u| u.session_id == session_id);
        if !owns {
            return vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("connection {session_id} closed: {reason}; user already superseded"),
            }];
        }

        let Some(user) = self.users.remove(user_id) else {
            return Vec::new();
        };
        self.namespaces.remove_member(&user.namespace, &user.connection_id);

        vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "connection {session_id} closed: {reason}; user {} left namespace {}",
                user.user_id, user.namespace
            ),
        }]
    }

    /// Point-in-time snapshot of a namespace's members, excluding one
    /// user.
    ///
    /// Used by the broadcast executor: the returned records are owned
    /// copies, so delivery iterates an isolated snapshot rather than the
    /// live member set.
    pub fn members_except(&self, namespace: &str, exclude_user: &str) -> Vec<User> {
        self.namespaces
            .members(namespace)
            .filter_map(|connection_id| self.users.by_connection(&connection_id))
            .filter(|user| user.user_id != exclude_user)
            .cloned()
            .collect()
    }

    /// Member connection ids of a namespace.
    pub fn members(&self, namespace: &str) -> Vec<ConnectionId> {
        self.namespaces.members(namespace).collect()
    }

    /// Number of members in a namespace.
    pub fn member_count(&self, namespace: &str) -> usize {
        self.namespaces.member_count(namespace)
    }

    /// Names of all known namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.names().map(str::to_string).collect()
    }

    /// User record for an identity. `None` if never admitted.
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    /// All registered users.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.user_count()
    }

    /// Whether a session is currently admitted.
    pub fn has_session(&self, session_id: u64) -> bool {
        self.connections.contains_key(&session_id)
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl<E> std::fmt::Debug for ServerDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.len())
            .field("user_count", &self.users.user_count())
            .finish()
    }
}
