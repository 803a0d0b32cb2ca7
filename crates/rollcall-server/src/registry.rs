//! User and namespace registries for presence tracking.
//!
//! The user registry is the authoritative mapping from user identity to
//! connection state; the namespace registry maps each namespace name to
//! its member set of connection ids and is kept consistent with the user
//! registry by the driver. A connection id appears in exactly one
//! namespace's member set - the one matching its owning user's
//! `namespace` field.
//!
//! Reconnects replace: resolving a known `user_id` refreshes the entry
//! with the new connection and reports the displaced state so the caller
//! can retire it. There is never more than one authoritative connection
//! handle per user.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Opaque token minted once per physical connection.
pub type ConnectionId = Uuid;

/// Authoritative record for a connected user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable client-supplied identity
    pub user_id: String,
    /// Network endpoint the user connected from
    pub ip_addr: String,
    /// Namespace the user currently belongs to
    pub namespace: String,
    /// Token minted for the user's live connection
    pub connection_id: ConnectionId,
    /// Runtime session that owns the live socket
    pub session_id: u64,
}

/// Outcome of resolving a handshake identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First contact: a fresh user entry was inserted
    Created,
    /// Known identity reconnected: the entry was refreshed and the
    /// displaced connection state is reported for retirement
    Reconnected {
        /// Connection id the replaced entry held
        stale_connection: ConnectionId,
        /// Namespace the replaced entry belonged to
        previous_namespace: String,
        /// Session that owned the replaced connection
        previous_session: u64,
    },
}

/// Authoritative user directory.
///
/// Keyed by `user_id`, with a connection-id reverse index for O(1)
/// member-to-user resolution during broadcast.
#[derive(Debug, Default)]
pub struct UserRegistry {
    /// User id → user record
    users: HashMap<String, User>,
    /// Connection id → user id (reverse index)
    connections: HashMap<ConnectionId, String>,
}

impl UserRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic lookup-or-insert keyed by `user_id`.
    ///
    /// On first contact a fresh entry is inserted and
    /// [`Admission::Created`] returned. For a known identity the entry is
    /// refreshed in place with the new connection id, endpoint, namespace,
    /// and owning session; the displaced values are reported via
    /// [`Admission::Reconnected`] so the caller can retire stale
    /// membership and close the superseded session.
    pub fn resolve_or_create(
        &mut self,
        user_id: &str,
        ip_addr: &str,
        namespace: &str,
        connection_id: ConnectionId,
        session_id: u64,
    ) -> (User, Admission) {
        if let Some(existing) = self.users.get_mut(user_id) {
            let stale_connection = existing.connection_id;
            let previous_namespace =
                std::mem::replace(&mut existing.namespace, namespace.to_string());
            let previous_session = existing.session_id;

            existing.ip_addr = ip_addr.to_string();
            existing.connection_id = connection_id;
            existing.session_id = session_id;
            let user = existing.clone();

            self.connections.remove(&stale_connection);
            self.connections.insert(connection_id, user_id.to_string());

            return (user, Admission::Reconnected {
                stale_connection,
                previous_namespace,
                previous_session,
            });
        }

        let user = User {
            user_id: user_id.to_string(),
            ip_addr: ip_addr.to_string(),
            namespace: namespace.to_string(),
            connection_id,
            session_id,
        };

        self.users.insert(user_id.to_string(), user.clone());
        self.connections.insert(connection_id, user_id.to_string());

        (user, Admission::Created)
    }

    /// User record for an identity. `None` if never seen.
    pub fn get(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    /// Resolve a member connection id back to its owning user.
    ///
    /// O(1) via the reverse index. `None` if the connection was replaced
    /// or removed.
    pub fn by_connection(&self, connection_id: &ConnectionId) -> Option<&User> {
        self.connections.get(connection_id).and_then(|user_id| self.users.get(user_id))
    }

    /// Remove a user and its reverse index entry.
    ///
    /// Returns the removed record so the caller can retire its namespace
    /// membership.
    pub fn remove(&mut self, user_id: &str) -> Option<User> {
        let user = self.users.remove(user_id)?;
        self.connections.remove(&user.connection_id);
        Some(user)
    }

    /// Number of registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// All registered users.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }
}

/// Namespace membership directory.
///
/// Namespaces are created lazily on first reference. A namespace whose
/// last member is removed is dropped; it is recreated on the next
/// reference.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    /// Namespace name → set of member connection ids
    namespaces: HashMap<String, HashSet<ConnectionId>>,
}

impl NamespaceRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent get-or-create for a namespace.
    pub fn ensure(&mut self, name: &str) {
        if !self.namespaces.contains_key(name) {
            self.namespaces.insert(name.to_string(), HashSet::new());
        }
    }

    /// Insert a member connection id into a namespace.
    ///
    /// Idempotent: returns `false` if the id was already a member, which
    /// guards against duplicate `"connect"` handshakes re-adding the same
    /// connection. Creates the namespace if needed.
    pub fn add_member(&mut self, name: &str, connection_id: ConnectionId) -> bool {
        self.namespaces.entry(name.to_string()).or_default().insert(connection_id)
    }

    /// Remove a member connection id from a namespace.
    ///
    /// Returns `true` if the id was a member. A namespace whose last
    /// member is removed is dropped.
    pub fn remove_member(&mut self, name: &str, connection_id: &ConnectionId) -> bool {
        let removed = self.namespaces.get_mut(name).is_some_and(|m| m.remove(connection_id));

        if self.namespaces.get(name).is_some_and(HashSet::is_empty) {
            self.namespaces.remove(name);
        }

        removed
    }

    /// Check if a connection id is a member of a namespace.
    pub fn contains(&self, name: &str, connection_id: &ConnectionId) -> bool {
        self.namespaces.get(name).is_some_and(|m| m.contains(connection_id))
    }

    /// All member connection ids of a namespace.
    pub fn members(&self, name: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.namespaces.get(name).into_iter().flat_map(|m| m.iter().copied())
    }

    /// Number of members in a namespace.
    pub fn member_count(&self, name: &str) -> usize {
        self.namespaces.get(name).map_or(0, HashSet::len)
    }

    /// Number of namespaces with at least one member or an `ensure` call.
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Names of all known namespaces.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }
}
