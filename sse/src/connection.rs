use crate::message::Frame;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

// Type alias for user IDs as handed over by the authentication provider
pub type UserId = String;

/// Sending half of a connection's frame channel.
pub type ConnectionSender = Sender<Frame>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub sender: ConnectionSender,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Safe to share across tokio worker threads: registration, unregistration
/// and delivery may race freely. Shard locks are only held for the duration
/// of a lookup; frames are handed to connections after the locks are released.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: fast lookup by user_id for message routing - O(1)
    user_index: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1)
    pub fn register(&self, user_id: UserId, sender: ConnectionSender) -> ConnectionId {
        let connection_id = ConnectionId::new();

        // Indexed first: a connection visible in `connections` is always
        // reachable through its user, so a concurrent `clear` can fully remove it.
        self.user_index
            .entry(user_id.clone())
            .or_default()
            .insert(connection_id.clone());

        self.connections
            .insert(connection_id.clone(), ConnectionInfo { user_id, sender });

        connection_id
    }

    /// Unregister a connection - O(1). Returns `false` when the connection was
    /// already gone or belongs to a different user.
    pub fn unregister(&self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(connection_id, |_, info| &info.user_id == user_id)
            .is_some();

        if removed {
            if let Some(mut entry) = self.user_index.get_mut(user_id) {
                entry.remove(connection_id);
            }
            // Re-checked under the shard lock so a concurrent register for the
            // same user is never dropped along with the empty entry.
            self.user_index.remove_if(user_id, |_, ids| ids.is_empty());
        }

        removed
    }

    /// Deliver a frame to every connection of the given users. Returns the
    /// number of connections that accepted the frame.
    pub fn send_to_users<'a, I>(&self, user_ids: I, frame: &Frame) -> usize
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let unique: HashSet<&UserId> = user_ids.into_iter().collect();

        let mut targets = Vec::new();
        for user_id in unique {
            if let Some(connection_ids) = self.user_index.get(user_id) {
                for conn_id in connection_ids.iter() {
                    if let Some(info) = self.connections.get(conn_id) {
                        targets.push((conn_id.clone(), info.value().clone()));
                    }
                }
            }
        }

        self.deliver(targets, frame)
    }

    /// Deliver a frame to every registered connection - O(n)
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let targets: Vec<(ConnectionId, ConnectionInfo)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        self.deliver(targets, frame)
    }

    /// Drop every connection. Receivers observe end-of-stream once they have
    /// drained what was already queued.
    ///
    /// Each connection goes through `unregister`, so the user index stays
    /// consistent with connections registered while this runs.
    pub fn clear(&self) -> usize {
        let snapshot: Vec<(ConnectionId, UserId)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().user_id.clone()))
            .collect();

        snapshot
            .iter()
            .filter(|(conn_id, user_id)| self.unregister(user_id, conn_id))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.user_index
            .get(user_id)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn user_connection_ids(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        self.user_index
            .get(user_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Never blocks on a slow connection: a full buffer is treated the same
    /// as a closed one and the connection is dropped.
    fn deliver(&self, targets: Vec<(ConnectionId, ConnectionInfo)>, frame: &Frame) -> usize {
        let mut delivered = 0;

        for (conn_id, info) in targets {
            match info.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "SSE connection {} for user {} is not draining events, dropping it",
                        conn_id, info.user_id
                    );
                    self.unregister(&info.user_id, &conn_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(
                        "SSE connection {} for user {} is closed, cleaning it up",
                        conn_id, info.user_id
                    );
                    self.unregister(&info.user_id, &conn_id);
                }
            }
        }

        delivered
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
