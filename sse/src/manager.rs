use crate::connection::{ConnectionId, ConnectionRegistry, ConnectionSender, UserId};
use crate::message::{Event, Message as SseMessage, MessageScope};
use crate::subscription::Subscription;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Frames a connection may have queued before it is considered stalled.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
    connection_buffer: usize,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_connection_buffer(DEFAULT_CONNECTION_BUFFER)
    }

    pub fn with_connection_buffer(connection_buffer: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            // tokio panics on a zero-capacity channel
            connection_buffer: connection_buffer.max(1),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(&self, user_id: UserId, sender: ConnectionSender) -> ConnectionId {
        let connection_id = self.registry.register(user_id.clone(), sender);
        info!("Registered SSE connection {connection_id} for user {user_id}");
        connection_id
    }

    /// Open a connection for `user_id` with a bounded frame queue. The
    /// connection stays registered until the returned subscription is dropped.
    pub fn connect(&self, user_id: UserId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.connection_buffer);
        let connection_id = self.register_connection(user_id.clone(), sender);
        Subscription::new(user_id, connection_id, receiver, self.registry.clone())
    }

    /// Unregister a connection. Unknown connections are ignored.
    pub fn unregister_connection(&self, user_id: &UserId, connection_id: &ConnectionId) {
        if self.registry.unregister(user_id, connection_id) {
            info!("Unregistered SSE connection {connection_id} for user {user_id}");
        } else {
            trace!("SSE connection {connection_id} for user {user_id} was already unregistered");
        }
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: SseMessage) {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                return;
            }
        };

        match message.scope {
            MessageScope::Users { user_ids } => {
                let delivered = self.registry.send_to_users(&user_ids, &frame);
                debug!(
                    "Sent SSE event {} to {delivered} connection(s) of user(s) {:?}",
                    frame.event_type, user_ids
                );
            }
            MessageScope::Broadcast => {
                let delivered = self.registry.broadcast(&frame);
                debug!(
                    "Broadcast SSE event {} to {delivered} connection(s)",
                    frame.event_type
                );
            }
        }
    }

    /// Deliver `event` to every open connection of each listed user.
    /// Duplicate ids collapse; users without connections are skipped.
    pub fn broadcast_to_users(&self, user_ids: &[UserId], event: Event) {
        if user_ids.is_empty() {
            trace!("No recipients for SSE event, skipping");
            return;
        }
        self.send_message(SseMessage::to_users(user_ids.to_vec(), event));
    }

    /// Deliver `event` to every open connection.
    pub fn broadcast_to_all(&self, event: Event) {
        self.send_message(SseMessage::broadcast(event));
    }

    /// Drop every registered connection; used on server shutdown so open
    /// streams end instead of holding the server open.
    pub fn close_all(&self) {
        let closed = self.registry.clear();
        info!("Closed {closed} SSE connection(s)");
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.registry.user_connection_count(user_id)
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.user_connection_count(user_id) > 0
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::sync::mpsc::error::TryRecvError;

    fn test_message(text: &str) -> Event {
        Event::TestMessage {
            message: text.to_string(),
            from: "sender".to_string(),
        }
    }

    fn payload(subscription: &mut Subscription) -> Value {
        let frame = subscription.try_recv().unwrap();
        serde_json::from_str(&frame.data).unwrap()
    }

    #[test]
    fn broadcast_reaches_user_then_stops_after_unregister() {
        let manager = Manager::new();
        let mut c1 = manager.connect("u1".to_string());

        manager.broadcast_to_users(&["u1".to_string()], test_message("hi"));

        let received = payload(&mut c1);
        assert_eq!(received["type"], "test_message");
        assert_eq!(received["data"], json!({"message": "hi", "from": "sender"}));
        assert!(received["timestamp"].is_string());
        assert!(matches!(c1.try_recv(), Err(TryRecvError::Empty)));

        let (user_id, connection_id) = (c1.user_id().clone(), c1.connection_id().clone());
        manager.unregister_connection(&user_id, &connection_id);
        manager.broadcast_to_users(&["u1".to_string()], test_message("again"));

        assert!(matches!(c1.try_recv(), Err(TryRecvError::Disconnected)));
        assert!(!manager.is_connected(&"u1".to_string()));
    }

    #[test]
    fn empty_and_unknown_targets_are_silent() {
        let manager = Manager::new();
        let mut c1 = manager.connect("u1".to_string());

        manager.broadcast_to_users(&[], test_message("nobody"));
        manager.broadcast_to_users(&["unknown".to_string()], test_message("ghost"));

        assert!(matches!(c1.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn both_tabs_of_a_user_receive_the_event() {
        let manager = Manager::new();
        let mut tab1 = manager.connect("u1".to_string());
        let mut tab2 = manager.connect("u1".to_string());
        let mut other = manager.connect("u2".to_string());

        manager.broadcast_to_users(
            &["u1".to_string(), "u1".to_string()],
            test_message("two tabs"),
        );

        assert_eq!(payload(&mut tab1)["data"]["message"], "two tabs");
        assert_eq!(payload(&mut tab2)["data"]["message"], "two tabs");
        assert!(matches!(tab1.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn failed_tab_is_dropped_while_the_other_keeps_receiving() {
        let manager = Manager::new();
        let mut kept = manager.connect("u1".to_string());

        let (dead_tx, dead_rx) = mpsc::channel(1);
        manager.register_connection("u1".to_string(), dead_tx);
        drop(dead_rx);
        assert_eq!(manager.user_connection_count(&"u1".to_string()), 2);

        manager.broadcast_to_users(&["u1".to_string()], test_message("first"));
        assert_eq!(payload(&mut kept)["data"]["message"], "first");
        assert_eq!(manager.user_connection_count(&"u1".to_string()), 1);

        manager.broadcast_to_users(&["u1".to_string()], test_message("second"));
        assert_eq!(payload(&mut kept)["data"]["message"], "second");
    }

    #[test]
    fn dropping_subscription_unregisters_connection() {
        let manager = Manager::new();
        let c1 = manager.connect("u1".to_string());
        let connection_id = c1.connection_id().clone();
        assert_eq!(manager.connection_count(), 1);

        drop(c1);
        assert_eq!(manager.connection_count(), 0);

        // Unregistering again after the drop is harmless.
        manager.unregister_connection(&"u1".to_string(), &connection_id);
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn broadcast_to_all_reaches_every_user() {
        let manager = Manager::new();
        let mut c1 = manager.connect("u1".to_string());
        let mut c2 = manager.connect("u2".to_string());

        manager.broadcast_to_all(Event::generic("maintenance", json!({"minutes": 5})));

        assert_eq!(payload(&mut c1)["type"], "maintenance");
        assert_eq!(payload(&mut c2)["data"]["minutes"], 5);
    }

    #[test]
    fn stalled_connection_is_closed_once_its_buffer_is_full() {
        let manager = Manager::with_connection_buffer(2);
        let mut stalled = manager.connect("u1".to_string());

        for n in 0..3 {
            manager.broadcast_to_users(&["u1".to_string()], test_message(&n.to_string()));
        }

        assert!(!manager.is_connected(&"u1".to_string()));
        assert_eq!(payload(&mut stalled)["data"]["message"], "0");
        assert_eq!(payload(&mut stalled)["data"]["message"], "1");
        assert!(matches!(stalled.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[tokio::test]
    async fn close_all_ends_open_subscriptions() {
        let manager = Manager::new();
        let mut c1 = manager.connect("u1".to_string());
        let mut c2 = manager.connect("u2".to_string());

        manager.close_all();

        assert_eq!(manager.connection_count(), 0);
        assert!(c1.recv().await.is_none());
        assert!(c2.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connects_and_broadcasts_keep_registry_consistent() {
        let manager = Arc::new(Manager::new());

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    let user_id = format!("user-{}", n % 4);
                    let subscription = manager.connect(user_id.clone());
                    manager.broadcast_to_users(&[user_id], test_message("race"));
                    drop(subscription);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(manager.connection_count(), 0);
    }
}
