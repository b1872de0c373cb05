use crate::connection::{ConnectionId, ConnectionRegistry, UserId};
use crate::message::Frame;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::Receiver;

/// Receiving half of a registered connection.
///
/// Dropping the subscription unregisters the connection, so every way an
/// HTTP stream can end (client disconnect, timeout, handler cancellation)
/// removes it from the registry.
pub struct Subscription {
    user_id: UserId,
    connection_id: ConnectionId,
    receiver: Receiver<Frame>,
    registry: Arc<ConnectionRegistry>,
}

impl Subscription {
    pub(crate) fn new(
        user_id: UserId,
        connection_id: ConnectionId,
        receiver: Receiver<Frame>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            user_id,
            connection_id,
            receiver,
            registry,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Waits for the next frame. Returns `None` once the connection has been
    /// dropped from the registry and its queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.unregister(&self.user_id, &self.connection_id) {
            debug!(
                "SSE connection {} closed for user {}, unregistered",
                self.connection_id, self.user_id
            );
        }
    }
}
