//! Event system infrastructure for Astrid.
//!
//! This crate provides the event system that decouples task and list
//! mutations from infrastructure concerns (like SSE notifications).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on other internal crates. Entity data is
//! carried as serialized JSON values so the persistence layer stays private
//! to whoever emits the event.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Identifier of any Astrid record (users, lists, tasks, comments).
/// Records are keyed by opaque strings issued by the persistent store.
pub type Id = String;

/// Domain events that represent business-level changes in the system.
/// These events are emitted after a mutation has been committed.
///
/// Events include user IDs for notification routing. The emitter is
/// responsible for determining which users should be notified, usually the
/// owner and members of the affected list.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A task was added to a list.
    TaskCreated {
        list_id: Id,
        /// Complete serialized task, sent so clients can update without refetching.
        task: Value,
        notify_user_ids: Vec<Id>,
    },
    /// A task changed (title, completion, assignee, due date, ...).
    TaskUpdated {
        list_id: Id,
        task: Value,
        notify_user_ids: Vec<Id>,
    },
    /// A task was removed. Only the id is carried since the record is gone.
    TaskDeleted {
        list_id: Id,
        task_id: Id,
        notify_user_ids: Vec<Id>,
    },
    /// A comment was posted on a task, either by a user or by an agent.
    CommentCreated {
        task_id: Id,
        comment: Value,
        notify_user_ids: Vec<Id>,
    },
    /// List metadata or membership changed.
    ListUpdated {
        list_id: Id,
        list: Value,
        notify_user_ids: Vec<Id>,
    },
    /// A list was removed along with its tasks.
    ListDeleted {
        list_id: Id,
        notify_user_ids: Vec<Id>,
    },
}

impl DomainEvent {
    /// The users that should hear about this event.
    pub fn notify_user_ids(&self) -> &[Id] {
        match self {
            DomainEvent::TaskCreated {
                notify_user_ids, ..
            }
            | DomainEvent::TaskUpdated {
                notify_user_ids, ..
            }
            | DomainEvent::TaskDeleted {
                notify_user_ids, ..
            }
            | DomainEvent::CommentCreated {
                notify_user_ids, ..
            }
            | DomainEvent::ListUpdated {
                notify_user_ids, ..
            }
            | DomainEvent::ListDeleted {
                notify_user_ids, ..
            } => notify_user_ids,
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers.
    /// Handlers are infallible from the publisher's point of view; each one
    /// owns its own error recovery.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
