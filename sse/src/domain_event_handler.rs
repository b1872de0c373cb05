use crate::message::Event as SseEvent;
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to SSE events and broadcasting
/// them to the users named in the event.
///
/// The emitter determines which users should be notified and includes their
/// IDs in the event. This handler only translates and routes.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }

    fn to_sse_event(event: &DomainEvent) -> SseEvent {
        match event {
            DomainEvent::TaskCreated { list_id, task, .. } => SseEvent::TaskCreated {
                list_id: list_id.clone(),
                task: task.clone(),
            },
            DomainEvent::TaskUpdated { list_id, task, .. } => SseEvent::TaskUpdated {
                list_id: list_id.clone(),
                task: task.clone(),
            },
            DomainEvent::TaskDeleted {
                list_id, task_id, ..
            } => SseEvent::TaskDeleted {
                list_id: list_id.clone(),
                task_id: task_id.clone(),
            },
            DomainEvent::CommentCreated {
                task_id, comment, ..
            } => SseEvent::CommentCreated {
                task_id: task_id.clone(),
                comment: comment.clone(),
            },
            DomainEvent::ListUpdated { list_id, list, .. } => SseEvent::ListUpdated {
                list_id: list_id.clone(),
                list: list.clone(),
            },
            DomainEvent::ListDeleted { list_id, .. } => SseEvent::ListDeleted {
                list_id: list_id.clone(),
            },
        }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        let user_ids = event.notify_user_ids();
        let sse_event = Self::to_sse_event(event);

        debug!(
            "Handling domain event as SSE {:?} for {} user(s)",
            crate::message::EventType::event_type(&sse_event),
            user_ids.len()
        );

        self.sse_manager.broadcast_to_users(user_ids, sse_event);
    }
}
