use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::connection::UserId;

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &str;
}

/// Payload of an event that has no dedicated variant. The `type` is chosen
/// by the emitter and `data` is passed through untouched.
#[derive(Debug, Clone, Serialize)]
pub struct GenericEvent {
    #[serde(skip)]
    pub event_type: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Every variant serializes to the `data` object of the wire payload; the
/// discriminator is carried separately through [`EventType`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Event {
    // Tasks (list-scoped)
    TaskCreated {
        list_id: String,
        task: Value,
    },
    TaskUpdated {
        list_id: String,
        task: Value,
    },
    TaskDeleted {
        list_id: String,
        task_id: String,
    },

    // Comments (task-scoped)
    CommentCreated {
        task_id: String,
        comment: Value,
    },

    // Lists
    ListUpdated {
        list_id: String,
        list: Value,
    },
    ListDeleted {
        list_id: String,
    },

    // Diagnostics
    TestMessage {
        message: String,
        from: UserId,
    },

    Generic(GenericEvent),
}

impl Event {
    /// Builds a passthrough event. Non-object `data` is wrapped as `{"value": data}`
    /// so the wire payload's `data` field is always a JSON object.
    pub fn generic(event_type: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        Event::Generic(GenericEvent {
            event_type: event_type.into(),
            data,
        })
    }
}

impl EventType for Event {
    fn event_type(&self) -> &str {
        match self {
            Event::TaskCreated { .. } => "task_created",
            Event::TaskUpdated { .. } => "task_updated",
            Event::TaskDeleted { .. } => "task_deleted",
            Event::CommentCreated { .. } => "comment_created",
            Event::ListUpdated { .. } => "list_updated",
            Event::ListDeleted { .. } => "list_deleted",
            Event::TestMessage { .. } => "test_message",
            Event::Generic(generic) => &generic.event_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
    /// When the event was emitted, not when it reaches a connection.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn to_users(user_ids: Vec<UserId>, event: Event) -> Self {
        Self {
            event,
            scope: MessageScope::Users { user_ids },
            timestamp: Utc::now(),
        }
    }

    pub fn broadcast(event: Event) -> Self {
        Self {
            event,
            scope: MessageScope::Broadcast,
            timestamp: Utc::now(),
        }
    }

    /// Serializes the wire payload `{"type", "timestamp", "data"}` into a frame.
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        let event_type = self.event.event_type();
        let payload = WirePayload {
            event_type,
            timestamp: self
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            data: &self.event,
        };

        Ok(Frame {
            event_type: Arc::from(event_type),
            data: Arc::from(serde_json::to_string(&payload)?),
        })
    }
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to all connections of each listed user
    Users { user_ids: Vec<UserId> },
    /// Send to all connected users
    Broadcast,
}

#[derive(Serialize)]
struct WirePayload<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    timestamp: String,
    data: &'a Event,
}

/// A serialized event as it is handed to a connection. Cloning is cheap, so
/// one frame is shared by every recipient of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event_type: Arc<str>,
    /// JSON text of the wire payload.
    pub data: Arc<str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn frame_json(message: &Message) -> Value {
        let frame = message.to_frame().unwrap();
        serde_json::from_str(&frame.data).unwrap()
    }

    #[test]
    fn test_message_wire_payload_has_type_timestamp_and_data() {
        let mut message = Message::to_users(
            vec!["u1".to_string()],
            Event::TestMessage {
                message: "hi".to_string(),
                from: "u2".to_string(),
            },
        );
        message.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        assert_eq!(
            frame_json(&message),
            json!({
                "type": "test_message",
                "timestamp": "2024-05-01T12:30:00.000Z",
                "data": {"message": "hi", "from": "u2"}
            })
        );
    }

    #[test]
    fn frame_event_type_matches_payload_type() {
        let message = Message::broadcast(Event::TaskDeleted {
            list_id: "list-1".to_string(),
            task_id: "task-1".to_string(),
        });
        let frame = message.to_frame().unwrap();

        assert_eq!(&*frame.event_type, "task_deleted");
        assert_eq!(frame_json(&message)["type"], "task_deleted");
        assert_eq!(
            frame_json(&message)["data"],
            json!({"list_id": "list-1", "task_id": "task-1"})
        );
    }

    #[test]
    fn generic_event_passes_object_data_through() {
        let event = Event::generic("agent_status", json!({"agent": "planner", "busy": true}));
        assert_eq!(event.event_type(), "agent_status");

        let value = frame_json(&Message::broadcast(event));
        assert_eq!(value["type"], "agent_status");
        assert_eq!(value["data"], json!({"agent": "planner", "busy": true}));
    }

    #[test]
    fn generic_event_wraps_non_object_data() {
        let event = Event::generic("ping", json!(42));
        let value = frame_json(&Message::broadcast(event));
        assert_eq!(value["data"], json!({"value": 42}));
    }

    #[test]
    fn event_type_names_are_snake_case() {
        let cases = [
            (
                Event::TaskCreated {
                    list_id: String::new(),
                    task: Value::Null,
                },
                "task_created",
            ),
            (
                Event::TaskUpdated {
                    list_id: String::new(),
                    task: Value::Null,
                },
                "task_updated",
            ),
            (
                Event::CommentCreated {
                    task_id: String::new(),
                    comment: Value::Null,
                },
                "comment_created",
            ),
            (
                Event::ListUpdated {
                    list_id: String::new(),
                    list: Value::Null,
                },
                "list_updated",
            ),
            (
                Event::ListDeleted {
                    list_id: String::new(),
                },
                "list_deleted",
            ),
        ];

        for (event, expected) in cases {
            assert_eq!(event.event_type(), expected);
        }
    }
}
