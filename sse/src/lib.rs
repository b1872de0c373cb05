//! Server-Sent Events (SSE) infrastructure for real-time updates.
//!
//! This crate pushes task, comment and list changes from the backend to the
//! browser sessions of the users they concern.
//!
//! # Architecture
//!
//! - **Many connections per user**: every open tab holds its own SSE
//!   connection; all of them receive the user's events.
//! - **Dual-index registry**: O(1) lookups for both connection management and
//!   user-scoped message routing via separate DashMap indices.
//! - **User and Broadcast scopes**: Messages can be sent to a set of users or
//!   broadcast to all connected users.
//! - **Ephemeral messages**: Delivery is at-most-once. If a user is offline,
//!   they miss the event and see fresh data on next page load.
//! - **Non-blocking fan-out**: each connection has a bounded queue. A
//!   connection that is closed or whose queue is full is dropped from the
//!   registry; it never slows down delivery to anyone else.
//! - **Type-safe events**: known event kinds are enum variants; anything else
//!   goes through `Event::Generic`.
//!
//! # Message Flow
//!
//! 1. Frontend establishes SSE connection via `/sse` endpoint
//! 2. Backend resolves the acting user from the authentication provider
//! 3. `Manager::connect` registers the connection and returns a `Subscription`
//! 4. When a resource changes (e.g., a task is completed):
//!    - The emitter determines recipients (e.g., members of the list)
//!    - It calls `broadcast_to_users` directly, or publishes a `DomainEvent`
//!      that `SseDomainEventHandler` routes
//!    - The event is serialized once and queued on each matching connection
//! 5. When the stream ends the subscription is dropped and unregistered
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use sse::message::Event as SseEvent;
//!
//! app_state.sse_manager.broadcast_to_users(
//!     &member_ids,
//!     SseEvent::TaskCreated { list_id, task },
//! );
//! ```
//!
//! # Limitations
//!
//! The registry is in-process. In a horizontally scaled deployment a user
//! connected to one instance never sees events broadcast on another.
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture and type-safe ConnectionId
//! - `manager`: High-level message routing (delegates to ConnectionRegistry)
//! - `message`: Event, scope and wire frame definitions
//! - `subscription`: Receiving half of a connection that unregisters on drop
//! - `domain_event_handler`: Bridges `events::DomainEvent` to SSE broadcasts

pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;
pub mod subscription;

pub use manager::Manager;
pub use subscription::Subscription;
