use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use log::*;
use sse::message::Frame;
use std::convert::Infallible;

/// SSE handler that establishes a long-lived connection for real-time updates.
/// Every tab opens its own connection; all of a user's connections receive
/// the user's events.
#[utoipa::path(
    get,
    path = "/sse",
    responses(
        (status = 200, description = "Stream of the user's events", body = String, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("user_header" = [])
    )
)]
pub(crate) async fn sse_handler(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Establishing SSE connection for user {user_id}");

    // Dropping the subscription (stream finished or client gone) unregisters it.
    let mut subscription = app_state.sse_manager.connect(user_id);

    let stream = stream! {
        while let Some(frame) = subscription.recv().await {
            yield Ok::<_, Infallible>(to_sse_event(&frame));
        }

        debug!(
            "SSE connection {} for user {} closed by server",
            subscription.connection_id(),
            subscription.user_id()
        );
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new().interval(app_state.config.sse_keep_alive_interval()),
    )
}

fn to_sse_event(frame: &Frame) -> Event {
    // The event name must be a single line; anything else is still delivered
    // with its type available in the JSON payload.
    let event = if frame.event_type.contains(['\n', '\r']) {
        Event::default()
    } else {
        Event::default().event(&*frame.event_type)
    };

    event.data(&*frame.data)
}
