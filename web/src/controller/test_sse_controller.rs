use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::test_sse::SendParams;
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde::Serialize;
use sse::message::Event as SseEvent;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct SendResponse {
    success: bool,
    message: String,
    from: String,
    to: String,
}

/// POST a `test_message` event to another user's open SSE connections
#[utoipa::path(
    post,
    path = "/api/test-sse",
    request_body = SendParams,
    responses(
        (status = 200, description = "Test event handed to the broadcaster", body = SendResponse),
        (status = 400, description = "targetUserId or message missing"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("user_header" = [])
    )
)]
pub async fn send(
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    params: Result<Json<SendParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(params) = params?;
    debug!("POST test SSE event from {user_id}: {params:?}");

    let (target_user_id, message) = params
        .validated()
        .ok_or_else(|| Error::invalid_request("targetUserId and message are required"))?;

    app_state.sse_manager.broadcast_to_users(
        std::slice::from_ref(&target_user_id),
        SseEvent::TestMessage {
            message,
            from: user_id.clone(),
        },
    );

    Ok(Json(SendResponse {
        success: true,
        message: format!("Test SSE event sent to {target_user_id}"),
        from: user_id,
        to: target_user_id,
    }))
}
