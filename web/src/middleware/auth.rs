use crate::extractors::authenticated_user::user_id_from_headers;
use crate::{AppState, Error};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authentication middleware that returns 401 Unauthorized for requests the
/// authentication gateway did not attach a user id to.
pub async fn require_auth(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let header_name = app_state.config.auth_user_header();

    match user_id_from_headers(request.headers(), &header_name) {
        Some(_user_id) => next.run(request).await,
        None => Error::unauthenticated().into_response(),
    }
}
