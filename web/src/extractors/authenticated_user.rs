use crate::{AppState, Error};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use log::*;
use sse::connection::UserId;

/// The acting user, as vouched for by the authentication gateway in front of
/// this service. Handlers never see unauthenticated requests through it.
pub(crate) struct AuthenticatedUser(pub UserId);

/// Reads the user id from `header_name`. Blank values count as absent.
pub(crate) fn user_id_from_headers(headers: &HeaderMap, header_name: &str) -> Option<UserId> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let header_name = app_state.config.auth_user_header();

        match user_id_from_headers(&parts.headers, &header_name) {
            Some(user_id) => {
                trace!("Authenticated request for user {user_id}");
                Ok(AuthenticatedUser(user_id))
            }
            None => {
                debug!("Rejecting request without a {header_name} header");
                Err(Error::unauthenticated())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, USER_HEADER};
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn whoami(AuthenticatedUser(user_id): AuthenticatedUser) -> String {
        user_id
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .with_state(app_state())
    }

    #[tokio::test]
    async fn extractor_rejects_with_unauthorized_without_middleware() {
        let request = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn extractor_yields_the_forwarded_user() {
        let request = Request::builder()
            .uri("/whoami")
            .header(USER_HEADER, "u1")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn user_id_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-astrid-user-id", HeaderValue::from_static("  u1 "));

        assert_eq!(
            user_id_from_headers(&headers, "x-astrid-user-id"),
            Some("u1".to_string())
        );
    }

    #[test]
    fn blank_or_missing_user_id_is_rejected() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from_headers(&headers, "x-astrid-user-id"), None);

        headers.insert("x-astrid-user-id", HeaderValue::from_static("   "));
        assert_eq!(user_id_from_headers(&headers, "x-astrid-user-id"), None);
    }
}
