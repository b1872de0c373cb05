use crate::{
    controller::{health_check_controller, test_sse_controller},
    error::handle_panic,
    middleware::auth::require_auth,
    params, sse, AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use tower_http::catch_panic::CatchPanicLayer;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Astrid Realtime API"
        ),
        paths(
            health_check_controller::health_check,
            sse::handler::sse_handler,
            test_sse_controller::send,
        ),
        components(
            schemas(
                params::test_sse::SendParams,
                test_sse_controller::SendResponse,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "astrid", description = "Astrid real-time notifications API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Requests are authenticated upstream; the gateway forwards the user id in a header.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_header",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    service::config::DEFAULT_AUTH_USER_HEADER,
                    "Authenticated user id forwarded by the authentication gateway",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    catch_panics(
        Router::new()
            .merge(health_routes())
            .merge(sse_routes(app_state.clone()))
            .merge(test_sse_routes(app_state))
            .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc")),
    )
}

/// A panicking handler answers 500 instead of dropping the connection.
fn catch_panics(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(handle_panic))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Long-lived event stream for the authenticated user
fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse::handler::sse_handler))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn test_sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/test-sse", post(test_sse_controller::send))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}
