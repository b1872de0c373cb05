use ::sse::Manager;
use axum::http::{header, HeaderName, HeaderValue, Method};
use events::EventPublisher;
use log::*;
use service::config::Config;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
pub mod router;
mod sse;

pub use error::{Error, Result, WebErrorKind};

// Web-level state shared by every route handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<Manager>,
    pub event_publisher: Arc<EventPublisher>,
}

impl AppState {
    pub fn new(
        config: Config,
        sse_manager: Arc<Manager>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            sse_manager,
            event_publisher,
        }
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;

    let cors = cors_layer(&app_state.config);
    let sse_manager = app_state.sse_manager.clone();
    let app = router::define_routes(app_state).layer(cors);

    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sse_manager))
        .await
}

/// Origins usable in a credentialed CORS list. A wildcard cannot be
/// combined with credentials, so it is skipped like any invalid origin.
fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter_map(|origin| {
            if origin == "*" {
                warn!("Ignoring wildcard CORS origin; list each allowed origin explicitly");
                return None;
            }
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = allowed_origins(config);

    let mut allowed_headers = vec![header::CONTENT_TYPE, header::ACCEPT];
    match HeaderName::from_str(&config.auth_user_header()) {
        Ok(name) => allowed_headers.push(name),
        Err(e) => warn!("Auth user header is not a valid header name: {e}"),
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::list(allowed_headers))
        .allow_credentials(true)
}

/// Resolves on ctrl-c or SIGTERM. Open SSE streams are closed first so the
/// graceful shutdown is not held up by long-lived connections.
async fn shutdown_signal(sse_manager: Arc<Manager>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing SSE connections");
    sse_manager.close_all();
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use clap::Parser;

    pub(crate) const USER_HEADER: &str = service::config::DEFAULT_AUTH_USER_HEADER;

    pub(crate) fn app_state() -> AppState {
        let config = Config::parse_from(["astrid"]);
        let sse_manager = Arc::new(Manager::new());
        let event_publisher = Arc::new(EventPublisher::new().with_handler(Arc::new(
            ::sse::domain_event_handler::SseDomainEventHandler::new(sse_manager.clone()),
        )));
        AppState::new(config, sse_manager, event_publisher)
    }
}
