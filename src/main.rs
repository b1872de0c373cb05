use events::EventPublisher;
use log::*;
use service::{config::Config, logging::Logger};
use sse::domain_event_handler::SseDomainEventHandler;
use sse::Manager;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    info!(
        "Starting up Astrid realtime service ({} environment)...",
        config.runtime_env()
    );

    let sse_manager = Arc::new(Manager::with_connection_buffer(
        config.sse_connection_buffer,
    ));

    let event_publisher = EventPublisher::new().with_handler(Arc::new(
        SseDomainEventHandler::new(sse_manager.clone()),
    ));
    info!(
        "Domain events routed through {} handler(s)",
        event_publisher.handler_count()
    );

    let app_state = web::AppState::new(config, sse_manager, Arc::new(event_publisher));

    web::init_server(app_state).await?;

    info!("Astrid realtime service stopped");
    Ok(())
}
