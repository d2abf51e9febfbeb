// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use fleet_telemetry::application::command_service::CommandService;
use fleet_telemetry::application::ingest_service::IngestService;
use fleet_telemetry::application::query_service::QueryService;
use fleet_telemetry::infrastructure::bus_subscriber::BusSubscriber;
use fleet_telemetry::infrastructure::config::load_service_config;
use fleet_telemetry::infrastructure::mqtt_bus;
use fleet_telemetry::infrastructure::open_store;
use fleet_telemetry::presentation::app_state::AppState;
use fleet_telemetry::presentation::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_service_config()?;

    // Create store (infrastructure layer)
    let store = open_store(&config.storage)?;

    // Create services (application layer)
    let ingest_service = IngestService::new(store.clone());
    let query_service = QueryService::new(store, config.query.clone());

    // Connect the message bus: telemetry in, commands out
    let command_service = if config.bus.enabled {
        let (publisher, messages) = mqtt_bus::connect(&config.bus);
        let subscriber = BusSubscriber::new(ingest_service.clone());
        tokio::spawn(async move {
            subscriber.run(messages).await;
        });
        CommandService::new(Arc::new(publisher))
    } else {
        tracing::info!("Message bus disabled, accepting telemetry over HTTP only");
        CommandService::disabled()
    };

    // Create application state
    let state = Arc::new(AppState {
        ingest_service,
        query_service,
        command_service,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_address.parse()?;
    tracing::info!("Starting fleet-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
