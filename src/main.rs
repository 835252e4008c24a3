//! Dispatch hub server binary.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dispatch_hub::adapters::{
    hub_routes, websocket_router, HttpState, InMemoryCustomerRoster, InMemoryHistoryStore,
    InMemoryOrderRepository, SeedData, WebSocketState,
};
use dispatch_hub::application::handlers::{InboxAggregator, TransitionOrderHandler};
use dispatch_hub::application::hub::Hub;
use dispatch_hub::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        production = config.server.production,
        "Dispatch hub starting"
    );

    // Storage
    let history = Arc::new(InMemoryHistoryStore::new());
    let orders = Arc::new(InMemoryOrderRepository::new());
    let roster = Arc::new(InMemoryCustomerRoster::new());

    if let Some(path) = &config.hub.seed_path {
        let seed = SeedData::load(path)?;
        tracing::info!(
            path = %path.display(),
            orders = seed.orders.len(),
            customers = seed.customers.len(),
            "Loaded seed data"
        );
        seed.apply(&orders, &roster);
    }

    // Hub and command handlers
    let hub = Arc::new(Hub::new(
        config.hub.hub_options(),
        history,
        orders.clone(),
    ));
    let transitions = Arc::new(TransitionOrderHandler::new(
        orders.clone(),
        hub.clone(),
        config.hub.transition_policy(),
    ));
    let inbox = Arc::new(InboxAggregator::with_config(
        hub.clone(),
        roster,
        config.hub.inbox_config(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let inbox_task = {
        let inbox = inbox.clone();
        tokio::spawn(async move { inbox.run(shutdown_rx).await })
    };

    let app = Router::new()
        .merge(websocket_router().with_state(WebSocketState::new(hub.clone(), transitions)))
        .merge(hub_routes(HttpState { hub, inbox, orders }))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(err) = inbox_task.await {
        tracing::warn!(error = %err, "Inbox aggregator task ended abnormally");
    }
    tracing::info!("Dispatch hub stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&server.log_level)?,
    };
    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.allows_any_origin() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = server
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
