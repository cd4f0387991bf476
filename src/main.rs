// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::contact_service::ContactService;
use crate::application::news_service::NewsService;
use crate::application::profile_service::ProfileService;
use crate::application::dispatcher::{DispatchChannels, Dispatcher};
use crate::application::session::SessionContext;
use crate::application::session_service::SessionService;
use crate::application::trekking_service::TrekkingService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::device_outbox::DeviceOutbox;
use crate::infrastructure::firestore::FirestoreClient;
use crate::infrastructure::kv_store::JsonFileStore;
use crate::infrastructure::news_client::NewsApiClient;
use crate::infrastructure::sensor_hub::SensorHub;
use crate::infrastructure::sms_gateway::HttpSmsGateway;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("silent_sos=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create adapters (infrastructure layer)
    let hub = Arc::new(SensorHub::new(config.sampling.intervals()));
    let outbox = Arc::new(DeviceOutbox::new(config.emergency.outbox_capacity));
    let store = Arc::new(JsonFileStore::new(config.storage.data_dir.clone()));
    let firestore = Arc::new(FirestoreClient::new(&config.firestore));
    let headlines = Arc::new(NewsApiClient::new(config.news.clone()));
    if config.news.api_key.is_empty() {
        tracing::warn!("no news API key configured, the disguise screen shows canned headlines");
    }
    let sms = Arc::new(HttpSmsGateway::new(config.sms_gateway.clone()));
    if config.sms_gateway.is_none() {
        tracing::warn!("no SMS gateway configured, alerts will use the share action");
    }

    // Create services (application layer)
    let channels = DispatchChannels {
        location: hub.clone(),
        contacts: store.clone(),
        sms,
        share: outbox.clone(),
        sink: firestore.clone(),
    };
    let dispatcher = Arc::new(Dispatcher::new(channels, config.messages.clone()));
    let sessions = SessionService::new(SessionContext {
        dispatcher,
        signals: hub.clone(),
        permissions: hub.clone(),
        audio: outbox.clone(),
        dialer: outbox.clone(),
        prompt: outbox.clone(),
        actions: outbox.clone(),
        detectors: config.detectors.clone(),
        emergency: config.emergency.clone(),
    });

    // Create application state
    let state = Arc::new(AppState {
        hub: hub.clone(),
        outbox,
        sessions: sessions.clone(),
        contacts: ContactService::new(store.clone()),
        trekking: TrekkingService::new(store, hub),
        news: NewsService::new(headlines),
        profiles: ProfileService::new(firestore),
    });

    // Build router (presentation layer)
    let router = presentation::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting silent-sos device bridge on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release every open screen before exit
    sessions.close_all().await;
    tracing::info!("silent-sos stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
