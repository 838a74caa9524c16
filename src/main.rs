use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod db;
mod model;
mod service;

use app::AppState;
use db::storage::Storage;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config)
        .await
        .expect("Failed to initialize application state");

    // Separate handles for handlers that do not need the full state
    let db_pool = web::Data::from(Arc::clone(&state.db_pool));
    let storage: web::Data<dyn Storage> = web::Data::from(Arc::clone(&state.storage));
    let vault = web::Data::new(state.vault.clone());
    let broadcaster = web::Data::new(state.broadcaster.clone());
    let state = web::Data::new(state);

    tracing::info!("Starting Maitri IVR server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(db_pool.clone())
            .app_data(storage.clone())
            .app_data(vault.clone())
            .app_data(broadcaster.clone())
            .configure(api::ivr::configure)
            .configure(api::dashboard::configure)
            .configure(api::realtime::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
