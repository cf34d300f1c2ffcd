// src/main.rs

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nudgeable::api::http::router::api_router;
use nudgeable::config::CONFIG;
use nudgeable::llm::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let level = CONFIG.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Nudgeable backend");
    info!("Model: {}", CONFIG.gemini_model);

    // Create database pool and ensure schema
    let pool = nudgeable::db::create_pool(&CONFIG.database_url, CONFIG.sqlite_max_connections)
        .await?;
    nudgeable::db::run_migrations(&pool).await?;

    // Gemini client for both chat simulation and judge calls
    let model = Arc::new(GeminiClient::from_env()?);

    let app_state = Arc::new(nudgeable::state::create_app_state(pool, model));

    let cors = CorsLayer::new()
        .allow_origin(CONFIG.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .nest("/api", api_router(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let bind_address = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Server listening on http://{bind_address}");

    axum::serve(listener, app).await?;

    Ok(())
}
