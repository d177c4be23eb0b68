/// Server setup and initialization
///
/// Wires together all components: connection pool, stores, HTTP routes and
/// the cross-origin policy. Provides the main application factory function.

use crate::{
    api::{create_flow_routes, create_group_routes, AppState},
    config::{Config, CorsConfig},
    storage,
};
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes and middleware
///
/// Opens the database pool (provisioning the schema) and builds the router.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("🗄️ Initializing database pool");
    let pool = storage::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;

    let app = build_router(AppState::new(pool), &config.cors);
    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Build the router over an existing state
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        .route("/health", get(health_check))
        .merge(create_flow_routes())
        .merge(create_group_routes())
        .with_state(state)
        .layer(cors_layer(cors))
}

/// Cross-origin policy: configured origins only, credentials allowed
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    tracing::info!("🌐 CORS allow-list: {:?}", config.allowed_origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Start the HTTP server with the given configuration
///
/// TLS is terminated in front of this process.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging (RUST_LOG, default "info")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting flowstore server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Health check endpoint handler
///
/// Probes the pool with `SELECT 1`.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match sqlx::query("SELECT 1").execute(state.flows.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": timestamp })),
        ),
        Err(e) => {
            tracing::error!("❌ Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "timestamp": timestamp, "details": e.to_string() })),
            )
        }
    }
}
