/// Flowstore: workflow-definition store
///
/// Main entry point. Initializes configuration and starts the HTTP server.

use flowstore::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Flow management API at /flows/*
/// - Group management API at /groups/*
/// - Health check at /health
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3004 and sqlite://data/flowstore.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
