use std::sync::Arc;

use dotenv::dotenv;
use little_lemon::api::{self, AppState};
use little_lemon::auth;
use little_lemon::config::Config;
use little_lemon::store::RedisStore;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Main entry point for the ordering service.
///
/// This function:
/// 1. Loads environment variables from .env file
/// 2. Connects the Redis entity store and seeds the first manager
/// 3. Starts the HTTP server on the configured address
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize the logging subscriber
    FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .pretty()
        .init();

    info!("Starting Little Lemon ordering service");
    let config = Config::from_env()?;

    let store = Arc::new(RedisStore::open(&config.redis_url)?);
    if let Some(seed) = config.manager.clone() {
        let store = Arc::clone(&store);
        auth::run_blocking(move || auth::seed_manager(store.as_ref(), &seed)).await?;
    }

    let app = api::create_router(AppState::new(store));

    info!("Server listening on {}", config.addr);
    axum::Server::bind(&config.addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
