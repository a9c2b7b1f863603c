use meme_swipe_api::{
    auth::JwtValidator,
    aws_clients::{create_dynamodb_client, create_sdk_config},
    config::Config,
    errors::AppError,
    hashing::HttpPerceptualHasher,
    repositories::{DynamoDbFeedHistoryRepository, DynamoDbMemeRepository, DynamoDbVoteRepository},
    routes::create_router,
    startup::init_resources,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "meme_swipe_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    tracing::info!(bind_address = %config.bind_address, tables = ?config.tables, "Configuration loaded");

    // --- AWS Client Initialization ---
    let sdk_config = create_sdk_config(&config).await;
    let db_client = create_dynamodb_client(&sdk_config);

    if config.init_tables {
        init_resources(&db_client, &config.tables).await?;
    }

    let hasher = HttpPerceptualHasher::new(config.hash_service_url.clone())
        .map_err(|e| AppError::InitError(format!("Failed to build hashing client: {}", e)))?;

    // --- Application State ---
    let state = Arc::new(AppState {
        meme_repo: Arc::new(DynamoDbMemeRepository::new(
            db_client.clone(),
            config.tables.memes.clone(),
        )),
        vote_repo: Arc::new(DynamoDbVoteRepository::new(
            db_client.clone(),
            config.tables.votes.clone(),
        )),
        history_repo: Arc::new(DynamoDbFeedHistoryRepository::new(
            db_client,
            config.tables.feed_history.clone(),
        )),
        hasher: Arc::new(hasher),
        jwt: JwtValidator::new(&config.jwt_secret, config.jwt_algorithm),
    });

    let app = create_router(state, config.request_timeout);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving; only an explicit signal stops the server.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
