//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, feed::SolutionFeed, gemini::GeminiAdapter, youtube::YouTubeAdapter},
    config::Config,
    error::ApiError,
    web::{create_router, state::AppState},
};
use askpix_core::{flows::Flows, MemorySolutionRepository, PromptTemplates, SolutionRepository};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let repository: Arc<dyn SolutionRepository> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool, config.max_image_bytes);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; saved solutions are kept in memory and lost on restart.");
            Arc::new(MemorySolutionRepository::new(config.max_image_bytes))
        }
    };
    let solutions = Arc::new(SolutionFeed::new(repository));

    // --- 3. Initialize Service Adapters ---
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; every model call will fail until it is configured.");
    }
    let model = Arc::new(
        GeminiAdapter::new(
            config.gemini_api_base.clone(),
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        )?,
    );

    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; solutions will not include videos.");
    }
    let videos = Arc::new(
        YouTubeAdapter::new(config.youtube_api_key.clone())?,
    );

    let templates = match &config.prompts_path {
        Some(dir) => {
            info!("Loading prompt overrides from {}", dir.display());
            PromptTemplates::with_overrides(dir)?
        }
        None => PromptTemplates::default(),
    };
    let flows = Arc::new(Flows::new(model, videos, Arc::new(templates)));

    // --- 4. Build the Shared AppState & Router ---
    let app_state = AppState {
        config: config.clone(),
        flows,
        solutions,
    };
    let app = create_router(app_state);

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for the shutdown signal: {}", e);
        }
        info!("Shutdown signal received.");
        signal_token.cancel();
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped.");
    Ok(())
}
