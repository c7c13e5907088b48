//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, LocalFileStore, OpenAiEmbeddingAdapter, OpenAiQaAdapter, PdfDirectoryLoader,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use pdf_qa_core::{IndexSettings, IndexStore, TextSplitter};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let embedding_client = Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.google_api_key)
            .with_api_base(&config.embedding_api_base),
    );
    let llm_client = Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.groq_api_key)
            .with_api_base(&config.llm_api_base),
    );

    let embedder = Arc::new(OpenAiEmbeddingAdapter::new(
        embedding_client,
        config.embedding_model.clone(),
    ));
    let qa_adapter = Arc::new(OpenAiQaAdapter::new(llm_client, config.qa_model.clone()));
    let files = Arc::new(LocalFileStore::new(config.upload_dir.clone()));
    let loader = Arc::new(PdfDirectoryLoader::new(config.upload_dir.clone()));

    // --- 4. Build the Document Index (empty until a user triggers a build) ---
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let index = Arc::new(IndexStore::new(
        loader,
        embedder,
        splitter,
        IndexSettings {
            document_limit: config.index_document_limit,
            embedding_batch_size: config.embedding_batch_size,
        },
    ));
    info!(
        upload_dir = %config.upload_dir.display(),
        document_limit = config.index_document_limit,
        "Document index is waiting for initialization"
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        files,
        index,
        qa_adapter,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
