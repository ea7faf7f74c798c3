//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, generation_llm::OpenAiGenerationAdapter},
    config::Config,
    error::ApiError,
    generation::service::{GenerationSettings, LessonGenerator},
    sermons::SermonService,
    web::{
        add_lesson_handler, combine_sermon_handler, generate_lesson_handler,
        generate_sermon_handler, get_sermon_handler, list_lessons_handler, list_sermons_handler,
        remove_lesson_handler, rest::ApiDoc, set_visibility_handler, shared_sermon_handler,
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
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
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let generation_adapter = Arc::new(OpenAiGenerationAdapter::new(
        openai_client,
        Duration::from_secs(config.generation_timeout_secs),
    ));

    // --- 4. Build the Core Services & Shared AppState ---
    let generator = Arc::new(LessonGenerator::new(
        db_adapter.clone(),
        generation_adapter,
        GenerationSettings::from_config(&config),
    ));
    let sermons = Arc::new(SermonService::new(db_adapter.clone(), generator.clone()));

    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        generator,
        sermons,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/lessons/generate", post(generate_lesson_handler))
        .route("/lessons", get(list_lessons_handler))
        .route("/sermons/generate", post(generate_sermon_handler))
        .route("/sermons/combine", post(combine_sermon_handler))
        .route("/sermons", get(list_sermons_handler))
        .route("/sermons/{sermon_id}", get(get_sermon_handler))
        .route(
            "/sermons/{sermon_id}/lessons/{lesson_id}",
            post(add_lesson_handler).delete(remove_lesson_handler),
        )
        .route("/sermons/{sermon_id}/visibility", patch(set_visibility_handler))
        .route("/shared/{token}", get(shared_sermon_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
