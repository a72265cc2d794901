//! Main Entrypoint for the Oratoria API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the store: Postgres when configured, in memory otherwise.
//! 3. Initializing shared services (LLM, voice vendor, key validation).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use oratoria_api::{config::Config, db::Db, router::create_router, state::AppState};
use oratoria_core::{
    catalog::Catalog,
    coach::CourseCoach,
    feedback::{FeedbackGenerator, LLMFeedbackGenerator},
    keys::{HttpKeyValidator, KeyStatus, KeyValidator},
    llm_client::{LLMClient, OpenAICompatibleClient},
    memory::MemoryStore,
    periodic::PeriodicTask,
    users::Store,
    voice::{ElevenLabsProvider, UnconfiguredVoiceProvider, VoiceProvider},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Re-validates the configured vendor keys on an interval.
fn spawn_key_monitor(
    config: &Config,
    keys: Arc<dyn KeyValidator>,
) -> Option<Arc<PeriodicTask<KeyStatus>>> {
    if config.elevenlabs_api_key.is_none() && config.fal_api_key.is_none() {
        return None;
    }
    let elevenlabs_key = config.elevenlabs_api_key.clone().unwrap_or_default();
    let fal_key = config.fal_api_key.clone().unwrap_or_default();
    let task = PeriodicTask::spawn("vendor_key_check", config.key_check_interval, move || {
        let keys = keys.clone();
        let elevenlabs_key = elevenlabs_key.clone();
        let fal_key = fal_key.clone();
        async move {
            let status = keys.validate(&elevenlabs_key, &fal_key).await;
            if !(status.elevenlabs && status.falai) {
                warn!(?status, "A configured vendor key failed validation");
            }
            status
        }
    });
    Some(Arc::new(task))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Catalog and Store ---
    let catalog = Arc::new(Catalog::builtin().context("Built-in catalog is invalid")?);
    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            let db = Db::new(pool);
            db.run_migrations().await?;
            db.sync_catalog(&catalog).await?;
            info!("Database connection established and migrations are up-to-date.");
            Arc::new(db)
        }
        None => {
            warn!("DATABASE_URL is not set; progress is kept in memory and lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 4. Initialize Shared Services ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.openai_api_key)
        .with_api_base(&config.openai_api_base);
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let feedback: Arc<dyn FeedbackGenerator> =
        Arc::new(LLMFeedbackGenerator::new(llm_client.clone()));
    let coach = Arc::new(CourseCoach::new(llm_client));

    let voice: Arc<dyn VoiceProvider> =
        match (&config.elevenlabs_api_key, &config.elevenlabs_agent_id) {
            (Some(api_key), Some(agent_id)) => {
                Arc::new(ElevenLabsProvider::new(api_key.clone(), agent_id.clone()))
            }
            _ => {
                warn!("No voice vendor configured; conversations cannot be started.");
                Arc::new(UnconfiguredVoiceProvider)
            }
        };

    let keys: Arc<dyn KeyValidator> = Arc::new(HttpKeyValidator::default());
    let key_monitor = spawn_key_monitor(&config, keys.clone());

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        catalog,
        store,
        feedback,
        coach,
        voice,
        keys,
        key_monitor,
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        model = %config.chat_model,
        bind_address = %config.bind_address,
        persistent = config.database_url.is_some(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
