use std::sync::Arc;

use devhub_api::app::app;
use devhub_api::config::AppConfig;
use devhub_api::database::postgres::PgStore;
use devhub_api::state::AppState;
use devhub_api::storage::{HttpStorage, MemoryStorage, ObjectStorage};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!("starting devhub-api in {:?} mode", config.environment);

    let storage: Arc<dyn ObjectStorage> = match HttpStorage::from_config(&config.storage) {
        Ok(http) => Arc::new(http),
        Err(_) => {
            tracing::warn!("STORAGE_ENDPOINT not set, uploads use the in-memory store");
            Arc::new(MemoryStorage::new())
        }
    };

    let state = match config.database.url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, &config.database)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
            store
                .ensure_schema()
                .await
                .unwrap_or_else(|e| panic!("failed to prepare database schema: {}", e));
            let store = Arc::new(store);
            AppState::new(config.clone(), store.clone(), store.clone(), store, storage)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on the in-memory backend");
            let mut state = AppState::in_memory(config.clone());
            state.storage = storage;
            state
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("devhub-api listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.expect("server");
}
