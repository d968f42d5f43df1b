//! Example server: loads `lists.json` from `LISTS_PATH`, picks PostgreSQL when `DATABASE_URL` is set
//! (in-memory store otherwise), and mounts the common and list routes.

use admin_list_adapter::{
    app, load_from_dir, resolve_with, AdapterSettings, AppState, CsrfValidator, HookRegistry, ListStore,
    MemoryListStore, NoCsrf, PgListStore, SharedSecretCsrf,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("admin_list_adapter=info".parse()?))
        .init();

    let settings = AdapterSettings::from_env()?;
    let lists_path = std::env::var("LISTS_PATH").unwrap_or_else(|_| "demos/lists".into());
    let config = load_from_dir(&lists_path).await?;
    let registry = resolve_with(&config, &HookRegistry::new(), settings.per_page)?;
    tracing::info!(lists = registry.lists.len(), path = %lists_path, "lists resolved");

    let store: Arc<dyn ListStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await?;
            Arc::new(PgListStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryListStore::new())
        }
    };
    let csrf: Arc<dyn CsrfValidator> = match SharedSecretCsrf::from_env() {
        Some(v) => Arc::new(v),
        None => Arc::new(NoCsrf),
    };

    let state = AppState::new(registry, store, csrf, settings)?;
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
