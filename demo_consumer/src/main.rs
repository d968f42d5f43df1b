//! Example consumer: embeds the adapter and registers a normalizer hook for a backend that nests
//! record fields under `attributes` (`{"data": [{"id": 1, "attributes": {...}}], "meta": {"total": 9}}`).
//!
//! Run from repo root: `cargo run -p demo-consumer`

use admin_list_adapter::rest::EnvelopeOperation;
use admin_list_adapter::{
    app, load_from_dir, resolve_with, AdapterSettings, AppState, Envelope, HookRegistry, Item, MemoryListStore,
    NoCsrf, NormalizeError, ResponseNormalizer,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
struct AttributesNormalizer;

impl AttributesNormalizer {
    fn flatten(record: &Value) -> Result<Item, NormalizeError> {
        let mut fields = record
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(id) = record.get("id") {
            fields.insert("id".into(), id.clone());
        }
        Item::from_value(Value::Object(fields))
    }
}

impl ResponseNormalizer for AttributesNormalizer {
    fn get_response_data(&self, envelope: &Envelope) -> Result<Vec<Item>, NormalizeError> {
        let data = envelope.data.get("data").unwrap_or(&Value::Null);
        match (envelope.operation(), data) {
            (EnvelopeOperation::Item, record) => Ok(vec![Self::flatten(record)?]),
            (EnvelopeOperation::Listing, Value::Array(records)) => records.iter().map(Self::flatten).collect(),
            (EnvelopeOperation::Listing, other) => Err(NormalizeError::new(format!("expected data array, got {}", other))),
        }
    }

    fn count_response_data(&self, envelope: &Envelope) -> Result<u64, NormalizeError> {
        match envelope.data.pointer("/meta/total") {
            Some(total) => admin_list_adapter::rest::parse_count(total),
            None => Ok(self.get_response_data(envelope)?.len() as u64),
        }
    }

    fn prepare_request_data(&self, fields: Map<String, Value>) -> Result<Value, NormalizeError> {
        Ok(serde_json::json!({ "data": { "attributes": fields } }))
    }

    fn prepare_search_field(&self, key: String, value: String) -> (String, String) {
        (format!("filter[{}]", key), value)
    }

    fn created_id(&self, envelope: &Envelope) -> Option<String> {
        envelope.data.pointer("/data/id").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("admin_list_adapter=info")),
        )
        .init();

    let settings = AdapterSettings::from_env()?;
    let lists_path = std::env::var("LISTS_PATH").unwrap_or_else(|_| "demos/lists".into());
    let config = load_from_dir(&lists_path).await?;
    let mut hooks = HookRegistry::new();
    hooks.insert("Event".into(), Arc::new(AttributesNormalizer));
    let registry = resolve_with(&config, &hooks, settings.per_page)?;

    let state = AppState::new(registry, Arc::new(MemoryListStore::new()), Arc::new(NoCsrf), settings)?;
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
