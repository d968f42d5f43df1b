//! Shared fixtures: list descriptors, an instrumented store and a recording mock REST backend.

#![allow(dead_code)]

use admin_list_adapter::config::{resolve_list, ListConfig};
use admin_list_adapter::{
    AdapterSettings, AppError, AppState, CsrfValidator, FilterSpec, Item, ListDescriptor, ListRegistry, ListStore,
    MemoryListStore, NoCsrf, SortSpec,
};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn posts() -> ListDescriptor {
    let cfg: ListConfig = serde_json::from_value(json!({
        "key": "Post",
        "name_field": "title",
        "fields": [
            { "path": "title", "label": "Title" },
            { "path": "state", "type": "select", "options": ["draft", "published"] },
            { "path": "rank", "type": "number" },
            { "path": "start", "type": "datetime" },
            { "path": "featured", "type": "boolean" }
        ],
        "search_fields": "title",
        "default_sort": "rank"
    }))
    .unwrap();
    resolve_list(&cfg, None).unwrap()
}

pub fn users() -> ListDescriptor {
    let cfg: ListConfig = serde_json::from_value(json!({
        "key": "User",
        "name_field": "email",
        "id_type": "text",
        "fields": [{ "path": "email", "type": "email" }]
    }))
    .unwrap();
    resolve_list(&cfg, None).unwrap()
}

/// REST-backed list pointing at a [`MockBackend`].
pub fn events(base: &str) -> ListDescriptor {
    let endpoint = format!("{}/events", base);
    let cfg: ListConfig = serde_json::from_value(json!({
        "key": "Event",
        "name_field": "name",
        "use_api": true,
        "fields": [
            { "path": "name" },
            { "path": "location" },
            { "path": "start", "type": "datetime" },
            { "path": "archived", "type": "boolean" }
        ],
        "search_fields": ["name", "location"],
        "api_details": {
            "read": {
                "endpoint": endpoint,
                "params": { "limit": "limit", "offset": "offset", "search_by_field": true, "primary_key": "_id" }
            },
            "create": { "endpoint": endpoint },
            "update": { "endpoint": endpoint, "method": "patch" },
            "delete": { "endpoint": endpoint, "method": "delete" }
        },
        "normalizer": {
            "items": "/data",
            "item": "/data",
            "count": "/meta/total",
            "created_id": "/data/_id",
            "request_wrapper": "data"
        }
    }))
    .unwrap();
    resolve_list(&cfg, None).unwrap()
}

pub fn records(n: usize) -> Vec<Item> {
    (1..=n)
        .map(|i| Item::from_value(json!({ "id": i, "title": format!("post {}", i), "rank": i })).unwrap())
        .collect()
}

pub fn settings() -> AdapterSettings {
    AdapterSettings {
        timeout: Duration::from_secs(5),
        path_prefix: "/keystone".into(),
        ..AdapterSettings::default()
    }
}

pub fn state_with(lists: Vec<ListDescriptor>, store: Arc<dyn ListStore>, csrf: Arc<dyn CsrfValidator>) -> AppState {
    AppState::new(ListRegistry::new(lists), store, csrf, settings()).unwrap()
}

pub fn state_with_timeout(lists: Vec<ListDescriptor>, store: Arc<dyn ListStore>, timeout: Duration) -> AppState {
    let settings = AdapterSettings { timeout, ..settings() };
    AppState::new(ListRegistry::new(lists), store, Arc::new(NoCsrf), settings).unwrap()
}

pub fn state(lists: Vec<ListDescriptor>, store: Arc<dyn ListStore>) -> AppState {
    state_with(lists, store, Arc::new(NoCsrf))
}

/// Memory store that counts calls, tracks peak concurrent deletes and fails deletes of chosen ids.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryListStore,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl CountingStore {
    pub fn new() -> Self {
        CountingStore::default()
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ListStore for CountingStore {
    async fn count(&self, list: &ListDescriptor, filters: &FilterSpec) -> Result<u64, AppError> {
        self.touch();
        self.inner.count(list, filters).await
    }

    async fn find_page(
        &self,
        list: &ListDescriptor,
        filters: &FilterSpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Item>, AppError> {
        self.touch();
        self.inner.find_page(list, filters, sort, skip, limit).await
    }

    async fn find_by_id(&self, list: &ListDescriptor, id: &str) -> Result<Option<Item>, AppError> {
        self.touch();
        self.inner.find_by_id(list, id).await
    }

    async fn insert(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<Item, AppError> {
        self.touch();
        self.inner.insert(list, fields).await
    }

    async fn update(&self, list: &ListDescriptor, id: &str, fields: &Map<String, Value>) -> Result<Option<Item>, AppError> {
        self.touch();
        self.inner.update(list, id, fields).await
    }

    async fn delete(&self, list: &ListDescriptor, id: &str) -> Result<bool, AppError> {
        self.touch();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(15)).await;
        let fail = self.failing.lock().unwrap().contains(id);
        let res = if fail {
            Err(AppError::Backend(format!("cannot delete {}", id)))
        } else {
            self.inner.delete(list, id).await
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    async fn update_all(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<u64, AppError> {
        self.touch();
        self.inner.update_all(list, fields).await
    }
}

pub const SLOW_RESPONSE: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

/// Events API that records every request. Listing reports a total of 42.
/// Paths under `/slow` answer the same way after [`SLOW_RESPONSE`].
#[derive(Clone, Default)]
pub struct MockBackend {
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Serve on an ephemeral port; returns the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new().fallback(mock_handler).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn mock_handler(State(mock): State<MockBackend>, method: Method, uri: Uri, body: String) -> Response {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        body: serde_json::from_str(&body).ok(),
    });
    let route = match path.strip_prefix("/slow") {
        Some(rest) => {
            tokio::time::sleep(SLOW_RESPONSE).await;
            rest
        }
        None => path.as_str(),
    };
    let id = route.strip_prefix("/events/").map(str::to_string);
    match (method, id) {
        (Method::GET, None) => Json(json!({
            "data": [
                { "_id": "e1", "name": "Launch", "location": "Berlin" },
                { "_id": "e2", "name": "Meetup", "location": "Oslo" }
            ],
            "meta": { "total": 42 }
        }))
        .into_response(),
        (Method::GET, Some(id)) if id == "missing" => StatusCode::NOT_FOUND.into_response(),
        (Method::GET, Some(id)) => Json(json!({ "data": { "_id": id, "name": "Launch" } })).into_response(),
        (Method::POST, None) => (StatusCode::CREATED, Json(json!({ "data": { "_id": "e9" } }))).into_response(),
        (Method::PATCH, Some(_)) => Json(json!({ "ok": true })).into_response(),
        (Method::DELETE, Some(_)) => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
