//! Shared application state for all routes. Lists are resolved once at startup and read-only afterwards.

use crate::auth::CsrfValidator;
use crate::backend::Backends;
use crate::config::{AdapterSettings, ListDescriptor, ListRegistry};
use crate::error::AppError;
use crate::service::CrudDispatcher;
use crate::store::ListStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ListRegistry>,
    pub dispatcher: CrudDispatcher,
    pub settings: Arc<AdapterSettings>,
}

impl AppState {
    pub fn new(
        registry: ListRegistry,
        store: Arc<dyn ListStore>,
        csrf: Arc<dyn CsrfValidator>,
        settings: AdapterSettings,
    ) -> Result<Self, AppError> {
        let backends = Backends::new(store, settings.timeout)?;
        let dispatcher = CrudDispatcher::new(backends, csrf, settings.path_prefix.clone());
        Ok(AppState {
            registry: Arc::new(registry),
            dispatcher,
            settings: Arc::new(settings),
        })
    }

    /// List by URL path segment.
    pub fn list(&self, path: &str) -> Result<Arc<ListDescriptor>, AppError> {
        self.registry
            .by_path(path)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("list {}", path)))
    }
}
