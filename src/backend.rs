//! The two places a list's records can live, bundled for the pagination engine and the dispatcher.

use crate::error::AppError;
use crate::rest::RestClient;
use crate::store::ListStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn ListStore>,
    pub rest: RestClient,
}

impl Backends {
    pub fn new(store: Arc<dyn ListStore>, timeout: Duration) -> Result<Self, AppError> {
        Ok(Backends {
            store,
            rest: RestClient::new(timeout)?,
        })
    }

    /// Ceiling applied to every store call and HTTP request.
    pub fn timeout(&self) -> Duration {
        self.rest.timeout()
    }
}
