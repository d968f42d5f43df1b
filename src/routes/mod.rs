//! Router construction.

mod common;
mod lists;

pub use common::common_routes;
pub use lists::{list_routes, MAX_BODY_BYTES};

use crate::state::AppState;
use axum::Router;

/// Common routes at the root, list routes under the configured path prefix (`/` when empty).
pub fn app(state: AppState) -> Router {
    let prefix = state.settings.path_prefix.trim_end_matches('/').to_string();
    let lists = list_routes(state.clone());
    let router = common_routes(state);
    if prefix.is_empty() {
        router.merge(lists)
    } else {
        router.nest(&prefix, lists)
    }
}
