//! List admin routes. The first path segment is the list's URL path; handlers resolve it per request.

use crate::handlers::lists::{bulk_delete, create, delete, index, list, read, update, update_all};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Upper bound on JSON request bodies.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn list_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/:list", get(list).post(create))
        .route("/:list/delete", post(bulk_delete))
        .route("/:list/update-all", post(update_all))
        .route("/:list/:id", get(read).patch(update).put(update).delete(delete))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
