//! Request-part extractors for the values the auth collaborators hand us.

mod actor;
mod csrf;

pub use actor::{ActorId, ACTOR_ID_HEADER};
pub use csrf::{CsrfToken, CSRF_TOKEN_HEADER};

use axum::http::request::Parts;

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
