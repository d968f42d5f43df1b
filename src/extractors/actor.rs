//! Extract the authenticated actor id (set by the session layer as `X-Actor-Id`).

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";

/// Id of the signed-in user, if any. Used by the self-delete guard.
#[derive(Clone, Debug)]
pub struct ActorId(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ActorId(super::header_value(parts, ACTOR_ID_HEADER)))
    }
}
