//! Extract the CSRF token from `X-CSRF-Token`.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const CSRF_TOKEN_HEADER: &str = "X-CSRF-Token";

#[derive(Clone, Debug)]
pub struct CsrfToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CsrfToken(super::header_value(parts, CSRF_TOKEN_HEADER)))
    }
}
