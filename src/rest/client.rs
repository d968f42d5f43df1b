//! Thin wrapper over `reqwest::Client` for calls to list backends.

use crate::config::HttpVerb;
use crate::deadline::bounded;
use crate::error::AppError;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl RestClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Backend(format!("http client: {}", e)))?;
        Ok(RestClient { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a JSON document. A body that is not JSON is a backend error.
    pub async fn get_json(&self, url: &str, cancel: &CancellationToken) -> Result<Value, AppError> {
        let bytes = self.fetch(HttpVerb::Get, url, None, cancel).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Backend(format!("GET {} returned invalid JSON: {}", url, e)))
    }

    /// Write call. Empty or non-JSON bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        verb: HttpVerb,
        url: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Value, AppError> {
        let bytes = self.fetch(verb, url, body, cancel).await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(%url, method = %verb, error = %e, bytes = bytes.len(), "response body is not JSON");
            Value::Null
        }))
    }

    async fn fetch(
        &self,
        verb: HttpVerb,
        url: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AppError> {
        tracing::debug!(%url, method = %verb, "backend request");
        let mut req = self
            .http
            .request(verb.to_method(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }
        bounded(cancel, self.timeout, async move {
            let resp = req.send().await?.error_for_status()?;
            Ok(resp.bytes().await?.to_vec())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn gets_json_and_maps_error_status() {
        let app = Router::new()
            .route("/ok", get(|| async { Json(json!({ "results": [] })) }))
            .route("/boom", get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "no") }));
        let base = serve(app).await;
        let client = RestClient::new(Duration::from_secs(5)).unwrap();
        let cancel = CancellationToken::new();
        let body = client.get_json(&format!("{}/ok", base), &cancel).await.unwrap();
        assert_eq!(body, json!({ "results": [] }));
        let err = client.get_json(&format!("{}/boom", base), &cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Backend(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn non_json_write_response_is_null() {
        let app = Router::new().route(
            "/x",
            axum::routing::delete(|| async { "deleted" })
                .post(|| async { axum::response::Html("<html>maintenance</html>") }),
        );
        let base = serve(app).await;
        let client = RestClient::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/x", base);
        let cancel = CancellationToken::new();
        let out = client.send(HttpVerb::Delete, &url, None, &cancel).await.unwrap();
        assert_eq!(out, Value::Null);
        let created = client
            .send(HttpVerb::Post, &url, Some(&json!({ "name": "x" })), &cancel)
            .await
            .unwrap();
        assert_eq!(created, Value::Null);
    }
}
