//! Wrapper handed to normalizer hooks: the raw backend body plus request context.

use serde::Serialize;
use serde_json::Value;

/// Lets one hook implementation tell single-item responses from listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeOperation {
    Item,
    Listing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawContext {
    pub operation: EnvelopeOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// `key=value` query parameters sent with the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

/// `{data: <raw backend body>, raw: {operation, ...context}}`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Envelope {
    pub data: Value,
    pub raw: RawContext,
}

impl Envelope {
    pub fn item(data: Value, url: impl Into<String>, method: &str) -> Self {
        Envelope {
            data,
            raw: RawContext {
                operation: EnvelopeOperation::Item,
                url: Some(url.into()),
                method: Some(method.to_string()),
                params: Vec::new(),
            },
        }
    }

    pub fn listing(data: Value, url: impl Into<String>, method: &str, params: Vec<String>) -> Self {
        Envelope {
            data,
            raw: RawContext {
                operation: EnvelopeOperation::Listing,
                url: Some(url.into()),
                method: Some(method.to_string()),
                params,
            },
        }
    }

    pub fn operation(&self) -> EnvelopeOperation {
        self.raw.operation
    }
}
