//! Hooks that translate backend-specific payloads into canonical items, counts and request bodies.

use super::envelope::{Envelope, EnvelopeOperation};
use crate::config::NormalizerConfig;
use crate::error::NormalizeError;
use crate::item::{json_kind, value_to_plain_string, Item};
use serde_json::{Map, Value};
use std::fmt;

/// Every REST-backed list supplies one of these. All backend-specific unwrapping lives here.
pub trait ResponseNormalizer: Send + Sync + fmt::Debug {
    /// Records in the payload. For `raw.operation == Item` this is a single-element sequence.
    fn get_response_data(&self, envelope: &Envelope) -> Result<Vec<Item>, NormalizeError>;

    /// Total number of matching records for a listing.
    fn count_response_data(&self, envelope: &Envelope) -> Result<u64, NormalizeError>;

    /// Map reconstructed form fields to the request body sent on create/update.
    fn prepare_request_data(&self, fields: Map<String, Value>) -> Result<Value, NormalizeError>;

    /// Rename or reshape one flattened filter parameter before it is appended to the query string.
    fn prepare_search_field(&self, key: String, value: String) -> (String, String) {
        (key, value)
    }

    /// Id of the record created by a create call, used to build the redirect target.
    fn created_id(&self, envelope: &Envelope) -> Option<String> {
        envelope.data.pointer("/result/id").and_then(value_to_plain_string)
    }
}

/// Normalizer driven by JSON pointers and key maps from the list config.
#[derive(Clone, Debug)]
pub struct PointerNormalizer {
    config: NormalizerConfig,
}

impl PointerNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        PointerNormalizer { config }
    }

    fn lookup<'a>(data: &'a Value, pointer: &str) -> Result<&'a Value, NormalizeError> {
        data.pointer(pointer)
            .ok_or_else(|| NormalizeError::new(format!("response has no value at '{}'", pointer)))
    }
}

/// Accepts non-negative integral numbers and numeric strings.
pub fn parse_count(value: &Value) -> Result<u64, NormalizeError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| NormalizeError::new(format!("count is not a non-negative integer: {}", value)))
}

impl ResponseNormalizer for PointerNormalizer {
    fn get_response_data(&self, envelope: &Envelope) -> Result<Vec<Item>, NormalizeError> {
        match envelope.operation() {
            EnvelopeOperation::Item => {
                let record = Self::lookup(&envelope.data, &self.config.item)?;
                Ok(vec![Item::from_value(record.clone())?])
            }
            EnvelopeOperation::Listing => {
                let records = Self::lookup(&envelope.data, &self.config.items)?;
                let Value::Array(records) = records else {
                    return Err(NormalizeError::new(format!(
                        "expected an array at '{}', got {}",
                        self.config.items,
                        json_kind(records)
                    )));
                };
                records.iter().cloned().map(Item::from_value).collect()
            }
        }
    }

    fn count_response_data(&self, envelope: &Envelope) -> Result<u64, NormalizeError> {
        match &self.config.count {
            Some(pointer) => parse_count(Self::lookup(&envelope.data, pointer)?),
            None => Ok(self.get_response_data(envelope)?.len() as u64),
        }
    }

    fn prepare_request_data(&self, fields: Map<String, Value>) -> Result<Value, NormalizeError> {
        let body: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| match self.config.request_fields.get(&k) {
                Some(renamed) => (renamed.clone(), v),
                None => (k, v),
            })
            .collect();
        Ok(match &self.config.request_wrapper {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), Value::Object(body));
                Value::Object(wrapped)
            }
            None => Value::Object(body),
        })
    }

    fn prepare_search_field(&self, key: String, value: String) -> (String, String) {
        match self.config.search_fields.get(&key) {
            Some(renamed) => (renamed.clone(), value),
            None => (key, value),
        }
    }

    fn created_id(&self, envelope: &Envelope) -> Option<String> {
        envelope.data.pointer(&self.config.created_id).and_then(value_to_plain_string)
    }
}
