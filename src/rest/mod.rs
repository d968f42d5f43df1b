//! REST-backed lists: envelopes, normalizer hooks and the outbound client.

mod client;
mod envelope;
mod normalizer;

pub use client::RestClient;
pub use envelope::{Envelope, EnvelopeOperation, RawContext};
pub use normalizer::{parse_count, PointerNormalizer, ResponseNormalizer};

/// Append `key=value` pairs to an endpoint, keeping any query string it already has.
/// Keys and values are percent-encoded (space as `%20`).
pub fn append_query(endpoint: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let joined = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}{}", endpoint, sep, joined)
}
