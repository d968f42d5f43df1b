//! Flatten a [`FilterSpec`] into `key=value` query parameters for REST backends.

use super::{Condition, FilterSpec};
use crate::item::value_to_plain_string;
use serde_json::Value;

/// `$ne` is translated as the logical negation of the nested value, which only makes sense for
/// booleans (or their string spelling). Other values produce no parameter.
fn negate(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some((!b).to_string()),
        Value::String(s) => super::compiler::parse_bool(s).map(|b| (!b).to_string()),
        _ => None,
    }
}

fn render(condition: &Condition) -> Option<String> {
    match condition {
        Condition::Equals(v) => Some(value_to_plain_string(v).unwrap_or_else(|| v.to_string())),
        Condition::Contains(text) | Condition::Matches(text) => Some(text.clone()),
        Condition::NotEqual(v) => negate(v),
        Condition::Range(_) => None,
    }
}

/// Alternatives of the `$or` group first, then the top-level fields. Pairs that cannot be expressed
/// as a single parameter (ranges, non-boolean `$ne`) are skipped; duplicate pairs are kept once.
pub fn flatten_for_rest(spec: &FilterSpec) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let entries = spec
        .or
        .iter()
        .flat_map(|alt| alt.fields.iter())
        .chain(spec.fields.iter());
    for (key, condition) in entries {
        let Some(value) = render(condition) else {
            tracing::debug!(path = %key, "filter has no query-parameter form, skipping");
            continue;
        };
        let pair = (key.clone(), value);
        if !out.contains(&pair) {
            out.push(pair);
        }
    }
    out
}
