//! Turn submitted admin-form fields into a record body.

use crate::config::ListDescriptor;
use crate::item::value_to_plain_string;
use serde_json::{Map, Value};

/// Keys the admin form sends that are never record data.
pub const RESERVED_KEYS: &[&str] = &["_csrf", "action"];

#[derive(Default)]
struct SplitDateTime {
    date: Option<String>,
    time: Option<String>,
}

/// Merge `<base>_date` / `<base>_time` pairs into `<base>` ("date time") and drop reserved keys.
///
/// A key that is itself a declared field path is kept as is even when it ends in `_date` or `_time`.
/// A lone half is used on its own.
pub fn reconstruct(list: &ListDescriptor, raw: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut split: Vec<(String, SplitDateTime)> = Vec::new();
    for (key, value) in raw {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let part = key
            .rsplit_once('_')
            .filter(|(base, suffix)| !base.is_empty() && matches!(*suffix, "date" | "time"))
            .filter(|_| list.field(&key).is_none());
        let Some((base, suffix)) = part else {
            out.insert(key, value);
            continue;
        };
        let text = value_to_plain_string(&value).unwrap_or_default();
        let idx = match split.iter().position(|(b, _)| b == base) {
            Some(i) => i,
            None => {
                split.push((base.to_string(), SplitDateTime::default()));
                split.len() - 1
            }
        };
        let entry = &mut split[idx].1;
        if suffix == "date" {
            entry.date = Some(text);
        } else {
            entry.time = Some(text);
        }
    }
    for (base, parts) in split {
        let joined = format!(
            "{} {}",
            parts.date.unwrap_or_default(),
            parts.time.unwrap_or_default()
        );
        out.insert(base, Value::String(joined.trim().to_string()));
    }
    out
}
