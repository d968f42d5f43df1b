//! Backend-neutral filter tree: per-field conditions ANDed together plus one `$or` group.

mod compiler;
mod flatten;

pub use compiler::{get_search_filters, process_filter_pairs, process_filters};
pub(crate) use compiler::parse_bool;
pub use flatten::flatten_for_rest;

use crate::item::{value_to_plain_string, Item};
use serde_json::Value;
use std::cmp::Ordering;

/// Reserved key of the alternatives group in the serialized form.
pub const OR_KEY: &str = "$or";

/// Inclusive/exclusive bounds of a range comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Literal equality.
    Equals(Value),
    /// Case-insensitive substring.
    Contains(String),
    /// Case-insensitive regular expression (source pattern).
    Matches(String),
    /// `$ne`: not equal to the nested value.
    NotEqual(Value),
    Range(RangeBounds),
}

impl Condition {
    /// Evaluate against a record value; used by stores that filter in memory.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Equals(expected) => value.map(|v| loose_eq(v, expected)).unwrap_or(false),
            Condition::NotEqual(expected) => !value.map(|v| loose_eq(v, expected)).unwrap_or(false),
            Condition::Contains(needle) => value
                .and_then(value_to_plain_string)
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Condition::Matches(pattern) => {
                let Ok(re) = regex::RegexBuilder::new(pattern).case_insensitive(true).build() else {
                    return false;
                };
                value.and_then(value_to_plain_string).map(|s| re.is_match(&s)).unwrap_or(false)
            }
            Condition::Range(b) => {
                let Some(v) = value else { return false };
                let ok = |bound: &Option<Value>, accept: &[Ordering]| match bound {
                    None => true,
                    Some(bound) => compare(v, bound).map(|o| accept.contains(&o)).unwrap_or(false),
                };
                ok(&b.gt, &[Ordering::Greater])
                    && ok(&b.gte, &[Ordering::Greater, Ordering::Equal])
                    && ok(&b.lt, &[Ordering::Less])
                    && ok(&b.lte, &[Ordering::Less, Ordering::Equal])
            }
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (value_to_plain_string(a), value_to_plain_string(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Numeric when both sides are numbers, otherwise by plain-string form.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(value_to_plain_string(a)?.cmp(&value_to_plain_string(b)?)),
    }
}

/// Filter constraints for one list request. Keys of `fields` are valid field paths of the list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    pub fields: Vec<(String, Condition)>,
    /// Alternatives; a record matches when it matches any of them. Empty = no constraint.
    pub or: Vec<FilterSpec>,
}

impl FilterSpec {
    pub fn new() -> Self {
        FilterSpec::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.or.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Condition> {
        self.fields.iter().find(|(p, _)| p == path).map(|(_, c)| c)
    }

    /// Add or replace the condition on `path`.
    pub fn insert(&mut self, path: impl Into<String>, condition: Condition) {
        let path = path.into();
        match self.fields.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = condition,
            None => self.fields.push((path, condition)),
        }
    }

    pub fn with(mut self, path: impl Into<String>, condition: Condition) -> Self {
        self.insert(path, condition);
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.fields.iter().all(|(p, c)| c.matches(item.get(p)))
            && (self.or.is_empty() || self.or.iter().any(|alt| alt.matches(item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: Value) -> Item {
        Item::from_value(v).unwrap()
    }

    #[test]
    fn conditions_evaluate_in_memory() {
        let rec = item(json!({ "name": "Jane Doe", "age": 31, "active": true, "joined": "2023-05-01" }));
        assert!(Condition::Contains("doe".into()).matches(rec.get("name")));
        assert!(Condition::Matches("^jane".into()).matches(rec.get("name")));
        assert!(Condition::Equals(json!("31")).matches(rec.get("age")));
        assert!(Condition::NotEqual(json!(false)).matches(rec.get("active")));
        assert!(!Condition::Equals(json!("x")).matches(rec.get("missing")));
        let range = Condition::Range(RangeBounds { gte: Some(json!(30)), lt: Some(json!(40)), ..Default::default() });
        assert!(range.matches(rec.get("age")));
        let dates = Condition::Range(RangeBounds { gt: Some(json!("2023-06-01")), ..Default::default() });
        assert!(!dates.matches(rec.get("joined")));
    }

    #[test]
    fn or_group_is_anded_with_fields() {
        let mut spec = FilterSpec::new().with("active", Condition::Equals(json!(true)));
        spec.or = vec![
            FilterSpec::new().with("name", Condition::Contains("zed".into())),
            FilterSpec::new().with("email", Condition::Contains("jane".into())),
        ];
        assert!(spec.matches(&item(json!({ "active": true, "name": "Jane", "email": "jane@x.io" }))));
        assert!(!spec.matches(&item(json!({ "active": false, "name": "Jane", "email": "jane@x.io" }))));
        assert!(!spec.matches(&item(json!({ "active": true, "name": "Jane", "email": "j@x.io" }))));
    }
}
