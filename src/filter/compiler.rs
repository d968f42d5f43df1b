//! Query-string filters and free-text search compiled into a [`FilterSpec`].
//!
//! Filter tokens look like `path:expr`, separated by `;`. The expression grammar depends on the
//! field type:
//!
//! | type | forms |
//! |---|---|
//! | text, email | `abc` (contains), `=abc` (exact), `!abc` (not equal), `~^a.c` (regex) |
//! | select | `value`, `!value` |
//! | number | `5`, `!5`, `>5`, `>=5`, `<5`, `<=5`, `1..10` |
//! | boolean | `true`/`false` (also yes/no, 1/0, on/off), `!true` |
//! | date, datetime | `2024-01-31`, `>2024-01-01`, `<=2024-02-01`, `2024-01-01..2024-01-31` |
//!
//! Anything that does not parse is dropped: a malformed filter means no filter.

use super::{Condition, FilterSpec, RangeBounds, OR_KEY};
use crate::config::{FieldType, ListDescriptor, ID_PATH};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Parse a `q` string of `path:expr` tokens separated by `;`.
pub fn process_filters(list: &ListDescriptor, raw: Option<&str>) -> FilterSpec {
    let Some(raw) = raw else {
        return FilterSpec::new();
    };
    let pairs = raw.split(';').filter_map(|token| {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        match token.split_once(':') {
            Some((path, expr)) => Some((path.trim(), expr.trim())),
            None => {
                tracing::debug!(list = %list.key, token, "dropping filter token without ':'");
                None
            }
        }
    });
    process_filter_pairs(list, pairs)
}

/// Compile `(path, expr)` pairs. Unknown paths and unparseable expressions are dropped.
pub fn process_filter_pairs<'a>(
    list: &ListDescriptor,
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> FilterSpec {
    let mut spec = FilterSpec::new();
    for (path, expr) in pairs {
        if path == OR_KEY {
            continue;
        }
        let field_type = if path == ID_PATH {
            Some(FieldType::Text)
        } else {
            list.field(path).map(|f| f.field_type.clone())
        };
        let Some(field_type) = field_type else {
            tracing::debug!(list = %list.key, path, "dropping filter on unknown path");
            continue;
        };
        let condition = if path == ID_PATH {
            non_empty(expr).map(|v| Condition::Equals(Value::String(v.to_string())))
        } else {
            compile(&field_type, expr)
        };
        match condition {
            Some(c) => spec.insert(path, c),
            None => tracing::debug!(list = %list.key, path, expr, "dropping malformed filter"),
        }
    }
    spec
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s.trim()).filter(|s| !s.is_empty())
}

fn compile(field_type: &FieldType, expr: &str) -> Option<Condition> {
    let expr = non_empty(expr)?;
    match field_type {
        FieldType::Text | FieldType::Email => {
            if let Some(rest) = expr.strip_prefix('=') {
                non_empty(rest).map(|v| Condition::Equals(Value::String(v.to_string())))
            } else if let Some(rest) = expr.strip_prefix('!') {
                non_empty(rest).map(|v| Condition::NotEqual(Value::String(v.to_string())))
            } else if let Some(rest) = expr.strip_prefix('~') {
                let pattern = non_empty(rest)?;
                regex::Regex::new(pattern).ok()?;
                Some(Condition::Matches(pattern.to_string()))
            } else {
                Some(Condition::Contains(expr.to_string()))
            }
        }
        FieldType::Select(options) => {
            let (negate, value) = match expr.strip_prefix('!') {
                Some(rest) => (true, non_empty(rest)?),
                None => (false, expr),
            };
            if !options.is_empty() && !options.iter().any(|o| o == value) {
                return None;
            }
            let value = Value::String(value.to_string());
            Some(if negate { Condition::NotEqual(value) } else { Condition::Equals(value) })
        }
        FieldType::Boolean => {
            let (negate, value) = match expr.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, expr),
            };
            let b = parse_bool(value)?;
            Some(if negate {
                Condition::NotEqual(Value::Bool(b))
            } else {
                Condition::Equals(Value::Bool(b))
            })
        }
        FieldType::Number => compile_ordered(expr, parse_number),
        FieldType::Date => compile_ordered(expr, |s| parse_date(s).map(|d| Value::String(d.to_string()))),
        FieldType::Datetime => compile_datetime(expr),
        FieldType::Json => None,
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok()?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Equality, negation, comparisons and `a..b` ranges over an ordered type.
fn compile_ordered(expr: &str, parse: impl Fn(&str) -> Option<Value>) -> Option<Condition> {
    if let Some((lo, hi)) = expr.split_once("..") {
        return Some(Condition::Range(RangeBounds {
            gte: Some(parse(lo)?),
            lte: Some(parse(hi)?),
            ..Default::default()
        }));
    }
    if let Some(rest) = expr.strip_prefix(">=") {
        return Some(Condition::Range(RangeBounds { gte: Some(parse(rest)?), ..Default::default() }));
    }
    if let Some(rest) = expr.strip_prefix("<=") {
        return Some(Condition::Range(RangeBounds { lte: Some(parse(rest)?), ..Default::default() }));
    }
    if let Some(rest) = expr.strip_prefix('>') {
        return Some(Condition::Range(RangeBounds { gt: Some(parse(rest)?), ..Default::default() }));
    }
    if let Some(rest) = expr.strip_prefix('<') {
        return Some(Condition::Range(RangeBounds { lt: Some(parse(rest)?), ..Default::default() }));
    }
    if let Some(rest) = expr.strip_prefix('!') {
        return Some(Condition::NotEqual(parse(rest)?));
    }
    Some(Condition::Equals(parse(expr)?))
}

/// Datetimes accept RFC 3339 instants or plain dates; a plain date means the whole UTC day.
fn compile_datetime(expr: &str) -> Option<Condition> {
    let instant = |s: &str| -> Option<Value> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
            return Some(Value::String(dt.to_rfc3339()));
        }
        parse_date(s).map(|d| Value::String(format!("{}T00:00:00+00:00", d)))
    };
    if let Some(d) = parse_date(expr) {
        let next = d.succ_opt()?;
        return Some(Condition::Range(RangeBounds {
            gte: Some(Value::String(format!("{}T00:00:00+00:00", d))),
            lt: Some(Value::String(format!("{}T00:00:00+00:00", next))),
            ..Default::default()
        }));
    }
    compile_ordered(expr, instant)
}

/// Add a free-text search group: one case-insensitive alternative per search field, ANDed with `base`.
/// With `use_regex` the text is used as a regular expression (falling back to substring when it is invalid).
pub fn get_search_filters(list: &ListDescriptor, search: Option<&str>, base: FilterSpec, use_regex: bool) -> FilterSpec {
    let Some(text) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return base;
    };
    let condition = if use_regex && regex::Regex::new(text).is_ok() {
        Condition::Matches(text.to_string())
    } else {
        Condition::Contains(text.to_string())
    };
    let alternatives: Vec<FilterSpec> = list
        .search_fields
        .iter()
        .map(|path| FilterSpec::new().with(path.clone(), condition.clone()))
        .collect();
    if alternatives.is_empty() {
        return base;
    }

    let FilterSpec { fields, or } = base;
    let or = if or.is_empty() {
        alternatives
    } else {
        // (a | b) & (c | d) == ac | ad | bc | bd
        let mut product = Vec::with_capacity(or.len() * alternatives.len());
        for existing in &or {
            for alt in &alternatives {
                let mut merged = existing.clone();
                for (p, c) in &alt.fields {
                    merged.insert(p.clone(), c.clone());
                }
                product.push(merged);
            }
        }
        product
    };
    FilterSpec { fields, or }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_list, ListConfig};
    use serde_json::json;

    fn people() -> ListDescriptor {
        let cfg: ListConfig = serde_json::from_value(json!({
            "key": "Person",
            "name_field": "name",
            "search_fields": "name, email",
            "fields": [
                { "path": "name" },
                { "path": "email", "type": "email" },
                { "path": "age", "type": "number" },
                { "path": "active", "type": "boolean" },
                { "path": "role", "type": "select", "options": ["admin", "staff"] },
                { "path": "born", "type": "date" },
                { "path": "seen", "type": "datetime" },
                { "path": "meta", "type": "json" }
            ]
        }))
        .unwrap();
        resolve_list(&cfg, None).unwrap()
    }

    #[test]
    fn compiles_typed_conditions() {
        let list = people();
        let spec = process_filters(
            &list,
            Some("name:ann; email:=a@b.io; age:18..30; active:no; role:!admin; born:>2000-01-01"),
        );
        assert_eq!(spec.get("name"), Some(&Condition::Contains("ann".into())));
        assert_eq!(spec.get("email"), Some(&Condition::Equals(json!("a@b.io"))));
        assert_eq!(
            spec.get("age"),
            Some(&Condition::Range(RangeBounds { gte: Some(json!(18)), lte: Some(json!(30)), ..Default::default() }))
        );
        assert_eq!(spec.get("active"), Some(&Condition::Equals(json!(false))));
        assert_eq!(spec.get("role"), Some(&Condition::NotEqual(json!("admin"))));
        assert_eq!(
            spec.get("born"),
            Some(&Condition::Range(RangeBounds { gt: Some(json!("2000-01-01")), ..Default::default() }))
        );
    }

    #[test]
    fn malformed_and_unknown_filters_degrade_to_no_filter() {
        let list = people();
        let spec = process_filters(
            &list,
            Some("bogus:1; age:old; active:maybe; role:owner; meta:{}; name:~(unclosed; seen:yesterday; nocolon"),
        );
        assert!(spec.is_empty(), "{:?}", spec);
    }

    #[test]
    fn plain_date_on_datetime_covers_whole_day() {
        let list = people();
        let spec = process_filters(&list, Some("seen:2024-02-29"));
        assert_eq!(
            spec.get("seen"),
            Some(&Condition::Range(RangeBounds {
                gte: Some(json!("2024-02-29T00:00:00+00:00")),
                lt: Some(json!("2024-03-01T00:00:00+00:00")),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn search_builds_or_group_and_keeps_base_filters() {
        let list = people();
        let base = process_filters(&list, Some("active:true"));
        let spec = get_search_filters(&list, Some(" jo "), base, false);
        assert_eq!(spec.get("active"), Some(&Condition::Equals(json!(true))));
        assert_eq!(
            spec.or,
            vec![
                FilterSpec::new().with("name", Condition::Contains("jo".into())),
                FilterSpec::new().with("email", Condition::Contains("jo".into())),
            ]
        );
    }

    #[test]
    fn empty_search_returns_base_unchanged() {
        let list = people();
        let base = process_filters(&list, Some("age:3"));
        assert_eq!(get_search_filters(&list, Some("   "), base.clone(), true), base);
        assert_eq!(get_search_filters(&list, None, base.clone(), false), base);
    }

    #[test]
    fn regex_search_falls_back_to_substring_when_invalid() {
        let list = people();
        let spec = get_search_filters(&list, Some("^j.*n$"), FilterSpec::new(), true);
        assert_eq!(spec.or[0].get("name"), Some(&Condition::Matches("^j.*n$".into())));
        let spec = get_search_filters(&list, Some("a(b"), FilterSpec::new(), true);
        assert_eq!(spec.or[0].get("name"), Some(&Condition::Contains("a(b".into())));
    }
}
