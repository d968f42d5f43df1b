//! Native-store field checks: values are validated against declared field types and coerced.

use crate::config::{FieldSpec, FieldType, ListDescriptor, ID_PATH};
use crate::error::AppError;
use crate::filter::parse_bool;
use crate::item::value_to_plain_string;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// All writes of a new record; the name field must be present.
    Create,
    /// Partial writes; only present fields are checked.
    Update,
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %I:%M %p", "%Y-%m-%dT%H:%M:%S"];

pub struct FieldValidator;

impl FieldValidator {
    /// Coerce form values to the JSON type of their field. Unknown keys pass through untouched.
    pub fn coerce(list: &ListDescriptor, fields: Map<String, Value>, mode: WriteMode) -> Result<Map<String, Value>, AppError> {
        if mode == WriteMode::Create && list.name_path != ID_PATH {
            let missing = fields
                .get(&list.name_path)
                .map(|v| v.is_null() || value_to_plain_string(v).is_some_and(|s| s.trim().is_empty()))
                .unwrap_or(true);
            if missing {
                let label = list.field(&list.name_path).map(|f| f.label.as_str()).unwrap_or(&list.name_path);
                return Err(AppError::Validation(format!("{} is required.", label)));
            }
        }
        let mut out = Map::new();
        for (key, value) in fields {
            let value = match list.field(&key) {
                Some(spec) => coerce_field(spec, value)?,
                None => value,
            };
            out.insert(key, value);
        }
        Ok(out)
    }
}

fn invalid(spec: &FieldSpec, what: &str) -> AppError {
    AppError::Validation(format!("{} must be {}", spec.label, what))
}

fn coerce_field(spec: &FieldSpec, v: Value) -> Result<Value, AppError> {
    if v.is_null() {
        return Ok(v);
    }
    let text = value_to_plain_string(&v);
    // Empty form inputs clear the field.
    if text.as_deref().is_some_and(|s| s.trim().is_empty()) && spec.field_type != FieldType::Text {
        return Ok(Value::Null);
    }
    match &spec.field_type {
        FieldType::Text => Ok(v),
        FieldType::Email => match text {
            Some(s) if s.contains('@') && s.len() >= 3 => Ok(Value::String(s)),
            _ => Err(invalid(spec, "a valid email")),
        },
        FieldType::Number => {
            if v.is_number() {
                return Ok(v);
            }
            text.and_then(|s| s.trim().parse::<f64>().ok())
                .and_then(|n| {
                    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                        Some(Value::from(n as i64))
                    } else {
                        Number::from_f64(n).map(Value::Number)
                    }
                })
                .ok_or_else(|| invalid(spec, "a number"))
        }
        FieldType::Boolean => text
            .as_deref()
            .and_then(parse_bool)
            .map(Value::Bool)
            .ok_or_else(|| invalid(spec, "true or false")),
        FieldType::Date => text
            .filter(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok())
            .map(|s| Value::String(s.trim().to_string()))
            .ok_or_else(|| invalid(spec, "a date (YYYY-MM-DD)")),
        FieldType::Datetime => text
            .filter(|s| is_datetime(s.trim()))
            .map(|s| Value::String(s.trim().to_string()))
            .ok_or_else(|| invalid(spec, "a date and time")),
        FieldType::Select(options) => match text {
            Some(s) if options.contains(&s) => Ok(Value::String(s)),
            _ => Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                spec.label,
                options.iter().take(5).collect::<Vec<_>>()
            ))),
        },
        FieldType::Json => match v {
            Value::String(s) => serde_json::from_str(&s).map_err(|_| invalid(spec, "valid JSON")),
            other => Ok(other),
        },
    }
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DATETIME_FORMATS.iter().any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_list, ListConfig};
    use serde_json::json;

    fn tickets() -> ListDescriptor {
        let cfg: ListConfig = serde_json::from_value(json!({
            "key": "Ticket",
            "name_field": "title",
            "fields": [
                { "path": "title", "label": "Title" },
                { "path": "seats", "type": "number" },
                { "path": "paid", "type": "boolean" },
                { "path": "at", "type": "datetime" },
                { "path": "tier", "type": "select", "options": ["basic", "vip"] },
                { "path": "contact", "type": "email" }
            ]
        }))
        .unwrap();
        resolve_list(&cfg, None).unwrap()
    }

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn coerces_form_strings() {
        let out = FieldValidator::coerce(
            &tickets(),
            map(json!({ "title": "A", "seats": "3", "paid": "yes", "at": "2024-05-01 10:30", "tier": "vip", "seats_note": "x" })),
            WriteMode::Create,
        )
        .unwrap();
        assert_eq!(out.get("seats"), Some(&json!(3)));
        assert_eq!(out.get("paid"), Some(&json!(true)));
        assert_eq!(out.get("at"), Some(&json!("2024-05-01 10:30")));
        assert_eq!(out.get("seats_note"), Some(&json!("x")));
    }

    #[test]
    fn rejects_bad_values_and_missing_name() {
        let list = tickets();
        let err = FieldValidator::coerce(&list, map(json!({ "seats": "2" })), WriteMode::Create).unwrap_err();
        assert_eq!(err.to_string(), "validation: Title is required.");
        assert!(FieldValidator::coerce(&list, map(json!({ "seats": "2" })), WriteMode::Update).is_ok());
        assert!(FieldValidator::coerce(&list, map(json!({ "tier": "gold" })), WriteMode::Update).is_err());
        assert!(FieldValidator::coerce(&list, map(json!({ "contact": "nope" })), WriteMode::Update).is_err());
        assert!(FieldValidator::coerce(&list, map(json!({ "seats": "many" })), WriteMode::Update).is_err());
        let cleared = FieldValidator::coerce(&list, map(json!({ "seats": "" })), WriteMode::Update).unwrap();
        assert_eq!(cleared.get("seats"), Some(&Value::Null));
    }
}
