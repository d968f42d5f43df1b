//! Config validation: referential integrity of field paths and REST operation completeness.

use crate::config::{FullConfig, ListConfig, OperationConfig, DEFAULT_SORT_TOKEN, NAME_TOKEN};
use crate::error::ConfigError;
use crate::naming::key_to_path;
use std::collections::HashSet;

/// Paths every list accepts besides its declared fields.
fn builtin_path(list: &ListConfig, path: &str) -> bool {
    path == "id" || (list.sortable && path == "sortOrder")
}

fn check_path(list: &ListConfig, fields: &HashSet<&str>, kind: &'static str, path: &str) -> Result<(), ConfigError> {
    if fields.contains(path) || builtin_path(list, path) || path == NAME_TOKEN {
        return Ok(());
    }
    Err(ConfigError::MissingReference {
        list: list.key.clone(),
        kind,
        id: path.to_string(),
    })
}

fn require_endpoint(list: &ListConfig, op: &OperationConfig, operation: &'static str) -> Result<(), ConfigError> {
    match op.endpoint.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => Ok(()),
        _ => Err(ConfigError::MissingEndpoint {
            list: list.key.clone(),
            operation,
        }),
    }
}

pub fn validate_list(list: &ListConfig) -> Result<(), ConfigError> {
    if list.key.trim().is_empty() {
        return Err(ConfigError::Validation("list key must not be empty".into()));
    }
    let mut fields = HashSet::new();
    for f in &list.fields {
        if f.path.is_empty() || f.path.starts_with('$') {
            return Err(ConfigError::Validation(format!(
                "list {}: invalid field path '{}'",
                list.key, f.path
            )));
        }
        if !fields.insert(f.path.as_str()) {
            return Err(ConfigError::Validation(format!(
                "list {}: duplicate field '{}'",
                list.key, f.path
            )));
        }
    }
    if let Some(name) = &list.name_field {
        check_path(list, &fields, "name field", name)?;
    }
    for p in &list.search_fields.0 {
        check_path(list, &fields, "search field", p)?;
    }
    for c in &list.default_columns.0 {
        let path = c.split_once('|').map(|(p, _)| p).unwrap_or(c).trim();
        check_path(list, &fields, "column", path)?;
    }
    if list.default_sort != DEFAULT_SORT_TOKEN {
        let path = list.default_sort.trim_start_matches('-');
        check_path(list, &fields, "sort field", path)?;
    }
    if list.per_page == Some(0) {
        return Err(ConfigError::Validation(format!("list {}: per_page must be positive", list.key)));
    }

    if list.use_api {
        let api = &list.api_details;
        require_endpoint(list, &api.read, "read")?;
        if !list.nocreate {
            require_endpoint(list, &api.create, "create")?;
        }
        if !list.noedit {
            require_endpoint(list, &api.update, "update")?;
        }
        if !list.nodelete {
            require_endpoint(list, &api.delete, "delete")?;
        }
    }
    Ok(())
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut keys = HashSet::new();
    let mut paths = HashSet::new();
    for list in &config.lists {
        validate_list(list)?;
        if !keys.insert(list.key.as_str()) {
            return Err(ConfigError::DuplicateKey(list.key.clone()));
        }
        let path = list.path.clone().unwrap_or_else(|| key_to_path(&list.key, true));
        if !paths.insert(path.clone()) {
            return Err(ConfigError::DuplicatePath(path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListConfig;

    fn list(v: serde_json::Value) -> ListConfig {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn unknown_search_field_is_rejected() {
        let l = list(serde_json::json!({
            "key": "Post", "fields": [{ "path": "title" }], "search_fields": "title, body"
        }));
        let err = validate_list(&l).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "search field", .. }));
    }

    #[test]
    fn api_list_requires_endpoints_for_enabled_operations() {
        let l = list(serde_json::json!({
            "key": "Post", "fields": [{ "path": "title" }], "use_api": true,
            "nocreate": true, "noedit": true,
            "api_details": { "read": { "endpoint": "http://api/posts" } }
        }));
        let err = validate_list(&l).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoint { operation: "delete", .. }));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let a = list(serde_json::json!({ "key": "Post", "fields": [] }));
        let b = list(serde_json::json!({ "key": "Article", "path": "posts", "fields": [] }));
        let err = validate(&FullConfig { lists: vec![a, b] }).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePath(p) if p == "posts"));
    }
}
