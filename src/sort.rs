//! Sort and column selection parsing for list requests.

use crate::config::{Column, ListDescriptor, NAME_TOKEN};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A single-field sort. `raw` keeps the `-path` form used in query strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub raw: String,
    pub path: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// "-name" -> name descending, "name" -> name ascending.
    pub fn parse(raw: &str) -> SortSpec {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(path) => SortSpec {
                raw: raw.to_string(),
                path: path.to_string(),
                direction: SortDirection::Desc,
            },
            None => SortSpec {
                raw: raw.to_string(),
                path: raw.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

/// Sort chosen for a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOutcome {
    pub spec: SortSpec,
    /// True when the requested sort should be dropped from the query string:
    /// it equals the default or names an unknown path.
    pub cleared: bool,
}

/// Pick the sort for a request: the requested one when it names a sortable path, otherwise the list default.
pub fn resolve_sort(list: &ListDescriptor, requested: Option<&str>) -> SortOutcome {
    let default = SortSpec::parse(&list.default_sort);
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return SortOutcome {
            spec: default,
            cleared: false,
        };
    };
    if requested == list.default_sort {
        return SortOutcome {
            spec: default,
            cleared: true,
        };
    }
    let spec = SortSpec::parse(requested);
    if list.is_valid_path(&spec.path) {
        SortOutcome { spec, cleared: false }
    } else {
        tracing::debug!(list = %list.key, sort = %requested, "ignoring sort on unknown path");
        SortOutcome {
            spec: default,
            cleared: true,
        }
    }
}

/// Parse column tokens ("name|40%", "__name__") keeping only paths accepted by `is_valid`.
pub fn columns_from_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
    name_path: &str,
    is_valid: impl Fn(&str) -> bool,
) -> Vec<Column> {
    let mut out: Vec<Column> = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (path, width) = match token.split_once('|') {
            Some((p, w)) => (p.trim(), Some(w.trim().to_string()).filter(|w| !w.is_empty())),
            None => (token, None),
        };
        let path = if path == NAME_TOKEN { name_path } else { path };
        if !is_valid(path) || out.iter().any(|c| c.path == path) {
            continue;
        }
        out.push(Column {
            path: path.to_string(),
            width,
        });
    }
    out
}

/// Columns requested with `?cols=a,b|20%`; falls back to the list defaults when nothing valid remains.
pub fn expand_columns(list: &ListDescriptor, raw: Option<&str>) -> Vec<Column> {
    let Some(raw) = raw else {
        return list.default_columns.clone();
    };
    let cols = columns_from_tokens(raw.split(','), &list.name_path, |p| list.is_valid_path(p));
    if cols.is_empty() {
        list.default_columns.clone()
    } else {
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_list, ListConfig};

    fn events() -> ListDescriptor {
        let cfg: ListConfig = serde_json::from_value(serde_json::json!({
            "key": "Event",
            "name_field": "name",
            "fields": [{ "path": "name" }, { "path": "start", "type": "datetime" }],
            "default_columns": "name|50%, start"
        }))
        .unwrap();
        resolve_list(&cfg, None).unwrap()
    }

    #[test]
    fn parses_direction_prefix() {
        let s = SortSpec::parse("-start");
        assert_eq!(s.path, "start");
        assert_eq!(s.direction, SortDirection::Desc);
        assert_eq!(SortSpec::parse("name").direction, SortDirection::Asc);
    }

    #[test]
    fn default_and_unknown_sorts_are_cleared() {
        let list = events();
        assert_eq!(list.default_sort, "name");
        let out = resolve_sort(&list, Some("name"));
        assert!(out.cleared);
        let out = resolve_sort(&list, Some("-bogus"));
        assert!(out.cleared);
        assert_eq!(out.spec.path, "name");
        let out = resolve_sort(&list, Some("-start"));
        assert!(!out.cleared);
        assert_eq!(out.spec.direction, SortDirection::Desc);
    }

    #[test]
    fn expands_columns_with_widths_and_fallback() {
        let list = events();
        assert_eq!(
            list.default_columns,
            vec![
                Column { path: "name".into(), width: Some("50%".into()) },
                Column { path: "start".into(), width: None },
            ]
        );
        let cols = expand_columns(&list, Some("start|30%, unknown"));
        assert_eq!(cols, vec![Column { path: "start".into(), width: Some("30%".into()) }]);
        assert_eq!(expand_columns(&list, Some("nope")), list.default_columns);
    }
}
