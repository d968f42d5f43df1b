//! Builds parameterized COUNT, SELECT, INSERT, UPDATE, DELETE for a native list.

use super::params::{like_pattern, to_text_param};
use crate::config::{ListDescriptor, ID_PATH, SORT_ORDER_PATH};
use crate::filter::{Condition, FilterSpec, RangeBounds};
use crate::sort::{SortDirection, SortSpec};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Option<String>>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Option<String>) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `$n::<type>` for a freshly bound value.
    fn placeholder(&mut self, v: Option<String>, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }
}

/// Column type used for casts; `None` for paths that are not columns of the list.
fn column_type(list: &ListDescriptor, path: &str) -> Option<&'static str> {
    if path == ID_PATH {
        return Some(list.id_type.pg_type());
    }
    if list.sortable && path == SORT_ORDER_PATH {
        return Some("float8");
    }
    list.field(path).map(|f| f.field_type.pg_type())
}

/// `id`, every declared field, then `sortOrder` on sortable lists.
fn select_column_list(list: &ListDescriptor) -> String {
    let mut cols = vec![quoted(ID_PATH)];
    cols.extend(list.fields.iter().filter(|f| f.path != ID_PATH).map(|f| quoted(&f.path)));
    if list.sortable {
        cols.push(quoted(SORT_ORDER_PATH));
    }
    cols.join(", ")
}

fn table(list: &ListDescriptor) -> String {
    quoted(&list.collection)
}

fn range_predicate(q: &mut QueryBuf, col: &str, pg_type: &str, b: &RangeBounds) -> Vec<String> {
    let bounds = [(&b.gt, ">"), (&b.gte, ">="), (&b.lt, "<"), (&b.lte, "<=")];
    let mut parts = Vec::new();
    for (bound, op) in bounds {
        if let Some(v) = bound {
            let ph = q.placeholder(to_text_param(v), pg_type);
            parts.push(format!("{} {} {}", col, op, ph));
        }
    }
    parts
}

fn condition_predicate(q: &mut QueryBuf, col: &str, pg_type: &str, cond: &Condition) -> Vec<String> {
    match cond {
        Condition::Equals(v) => {
            let ph = q.placeholder(to_text_param(v), pg_type);
            vec![format!("{} = {}", col, ph)]
        }
        Condition::NotEqual(v) => {
            let ph = q.placeholder(to_text_param(v), pg_type);
            vec![format!("{} IS DISTINCT FROM {}", col, ph)]
        }
        Condition::Contains(text) => {
            let n = q.push_param(Some(like_pattern(text)));
            vec![format!("{}::text ILIKE ${}", col, n)]
        }
        Condition::Matches(pattern) => {
            let n = q.push_param(Some(pattern.clone()));
            vec![format!("{}::text ~* ${}", col, n)]
        }
        Condition::Range(bounds) => range_predicate(q, col, pg_type, bounds),
    }
}

/// AND of the field conditions plus one parenthesized OR of the alternatives. `None` = no constraint.
fn predicate(list: &ListDescriptor, spec: &FilterSpec, q: &mut QueryBuf) -> Option<String> {
    let mut parts = Vec::new();
    for (path, cond) in &spec.fields {
        let Some(pg_type) = column_type(list, path) else {
            tracing::warn!(list = %list.key, %path, "dropping filter on unknown column");
            continue;
        };
        parts.extend(condition_predicate(q, &quoted(path), pg_type, cond));
    }
    if !spec.or.is_empty() {
        let alts: Vec<String> = spec
            .or
            .iter()
            .map(|alt| predicate(list, alt, q).unwrap_or_else(|| "TRUE".to_string()))
            .collect();
        parts.push(format!("({})", alts.join(" OR ")));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

fn where_clause(list: &ListDescriptor, spec: &FilterSpec, q: &mut QueryBuf) -> String {
    predicate(list, spec, q).map(|p| format!(" WHERE {}", p)).unwrap_or_default()
}

/// SELECT COUNT(*) with the same predicate as the page query.
pub fn count(list: &ListDescriptor, filters: &FilterSpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    let wc = where_clause(list, filters, &mut q);
    q.sql = format!("SELECT COUNT(*) AS total FROM {}{}", table(list), wc);
    q
}

/// One page of matching rows, ordered by `sort` with `id` as tie-breaker.
pub fn select_page(list: &ListDescriptor, filters: &FilterSpec, sort: &SortSpec, skip: u64, limit: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let wc = where_clause(list, filters, &mut q);
    let dir = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    let mut order = Vec::new();
    if column_type(list, &sort.path).is_some() {
        order.push(format!("{} {}", quoted(&sort.path), dir));
    }
    if sort.path != ID_PATH {
        order.push(format!("{} ASC", quoted(ID_PATH)));
    }
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(list),
        table(list),
        wc,
        order.join(", "),
        limit,
        skip
    );
    q
}

/// SELECT by id. Caller-independent: the id is bound here.
pub fn select_by_id(list: &ListDescriptor, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(Some(id.to_string()), list.id_type.pg_type());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(list),
        table(list),
        quoted(ID_PATH),
        ph
    );
    q
}

/// SET assignments for every writable column present in `body`.
fn assignments(list: &ListDescriptor, body: &Map<String, Value>, q: &mut QueryBuf) -> Vec<String> {
    let mut sets = Vec::new();
    for (k, v) in body {
        if k == ID_PATH {
            continue;
        }
        if list.field(k).is_some_and(|f| f.noedit) {
            continue;
        }
        let Some(pg_type) = column_type(list, k) else { continue };
        let ph = q.placeholder(to_text_param(v), pg_type);
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    sets
}

/// INSERT the known columns of `body`; the database supplies defaults for the rest.
pub fn insert(list: &ListDescriptor, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in body {
        let Some(pg_type) = column_type(list, k) else { continue };
        placeholders.push(q.placeholder(to_text_param(v), pg_type));
        cols.push(quoted(k));
    }
    let returning = select_column_list(list);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table(list), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table(list),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id. With nothing to set this degrades to a select so callers still get the row.
pub fn update(list: &ListDescriptor, id: &str, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = assignments(list, body, &mut q);
    if sets.is_empty() {
        return select_by_id(list, id);
    }
    let id_ph = q.placeholder(Some(id.to_string()), list.id_type.pg_type());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table(list),
        sets.join(", "),
        quoted(ID_PATH),
        id_ph,
        select_column_list(list)
    );
    q
}

/// UPDATE every row of the list. `None` when `body` names no writable column.
pub fn update_all(list: &ListDescriptor, body: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let sets = assignments(list, body, &mut q);
    if sets.is_empty() {
        return None;
    }
    q.sql = format!("UPDATE {} SET {}", table(list), sets.join(", "));
    Some(q)
}

/// DELETE by id.
pub fn delete(list: &ListDescriptor, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(Some(id.to_string()), list.id_type.pg_type());
    q.sql = format!("DELETE FROM {} WHERE {} = {}", table(list), quoted(ID_PATH), ph);
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_list, ListConfig};
    use serde_json::json;

    fn posts() -> ListDescriptor {
        let cfg: ListConfig = serde_json::from_value(json!({
            "key": "Post",
            "name_field": "title",
            "sortable": true,
            "fields": [
                { "path": "title" },
                { "path": "views", "type": "number" },
                { "path": "published", "type": "boolean" },
                { "path": "slug", "noedit": true }
            ]
        }))
        .unwrap();
        resolve_list(&cfg, None).unwrap()
    }

    #[test]
    fn page_query_translates_filters_and_sort() {
        let list = posts();
        let mut filters = FilterSpec::new()
            .with("published", Condition::NotEqual(json!(false)))
            .with("views", Condition::Range(RangeBounds { gte: Some(json!(10)), ..Default::default() }));
        filters.or = vec![
            FilterSpec::new().with("title", Condition::Contains("50%".into())),
            FilterSpec::new().with("slug", Condition::Matches("^a".into())),
        ];
        let q = select_page(&list, &filters, &SortSpec::parse("-views"), 20, 10);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"title\", \"views\", \"published\", \"slug\", \"sortOrder\" FROM \"posts\" \
             WHERE \"published\" IS DISTINCT FROM $1::boolean AND \"views\" >= $2::float8 \
             AND (\"title\"::text ILIKE $3 OR \"slug\"::text ~* $4) \
             ORDER BY \"views\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            q.params,
            vec![Some("false".into()), Some("10".into()), Some("%50\\%%".into()), Some("^a".into())]
        );
    }

    #[test]
    fn count_shares_the_predicate() {
        let list = posts();
        let filters = FilterSpec::new().with("title", Condition::Equals(json!("Hi")));
        let q = count(&list, &filters);
        assert_eq!(q.sql, "SELECT COUNT(*) AS total FROM \"posts\" WHERE \"title\" = $1::text");
        assert_eq!(count(&list, &FilterSpec::new()).sql, "SELECT COUNT(*) AS total FROM \"posts\"");
    }

    #[test]
    fn update_skips_noedit_and_unknown_columns() {
        let list = posts();
        let mut body = Map::new();
        body.insert("title".into(), json!("New"));
        body.insert("slug".into(), json!("ignored"));
        body.insert("bogus".into(), json!(1));
        let q = update(&list, "7", &body);
        assert!(q.sql.starts_with("UPDATE \"posts\" SET \"title\" = $1::text WHERE \"id\" = $2::int8 RETURNING"));
        assert_eq!(q.params, vec![Some("New".into()), Some("7".into())]);
        let mut only_slug = Map::new();
        only_slug.insert("slug".into(), json!("x"));
        assert!(update_all(&list, &only_slug).is_none());
        assert!(update(&list, "7", &only_slug).sql.starts_with("SELECT"));
    }

    #[test]
    fn insert_and_delete() {
        let list = posts();
        let mut body = Map::new();
        body.insert("title".into(), json!("T"));
        body.insert("views".into(), json!(3));
        let q = insert(&list, &body);
        assert!(q.sql.starts_with("INSERT INTO \"posts\" (\"title\", \"views\") VALUES ($1::text, $2::float8) RETURNING"));
        assert!(insert(&list, &Map::new()).sql.contains("DEFAULT VALUES"));
        let d = delete(&list, "9");
        assert_eq!(d.sql, "DELETE FROM \"posts\" WHERE \"id\" = $1::int8");
        assert_eq!(d.params, vec![Some("9".into())]);
    }
}
