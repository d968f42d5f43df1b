//! In-process store evaluating filters with [`FilterSpec::matches`]. Backs the demo server and the test suite.

use super::{is_writable, ListStore};
use crate::config::{IdType, ListDescriptor, ID_PATH};
use crate::error::AppError;
use crate::filter::{compare, FilterSpec};
use crate::item::{value_to_plain_string, Item};
use crate::sort::{SortDirection, SortSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryListStore {
    tables: RwLock<HashMap<String, Vec<Item>>>,
}

fn same_id(item: &Item, id: &str) -> bool {
    item.id().and_then(value_to_plain_string).as_deref() == Some(id)
}

fn order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
    }
}

impl MemoryListStore {
    pub fn new() -> Self {
        MemoryListStore::default()
    }

    /// Replace the records of `list`. Records without an id get one assigned.
    pub async fn seed(&self, list: &ListDescriptor, items: impl IntoIterator<Item = Item>) {
        let mut rows: Vec<Item> = Vec::new();
        for mut item in items {
            if item.id().is_none() {
                item.set(ID_PATH, next_id(list.id_type, &rows));
            }
            rows.push(item);
        }
        self.tables.write().await.insert(list.collection.clone(), rows);
    }

    pub async fn len(&self, list: &ListDescriptor) -> usize {
        self.tables.read().await.get(&list.collection).map(Vec::len).unwrap_or(0)
    }

    pub async fn is_empty(&self, list: &ListDescriptor) -> bool {
        self.len(list).await == 0
    }

    async fn matching(&self, list: &ListDescriptor, filters: &FilterSpec) -> Vec<Item> {
        let tables = self.tables.read().await;
        tables
            .get(&list.collection)
            .map(|rows| rows.iter().filter(|i| filters.matches(i)).cloned().collect())
            .unwrap_or_default()
    }
}

fn next_id(id_type: IdType, rows: &[Item]) -> Value {
    match id_type {
        IdType::Int => {
            let max = rows.iter().filter_map(|i| i.id().and_then(Value::as_i64)).max().unwrap_or(0);
            Value::from(max + 1)
        }
        IdType::Uuid | IdType::Text => Value::String(uuid::Uuid::new_v4().to_string()),
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn count(&self, list: &ListDescriptor, filters: &FilterSpec) -> Result<u64, AppError> {
        Ok(self.matching(list, filters).await.len() as u64)
    }

    async fn find_page(
        &self,
        list: &ListDescriptor,
        filters: &FilterSpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Item>, AppError> {
        let mut rows = self.matching(list, filters).await;
        rows.sort_by(|a, b| {
            let primary = order(a.get(&sort.path), b.get(&sort.path));
            let primary = match sort.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| order(a.id(), b.id()))
        });
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn find_by_id(&self, list: &ListDescriptor, id: &str) -> Result<Option<Item>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&list.collection)
            .and_then(|rows| rows.iter().find(|i| same_id(i, id)).cloned()))
    }

    async fn insert(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<Item, AppError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(list.collection.clone()).or_default();
        let mut item = Item::default();
        for (k, v) in fields {
            if list.is_valid_path(k) {
                item.set(k.clone(), v.clone());
            }
        }
        if item.id().is_none() {
            item.set(ID_PATH, next_id(list.id_type, rows));
        }
        rows.push(item.clone());
        Ok(item)
    }

    async fn update(&self, list: &ListDescriptor, id: &str, fields: &Map<String, Value>) -> Result<Option<Item>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(&list.collection)
            .and_then(|rows| rows.iter_mut().find(|i| same_id(i, id)))
        else {
            return Ok(None);
        };
        for (k, v) in fields {
            if is_writable(list, k) {
                row.set(k.clone(), v.clone());
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, list: &ListDescriptor, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&list.collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|i| !same_id(i, id));
        Ok(rows.len() < before)
    }

    async fn update_all(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<u64, AppError> {
        let writable: Vec<(&String, &Value)> = fields.iter().filter(|(k, _)| is_writable(list, k)).collect();
        if writable.is_empty() {
            return Ok(0);
        }
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&list.collection) else {
            return Ok(0);
        };
        for row in rows.iter_mut() {
            for (k, v) in &writable {
                row.set((*k).clone(), (*v).clone());
            }
        }
        Ok(rows.len() as u64)
    }
}
