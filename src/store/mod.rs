//! Native store seam. The dispatcher and pagination engine only see [`ListStore`].

mod memory;
mod pg;

pub use memory::MemoryListStore;
pub use pg::PgListStore;

use crate::config::{ListDescriptor, ID_PATH};
use crate::error::AppError;
use crate::filter::FilterSpec;
use crate::item::Item;
use crate::sort::SortSpec;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait ListStore: Send + Sync {
    /// Number of records matching `filters`.
    async fn count(&self, list: &ListDescriptor, filters: &FilterSpec) -> Result<u64, AppError>;

    /// Records matching `filters`, ordered by `sort`, after skipping `skip` and taking at most `limit`.
    async fn find_page(
        &self,
        list: &ListDescriptor,
        filters: &FilterSpec,
        sort: &SortSpec,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Item>, AppError>;

    async fn find_by_id(&self, list: &ListDescriptor, id: &str) -> Result<Option<Item>, AppError>;

    /// Insert one record and return it as stored (with its id).
    async fn insert(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<Item, AppError>;

    /// Apply `fields` to one record. `None` when no record has that id.
    async fn update(&self, list: &ListDescriptor, id: &str, fields: &Map<String, Value>) -> Result<Option<Item>, AppError>;

    /// True when a record was removed.
    async fn delete(&self, list: &ListDescriptor, id: &str) -> Result<bool, AppError>;

    /// Apply `fields` to every record of the list; returns the number of records touched.
    async fn update_all(&self, list: &ListDescriptor, fields: &Map<String, Value>) -> Result<u64, AppError>;

    /// Readiness check behind `/ready`.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Whether `key` may be written by update/update-all: a known column that is not the id or `noedit`.
pub(crate) fn is_writable(list: &ListDescriptor, key: &str) -> bool {
    key != ID_PATH && list.is_valid_path(key) && !list.field(key).is_some_and(|f| f.noedit)
}
