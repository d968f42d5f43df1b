//! Standard response envelope helpers.

use crate::config::{Column, ListDescriptor};
use crate::pagination::PageResult;
use crate::sort::SortSpec;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta: None }))
}

/// Descriptor values the rendering layer needs next to a page of results.
#[derive(Serialize)]
pub struct ListSummary {
    pub key: String,
    pub path: String,
    pub label: String,
    pub singular: String,
    pub plural: String,
    pub nocreate: bool,
    pub noedit: bool,
    pub nodelete: bool,
    pub sortable: bool,
    pub use_api: bool,
}

impl From<&ListDescriptor> for ListSummary {
    fn from(list: &ListDescriptor) -> Self {
        ListSummary {
            key: list.key.clone(),
            path: list.path.clone(),
            label: list.label.clone(),
            singular: list.singular.clone(),
            plural: list.plural.clone(),
            nocreate: list.nocreate,
            noedit: list.noedit,
            nodelete: list.nodelete,
            sortable: list.sortable,
            use_api: list.use_api(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub list: ListSummary,
    pub columns: Vec<Column>,
    pub sort: SortSpec,
    /// True when the requested sort was dropped (default or unknown path).
    pub sort_cleared: bool,
    pub visible_pages: Vec<u64>,
    #[serde(flatten)]
    pub page: PageResult,
}
