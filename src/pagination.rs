//! Pagination engine: page window math, backend query assembly, and the canonical page result.

use crate::backend::Backends;
use crate::config::{Backing, ListDescriptor, OperationSpec};
use crate::deadline::bounded;
use crate::error::AppError;
use crate::filter::{flatten_for_rest, FilterSpec};
use crate::item::Item;
use crate::rest::{append_query, Envelope};
use crate::sort::SortSpec;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Largest offset a backend is asked to skip (PostgreSQL `OFFSET` is a signed 64-bit integer).
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// Requested page clamped to valid values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub current_page: u64,
    pub per_page: u64,
    pub skip: u64,
}

impl PageWindow {
    pub fn new(page: u64, per_page: u64) -> Self {
        let current_page = page.max(1);
        let per_page = per_page.max(1);
        PageWindow {
            current_page,
            per_page,
            skip: (current_page - 1).saturating_mul(per_page),
        }
    }
}

/// What the rendering layer receives, identical for native and REST lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub total: u64,
    pub results: Vec<Item>,
    pub current_page: u64,
    pub total_pages: u64,
    /// Dense `1..=total_pages`.
    pub pages: Vec<u64>,
    pub previous: bool,
    /// Next page number; stays on the current page once the last page is reached.
    pub next: u64,
    /// 1-based index of the first result in the window.
    pub first: u64,
    /// `first + results.len() - 1`; equals `first - 1` for an empty window.
    pub last: u64,
    #[serde(skip)]
    max_pages: u64,
}

impl PageResult {
    pub fn assemble(window: PageWindow, total: u64, results: Vec<Item>, max_pages: u64) -> Self {
        let total_pages = total.div_ceil(window.per_page);
        let current = window.current_page;
        PageResult {
            total,
            current_page: current,
            total_pages,
            pages: (1..=total_pages).collect(),
            previous: current != 1,
            next: if current < total_pages { current + 1 } else { current },
            first: window.skip.saturating_add(1),
            last: window.skip.saturating_add(results.len() as u64),
            results,
            max_pages,
        }
    }

    /// Page links to show: at most `max_pages` of them, centred on the current page where possible.
    pub fn visible_pages(&self) -> Vec<u64> {
        let max = self.max_pages;
        if max == 0 || self.total_pages <= max {
            return self.pages.clone();
        }
        let start = self.current_page.saturating_sub(max / 2).max(1);
        let end = (start + max - 1).min(self.total_pages);
        (end + 1 - max..=end).collect()
    }
}

/// Query parameters of a REST listing call: flattened filters (each passed through
/// `prepare_search_field`) when `searchByField` is set, then limit/offset under their configured names.
pub fn build_query_params(read: &OperationSpec, filters: &FilterSpec, window: &PageWindow) -> Vec<(String, String)> {
    let Some(params) = &read.params else {
        return Vec::new();
    };
    let mut out: Vec<(String, String)> = Vec::new();
    if params.search_by_field {
        out.extend(
            flatten_for_rest(filters)
                .into_iter()
                .map(|(k, v)| read.normalizer.prepare_search_field(k, v)),
        );
    }
    if let Some(name) = &params.limit {
        out.push((name.clone(), window.per_page.to_string()));
    }
    if let Some(name) = &params.offset {
        out.push((name.clone(), window.skip.to_string()));
    }
    out
}

/// Start a paginated query. `per_page` falls back to the list's page size.
pub fn paginate(
    list: Arc<ListDescriptor>,
    filters: FilterSpec,
    page: u64,
    per_page: Option<u64>,
    max_pages: u64,
) -> PendingQuery {
    let window = PageWindow::new(page, per_page.unwrap_or(list.per_page));
    let sort = SortSpec::parse(&list.default_sort);
    PendingQuery {
        list,
        filters,
        sort,
        window,
        max_pages,
    }
}

/// Deferred page fetch. Nothing is sent until [`PendingQuery::exec`].
#[derive(Debug)]
pub struct PendingQuery {
    list: Arc<ListDescriptor>,
    filters: FilterSpec,
    sort: SortSpec,
    window: PageWindow,
    max_pages: u64,
}

impl PendingQuery {
    /// Order of the native query. REST backends receive no sort.
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub async fn exec(self, backends: &Backends, cancel: &CancellationToken) -> Result<PageResult, AppError> {
        if self.window.skip > MAX_SKIP {
            return Err(AppError::BadRequest(format!(
                "page {} is out of range for {} per page",
                self.window.current_page, self.window.per_page
            )));
        }
        let (total, results) = match &self.list.backing {
            Backing::Native => self.exec_native(backends, cancel).await?,
            Backing::Api(api) => self.exec_rest(&api.read, backends, cancel).await?,
        };
        Ok(PageResult::assemble(self.window, total, results, self.max_pages))
    }

    async fn exec_native(&self, backends: &Backends, cancel: &CancellationToken) -> Result<(u64, Vec<Item>), AppError> {
        let store = &backends.store;
        let list = self.list.as_ref();
        let timeout = backends.timeout();
        let count = bounded(cancel, timeout, store.count(list, &self.filters));
        let page = bounded(
            cancel,
            timeout,
            store.find_page(list, &self.filters, &self.sort, self.window.skip, self.window.per_page),
        );
        tokio::try_join!(count, page)
    }

    async fn exec_rest(
        &self,
        read: &OperationSpec,
        backends: &Backends,
        cancel: &CancellationToken,
    ) -> Result<(u64, Vec<Item>), AppError> {
        let params = build_query_params(read, &self.filters, &self.window);
        let url = append_query(&read.endpoint, &params);
        tracing::debug!(list = %self.list.key, %url, "listing");
        let body = backends.rest.get_json(&url, cancel).await?;
        let envelope = Envelope::listing(
            body,
            url,
            read.method.as_str(),
            params.iter().map(|(k, v)| format!("{}={}", k, v)).collect(),
        );
        let total = read.normalizer.count_response_data(&envelope)?;
        let pk = read.primary_key();
        let results = read
            .normalizer
            .get_response_data(&envelope)?
            .into_iter()
            .map(|item| item.with_id_from(pk))
            .collect();
        Ok((total, results))
    }
}
