//! Admin list adapter: one paginated list abstraction over PostgreSQL tables or external REST resources.

pub mod auth;
pub mod backend;
pub mod config;
pub mod deadline;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod item;
pub mod naming;
pub mod pagination;
pub mod response;
pub mod rest;
pub mod routes;
pub mod service;
pub mod sort;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::{CsrfValidator, NoCsrf, SharedSecretCsrf};
pub use backend::Backends;
pub use config::{
    load_from_dir, parse_lists, resolve, resolve_with, AdapterSettings, HookRegistry, ListDescriptor, ListRegistry,
};
pub use error::{AppError, ConfigError, NormalizeError};
pub use filter::{get_search_filters, process_filters, Condition, FilterSpec};
pub use item::Item;
pub use pagination::{paginate, PageResult, PageWindow, PendingQuery};
pub use rest::{Envelope, PointerNormalizer, ResponseNormalizer};
pub use routes::{app, common_routes, list_routes};
pub use service::{CrudDispatcher, DeleteReport, Outcome, RequestContext, Target};
pub use sort::{resolve_sort, SortSpec};
pub use state::AppState;
pub use store::{ListStore, MemoryListStore, PgListStore};
