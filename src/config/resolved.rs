//! Resolved list model: config validated and flattened into immutable descriptors for runtime use.

use crate::error::{AppError, ConfigError};
use crate::rest::ResponseNormalizer;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Field used for manual ordering on sortable lists.
pub const SORT_ORDER_PATH: &str = "sortOrder";
/// Identity column of native-store records.
pub const ID_PATH: &str = "id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Email,
    Number,
    Boolean,
    Date,
    Datetime,
    /// Closed set of allowed values.
    Select(Vec<String>),
    Json,
}

impl FieldType {
    /// PostgreSQL type used when casting bound text parameters.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Text | FieldType::Email | FieldType::Select(_) => "text",
            FieldType::Number => "float8",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "timestamptz",
            FieldType::Json => "jsonb",
        }
    }

    /// Text-like fields get substring matching in filters and free-text search.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Email | FieldType::Select(_))
    }
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub path: String,
    pub label: String,
    pub field_type: FieldType,
    pub initial: bool,
    pub noedit: bool,
}

/// Primary key type for parsing path/body ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdType {
    Uuid,
    Int,
    Text,
}

impl IdType {
    pub fn pg_type(&self) -> &'static str {
        match self {
            IdType::Uuid => "uuid",
            IdType::Int => "int8",
            IdType::Text => "text",
        }
    }

    /// Reject ids that cannot match any row instead of sending them to the store.
    pub fn check(&self, id: &str) -> Result<(), AppError> {
        match self {
            IdType::Uuid => uuid::Uuid::parse_str(id)
                .map(|_| ())
                .map_err(|_| AppError::BadRequest(format!("invalid uuid: {}", id))),
            IdType::Int => id
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id))),
            IdType::Text => Ok(()),
        }
    }
}

/// Closed set of HTTP verbs an operation may be configured with. Resolved once at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

/// Verbs accepted for create/update/delete operations.
pub const WRITE_VERBS: &[HttpVerb] = &[HttpVerb::Post, HttpVerb::Patch, HttpVerb::Put, HttpVerb::Delete];
/// Verbs accepted for the read operation.
pub const READ_VERBS: &[HttpVerb] = &[HttpVerb::Get];

impl HttpVerb {
    /// Case-insensitive match of `token` against `allowed`.
    pub fn resolve(token: &str, allowed: &[HttpVerb]) -> Option<HttpVerb> {
        allowed
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(token.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn to_method(self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-parameter mapping of the REST read operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search_by_field: bool,
    pub primary_key: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            limit: None,
            offset: None,
            search_by_field: false,
            primary_key: ID_PATH.to_string(),
        }
    }
}

/// Logical CRUD operation of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Endpoint, verb and normalization hooks for one operation on a REST-backed list.
#[derive(Clone)]
pub struct OperationSpec {
    pub endpoint: String,
    pub method: HttpVerb,
    pub params: Option<QueryParams>,
    pub normalizer: Arc<dyn ResponseNormalizer>,
}

impl OperationSpec {
    /// `<endpoint>/<id>`
    pub fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), id)
    }

    pub fn primary_key(&self) -> &str {
        self.params.as_ref().map(|p| p.primary_key.as_str()).unwrap_or(ID_PATH)
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Remote operation mapping. Read is always present; the others may be absent when the list disables them.
#[derive(Clone, Debug)]
pub struct ApiDetails {
    pub create: Option<OperationSpec>,
    pub read: OperationSpec,
    pub update: Option<OperationSpec>,
    pub delete: Option<OperationSpec>,
}

impl ApiDetails {
    pub fn operation(&self, list: &str, op: Operation) -> Result<&OperationSpec, ConfigError> {
        let spec = match op {
            Operation::Create => self.create.as_ref(),
            Operation::Read => Some(&self.read),
            Operation::Update => self.update.as_ref(),
            Operation::Delete => self.delete.as_ref(),
        };
        spec.ok_or_else(|| ConfigError::MissingEndpoint {
            list: list.to_string(),
            operation: op.as_str(),
        })
    }
}

/// Where a list's records live.
#[derive(Clone, Debug)]
pub enum Backing {
    Native,
    Api(ApiDetails),
}

/// One list column, optionally with a display width ("name|40%").
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Column {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ListDescriptor {
    pub key: String,
    pub path: String,
    pub label: String,
    pub singular: String,
    pub plural: String,
    /// Native store table.
    pub collection: String,
    pub id_type: IdType,
    pub fields: Vec<FieldSpec>,
    field_index: HashMap<String, usize>,
    /// Field used as the display name (or `id`).
    pub name_path: String,
    pub search_fields: Vec<String>,
    pub default_columns: Vec<Column>,
    pub default_sort: String,
    pub per_page: u64,
    pub nocreate: bool,
    pub noedit: bool,
    pub nodelete: bool,
    pub sortable: bool,
    pub backing: Backing,
}

/// Everything a descriptor needs besides the field index, which is built from `fields`.
pub struct DescriptorParts {
    pub key: String,
    pub path: String,
    pub label: String,
    pub singular: String,
    pub plural: String,
    pub collection: String,
    pub id_type: IdType,
    pub fields: Vec<FieldSpec>,
    pub name_path: String,
    pub search_fields: Vec<String>,
    pub default_columns: Vec<Column>,
    pub default_sort: String,
    pub per_page: u64,
    pub nocreate: bool,
    pub noedit: bool,
    pub nodelete: bool,
    pub sortable: bool,
    pub backing: Backing,
}

impl ListDescriptor {
    pub fn new(parts: DescriptorParts) -> Self {
        let field_index = parts
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        ListDescriptor {
            key: parts.key,
            path: parts.path,
            label: parts.label,
            singular: parts.singular,
            plural: parts.plural,
            collection: parts.collection,
            id_type: parts.id_type,
            fields: parts.fields,
            field_index,
            name_path: parts.name_path,
            search_fields: parts.search_fields,
            default_columns: parts.default_columns,
            default_sort: parts.default_sort,
            per_page: parts.per_page,
            nocreate: parts.nocreate,
            noedit: parts.noedit,
            nodelete: parts.nodelete,
            sortable: parts.sortable,
            backing: parts.backing,
        }
    }

    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.field_index.get(path).map(|&i| &self.fields[i])
    }

    /// Paths a filter or sort may reference: declared fields, `id`, and `sortOrder` on sortable lists.
    pub fn is_valid_path(&self, path: &str) -> bool {
        self.field_index.contains_key(path) || path == ID_PATH || (self.sortable && path == SORT_ORDER_PATH)
    }

    pub fn use_api(&self) -> bool {
        matches!(self.backing, Backing::Api(_))
    }

    pub fn api(&self) -> Option<&ApiDetails> {
        match &self.backing {
            Backing::Api(details) => Some(details),
            Backing::Native => None,
        }
    }
}

/// All resolved lists, addressable by key or URL path.
#[derive(Clone, Debug, Default)]
pub struct ListRegistry {
    pub lists: Vec<Arc<ListDescriptor>>,
    by_path: HashMap<String, Arc<ListDescriptor>>,
    by_key: HashMap<String, Arc<ListDescriptor>>,
}

impl ListRegistry {
    pub fn new(lists: Vec<ListDescriptor>) -> Self {
        let lists: Vec<Arc<ListDescriptor>> = lists.into_iter().map(Arc::new).collect();
        let by_path = lists.iter().map(|l| (l.path.clone(), Arc::clone(l))).collect();
        let by_key = lists.iter().map(|l| (l.key.clone(), Arc::clone(l))).collect();
        ListRegistry { lists, by_path, by_key }
    }

    pub fn by_path(&self, path: &str) -> Option<&Arc<ListDescriptor>> {
        self.by_path.get(path)
    }

    pub fn by_key(&self, key: &str) -> Option<&Arc<ListDescriptor>> {
        self.by_key.get(key)
    }
}
