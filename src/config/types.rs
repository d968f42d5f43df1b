//! Raw list configuration types matching the JSON files under `LISTS_PATH`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Declared type of a list field. Drives filter parsing, SQL casts and form coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldTypeConfig {
    #[default]
    Text,
    Email,
    Number,
    Boolean,
    Date,
    Datetime,
    Select,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub path: String,
    #[serde(rename = "type", default)]
    pub type_: FieldTypeConfig,
    #[serde(default)]
    pub label: Option<String>,
    /// Shown on the create form.
    #[serde(default)]
    pub initial: bool,
    #[serde(default)]
    pub noedit: bool,
    /// Allowed values for `select` fields.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Primary key type of the native store table; used for casts and id validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdTypeConfig {
    Uuid,
    #[default]
    Int,
    Text,
}

/// Query-parameter mapping for the REST read operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParamsConfig {
    /// Query parameter name carrying the page size.
    #[serde(default)]
    pub limit: Option<String>,
    /// Query parameter name carrying the number of skipped records.
    #[serde(default)]
    pub offset: Option<String>,
    /// When true, filters are flattened into query parameters.
    #[serde(default)]
    pub search_by_field: bool,
    #[serde(default)]
    pub primary_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<ParamsConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiDetailsConfig {
    #[serde(default)]
    pub create: OperationConfig,
    #[serde(default)]
    pub read: OperationConfig,
    #[serde(default)]
    pub update: OperationConfig,
    #[serde(default)]
    pub delete: OperationConfig,
}

/// Config-driven response normalization: JSON pointers into the backend payload and key renames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Pointer to the array of records in a listing response. Empty string = the whole body.
    #[serde(default = "default_items_pointer")]
    pub items: String,
    /// Pointer to the record in a single item response.
    #[serde(default)]
    pub item: String,
    /// Pointer to the total count. `null` means the number of returned items is the total.
    #[serde(default = "default_count_pointer")]
    pub count: Option<String>,
    /// Pointer to the id of a newly created record in a create response.
    #[serde(default = "default_created_id_pointer")]
    pub created_id: String,
    /// Form field name -> request body key.
    #[serde(default)]
    pub request_fields: HashMap<String, String>,
    /// Wrap the prepared request body under this key (e.g. "data").
    #[serde(default)]
    pub request_wrapper: Option<String>,
    /// Filter path -> query parameter name.
    #[serde(default)]
    pub search_fields: HashMap<String, String>,
}

fn default_items_pointer() -> String {
    "/results".into()
}

fn default_count_pointer() -> Option<String> {
    Some("/total".into())
}

fn default_created_id_pointer() -> String {
    "/result/id".into()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            items: default_items_pointer(),
            item: String::new(),
            count: default_count_pointer(),
            created_id: default_created_id_pointer(),
            request_fields: HashMap::new(),
            request_wrapper: None,
            search_fields: HashMap::new(),
        }
    }
}

/// Comma separated string or array of strings.
#[derive(Clone, Debug, Serialize)]
pub struct PathList(pub Vec<String>);

impl<'de> Deserialize<'de> for PathList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::String(s) => Ok(PathList(
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            )),
            serde_json::Value::Array(arr) => {
                let mut out = Vec::with_capacity(arr.len());
                for item in arr {
                    match item {
                        serde_json::Value::String(s) => out.push(s),
                        other => {
                            return Err(serde::de::Error::custom(format!(
                                "path list entries must be strings; got {}",
                                other
                            )))
                        }
                    }
                }
                Ok(PathList(out))
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a comma separated string or an array of strings; got {}",
                other
            ))),
        }
    }
}

impl Default for PathList {
    fn default() -> Self {
        PathList(vec![NAME_TOKEN.to_string()])
    }
}

/// Placeholder resolved to the list's name field.
pub const NAME_TOKEN: &str = "__name__";
/// Placeholder resolved to `sortOrder` (sortable lists) or the name field.
pub const DEFAULT_SORT_TOKEN: &str = "__default__";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListConfig {
    pub key: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub singular: Option<String>,
    #[serde(default)]
    pub plural: Option<String>,
    /// Native store table; defaults to the snake-cased plural of the key.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub id_type: IdTypeConfig,
    pub fields: Vec<FieldConfig>,
    /// Field used as the record's display name.
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub search_fields: PathList,
    #[serde(default)]
    pub default_columns: PathList,
    #[serde(default = "default_sort_token")]
    pub default_sort: String,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub nocreate: bool,
    #[serde(default)]
    pub noedit: bool,
    #[serde(default)]
    pub nodelete: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub use_api: bool,
    #[serde(default)]
    pub api_details: ApiDetailsConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

fn default_sort_token() -> String {
    DEFAULT_SORT_TOKEN.into()
}

/// All list configs in one struct for in-memory loading.
#[derive(Clone, Debug, Default)]
pub struct FullConfig {
    pub lists: Vec<ListConfig>,
}
