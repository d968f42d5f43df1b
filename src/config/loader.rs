//! Build immutable list descriptors from raw config, and load raw config from disk.

use crate::config::resolved::{
    ApiDetails, Backing, DescriptorParts, FieldSpec, FieldType, HttpVerb, IdType, ListDescriptor, ListRegistry,
    Operation, OperationSpec, QueryParams, ID_PATH, READ_VERBS, SORT_ORDER_PATH, WRITE_VERBS,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::naming::{key_to_collection, key_to_label, key_to_path, plural_label, singular_label};
use crate::rest::{PointerNormalizer, ResponseNormalizer};
use crate::sort::columns_from_tokens;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Page size used when neither the request nor the list sets one.
pub const DEFAULT_PER_PAGE: u64 = 50;

/// Code-supplied normalizers keyed by list key. They replace the config-driven pointer normalizer.
pub type HookRegistry = HashMap<String, Arc<dyn ResponseNormalizer>>;

/// Build the registry from full config (validates first).
pub fn resolve(config: &FullConfig, hooks: &HookRegistry) -> Result<ListRegistry, ConfigError> {
    resolve_with(config, hooks, DEFAULT_PER_PAGE)
}

/// Like [`resolve`], with the page size used by lists that do not set `per_page`.
pub fn resolve_with(config: &FullConfig, hooks: &HookRegistry, default_per_page: u64) -> Result<ListRegistry, ConfigError> {
    validate(config)?;
    let mut lists = Vec::with_capacity(config.lists.len());
    for cfg in &config.lists {
        let descriptor = resolve_list_with(cfg, hooks.get(&cfg.key).cloned(), default_per_page)?;
        tracing::debug!(list = %descriptor.key, path = %descriptor.path, use_api = descriptor.use_api(), "resolved list");
        lists.push(descriptor);
    }
    Ok(ListRegistry::new(lists))
}

/// Resolve one list. `hook` overrides the normalizer built from `cfg.normalizer`.
pub fn resolve_list(cfg: &ListConfig, hook: Option<Arc<dyn ResponseNormalizer>>) -> Result<ListDescriptor, ConfigError> {
    resolve_list_with(cfg, hook, DEFAULT_PER_PAGE)
}

fn resolve_list_with(
    cfg: &ListConfig,
    hook: Option<Arc<dyn ResponseNormalizer>>,
    default_per_page: u64,
) -> Result<ListDescriptor, ConfigError> {
    crate::config::validate_list(cfg)?;

    let fields: Vec<FieldSpec> = cfg
        .fields
        .iter()
        .map(|f| FieldSpec {
            path: f.path.clone(),
            label: f.label.clone().unwrap_or_else(|| key_to_label(&f.path)),
            field_type: field_type(f),
            initial: f.initial,
            noedit: f.noedit,
        })
        .collect();

    let name_path = cfg.name_field.clone().unwrap_or_else(|| ID_PATH.to_string());
    let is_valid = |p: &str| {
        p == ID_PATH || (cfg.sortable && p == SORT_ORDER_PATH) || fields.iter().any(|f| f.path == p)
    };

    let mut search_fields: Vec<String> = Vec::new();
    for p in &cfg.search_fields.0 {
        let p = if p == NAME_TOKEN { name_path.clone() } else { p.clone() };
        if !search_fields.contains(&p) {
            search_fields.push(p);
        }
    }
    let default_columns = columns_from_tokens(cfg.default_columns.0.iter().map(String::as_str), &name_path, is_valid);
    let default_sort = if cfg.default_sort == DEFAULT_SORT_TOKEN {
        if cfg.sortable {
            SORT_ORDER_PATH.to_string()
        } else {
            name_path.clone()
        }
    } else {
        cfg.default_sort.clone()
    };

    let label = cfg.label.clone().unwrap_or_else(|| plural_label(&key_to_label(&cfg.key)));
    let singular = cfg.singular.clone().unwrap_or_else(|| singular_label(&label));
    let plural = cfg.plural.clone().unwrap_or_else(|| plural_label(&singular));

    let backing = if cfg.use_api {
        let normalizer: Arc<dyn ResponseNormalizer> =
            hook.unwrap_or_else(|| Arc::new(PointerNormalizer::new(cfg.normalizer.clone())));
        Backing::Api(resolve_api(cfg, normalizer)?)
    } else {
        Backing::Native
    };

    Ok(ListDescriptor::new(DescriptorParts {
        key: cfg.key.clone(),
        path: cfg.path.clone().unwrap_or_else(|| key_to_path(&cfg.key, true)),
        label,
        singular,
        plural,
        collection: cfg.collection.clone().unwrap_or_else(|| key_to_collection(&cfg.key)),
        id_type: match cfg.id_type {
            IdTypeConfig::Uuid => IdType::Uuid,
            IdTypeConfig::Int => IdType::Int,
            IdTypeConfig::Text => IdType::Text,
        },
        fields,
        name_path,
        search_fields,
        default_columns,
        default_sort,
        per_page: cfg.per_page.unwrap_or(default_per_page.max(1)),
        nocreate: cfg.nocreate,
        noedit: cfg.noedit,
        nodelete: cfg.nodelete,
        sortable: cfg.sortable,
        backing,
    }))
}

fn field_type(f: &FieldConfig) -> FieldType {
    match f.type_ {
        FieldTypeConfig::Text => FieldType::Text,
        FieldTypeConfig::Email => FieldType::Email,
        FieldTypeConfig::Number => FieldType::Number,
        FieldTypeConfig::Boolean => FieldType::Boolean,
        FieldTypeConfig::Date => FieldType::Date,
        FieldTypeConfig::Datetime => FieldType::Datetime,
        FieldTypeConfig::Select => FieldType::Select(f.options.clone()),
        FieldTypeConfig::Json => FieldType::Json,
    }
}

fn resolve_api(cfg: &ListConfig, normalizer: Arc<dyn ResponseNormalizer>) -> Result<ApiDetails, ConfigError> {
    let api = &cfg.api_details;
    let read = resolve_operation(cfg, &api.read, Operation::Read, &normalizer)?.ok_or_else(|| {
        ConfigError::MissingEndpoint {
            list: cfg.key.clone(),
            operation: "read",
        }
    })?;
    Ok(ApiDetails {
        create: resolve_operation(cfg, &api.create, Operation::Create, &normalizer)?,
        read,
        update: resolve_operation(cfg, &api.update, Operation::Update, &normalizer)?,
        delete: resolve_operation(cfg, &api.delete, Operation::Delete, &normalizer)?,
    })
}

/// `None` when the operation has no endpoint configured.
fn resolve_operation(
    cfg: &ListConfig,
    op: &OperationConfig,
    operation: Operation,
    normalizer: &Arc<dyn ResponseNormalizer>,
) -> Result<Option<OperationSpec>, ConfigError> {
    let Some(endpoint) = op.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let (allowed, default) = match operation {
        Operation::Read => (READ_VERBS, HttpVerb::Get),
        Operation::Create => (WRITE_VERBS, HttpVerb::Post),
        Operation::Update => (WRITE_VERBS, HttpVerb::Patch),
        Operation::Delete => (WRITE_VERBS, HttpVerb::Delete),
    };
    let method = match op.method.as_deref() {
        None => default,
        Some(token) => HttpVerb::resolve(token, allowed).ok_or_else(|| ConfigError::UnknownVerb {
            list: cfg.key.clone(),
            operation: operation.as_str(),
            verb: token.to_string(),
        })?,
    };
    let params = op.params.as_ref().map(|p| QueryParams {
        limit: p.limit.clone().filter(|s| !s.is_empty()),
        offset: p.offset.clone().filter(|s| !s.is_empty()),
        search_by_field: p.search_by_field,
        primary_key: p.primary_key.clone().unwrap_or_else(|| ID_PATH.to_string()),
    });
    Ok(Some(OperationSpec {
        endpoint: endpoint.to_string(),
        method,
        params,
        normalizer: Arc::clone(normalizer),
    }))
}

/// Load list config from `<dir>/lists.json` (a JSON array of list objects).
pub async fn load_from_dir(dir: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let file = dir.as_ref().join("lists.json");
    let text = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
    parse_lists(&text)
}

pub fn parse_lists(text: &str) -> Result<FullConfig, ConfigError> {
    let lists: Vec<ListConfig> = serde_json::from_str(text).map_err(|e| ConfigError::Load(e.to_string()))?;
    Ok(FullConfig { lists })
}
