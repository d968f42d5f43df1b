//! CRUD dispatch: each logical operation goes to the native store or to the list's REST endpoints.

use super::form::reconstruct;
use super::outcome::{item_url, list_url, DeleteReport, Flash, Outcome};
use super::validation::{FieldValidator, WriteMode};
use crate::auth::CsrfValidator;
use crate::backend::Backends;
use crate::config::{ApiDetails, Backing, ListDescriptor, Operation};
use crate::deadline::bounded;
use crate::error::AppError;
use crate::item::{value_to_plain_string, Item};
use crate::rest::Envelope;
use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Upper bound of concurrent per-item deletes in a bulk delete.
pub const MAX_DELETES_IN_FLIGHT: usize = 10;

const IDS_ERROR: &str = "ids must be an Array or comma-delimited list of ids";

/// Record(s) an operation applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    None,
    Id(String),
    Ids(Vec<String>),
}

impl Target {
    /// "a" -> one id, "a,b" -> several, "" -> none.
    pub fn parse(raw: &str) -> Target {
        let ids: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        match ids.len() {
            0 => Target::None,
            1 => ids.into_iter().next().map(Target::Id).unwrap_or(Target::None),
            _ => Target::Ids(ids),
        }
    }

    /// A JSON array of ids or a comma-delimited string.
    pub fn from_value(value: &Value) -> Result<Target, AppError> {
        match value {
            Value::String(s) => Ok(Target::parse(s)),
            Value::Array(values) => {
                let ids = values
                    .iter()
                    .map(|v| value_to_plain_string(v).ok_or_else(|| AppError::Validation(IDS_ERROR.into())))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Target::Ids(ids))
            }
            Value::Number(_) => Ok(Target::parse(&value.to_string())),
            _ => Err(AppError::Validation(IDS_ERROR.into())),
        }
    }

    pub fn into_ids(self) -> Vec<String> {
        match self {
            Target::None => Vec::new(),
            Target::Id(id) => vec![id],
            Target::Ids(ids) => ids,
        }
    }

    fn single(self, op: Operation) -> Result<String, AppError> {
        match self {
            Target::Id(id) => Ok(id),
            Target::None => Err(AppError::BadRequest(format!("{} requires an id", op.as_str()))),
            Target::Ids(_) => Err(AppError::BadRequest(format!("{} takes a single id", op.as_str()))),
        }
    }
}

/// Per-request inputs from the excluded auth/session layer.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub actor: Option<String>,
    pub csrf_token: Option<String>,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken) -> Self {
        RequestContext {
            cancel,
            ..Default::default()
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_csrf(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }
}

#[derive(Clone)]
pub struct CrudDispatcher {
    backends: Backends,
    csrf: Arc<dyn CsrfValidator>,
    path_prefix: String,
}

impl CrudDispatcher {
    pub fn new(backends: Backends, csrf: Arc<dyn CsrfValidator>, path_prefix: impl Into<String>) -> Self {
        CrudDispatcher {
            backends,
            csrf,
            path_prefix: path_prefix.into(),
        }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Run one logical operation. Delete accepts several ids; the others take exactly one (create none).
    pub async fn execute(
        &self,
        list: &ListDescriptor,
        op: Operation,
        target: Target,
        body: Option<Map<String, Value>>,
        ctx: &RequestContext,
    ) -> Result<Outcome, AppError> {
        match op {
            Operation::Create => self.create(list, body.unwrap_or_default(), ctx).await,
            Operation::Read => {
                let id = target.single(op)?;
                let item = self.read(list, &id, ctx).await?;
                Ok(Outcome::new(item_url(&self.path_prefix, list, &id)).with_item(item))
            }
            Operation::Update => {
                let id = target.single(op)?;
                self.update(list, &id, body.unwrap_or_default(), ctx).await
            }
            Operation::Delete => {
                let report = self.delete(list, target.into_ids(), ctx).await?;
                let message = if report.count == 1 {
                    format!("{} deleted successfully.", list.singular)
                } else {
                    format!("{} {} deleted successfully.", report.count, list.plural)
                };
                let mut outcome = Outcome::new(list_url(&self.path_prefix, list)).with_flash(Flash::success(message));
                outcome.deleted = Some(report);
                Ok(outcome)
            }
        }
    }

    pub async fn create(&self, list: &ListDescriptor, body: Map<String, Value>, ctx: &RequestContext) -> Result<Outcome, AppError> {
        self.check_csrf(ctx)?;
        if list.nocreate {
            return Err(AppError::Policy(format!("New {} cannot be created.", list.plural)));
        }
        let fields = reconstruct(list, body);
        match &list.backing {
            Backing::Native => {
                let fields = FieldValidator::coerce(list, fields, WriteMode::Create)?;
                let item = self.bounded(ctx, self.backends.store.insert(list, &fields)).await?;
                let id = item.id_string().unwrap_or_default();
                tracing::info!(list = %list.key, %id, "created");
                let name = item.get(&list.name_path).and_then(value_to_plain_string).unwrap_or_else(|| id.clone());
                Ok(Outcome::new(item_url(&self.path_prefix, list, &id))
                    .with_flash(Flash::success(format!("New {} {} created.", list.singular, name)))
                    .with_item(item))
            }
            Backing::Api(api) => {
                let spec = api.operation(&list.key, Operation::Create)?;
                let body = spec.normalizer.prepare_request_data(fields)?;
                let resp = self.backends.rest.send(spec.method, &spec.endpoint, Some(&body), &ctx.cancel).await?;
                let envelope = Envelope::item(resp, spec.endpoint.clone(), spec.method.as_str());
                let redirect = match spec.normalizer.created_id(&envelope) {
                    Some(id) => {
                        tracing::info!(list = %list.key, %id, "created via api");
                        item_url(&self.path_prefix, list, &id)
                    }
                    None => {
                        tracing::warn!(list = %list.key, "create response carried no id");
                        list_url(&self.path_prefix, list)
                    }
                };
                Ok(Outcome::new(redirect).with_flash(Flash::success(format!("New {} created.", list.singular))))
            }
        }
    }

    /// Single record by id. REST lists issue `GET <read endpoint>/<id>`.
    pub async fn read(&self, list: &ListDescriptor, id: &str, ctx: &RequestContext) -> Result<Item, AppError> {
        let not_found = || AppError::NotFound(format!("{} {}", list.singular, id));
        match &list.backing {
            Backing::Native => {
                list.id_type.check(id)?;
                self.bounded(ctx, self.backends.store.find_by_id(list, id))
                    .await?
                    .ok_or_else(not_found)
            }
            Backing::Api(api) => {
                let spec = &api.read;
                let url = spec.item_url(id);
                let body = self.backends.rest.get_json(&url, &ctx.cancel).await?;
                let envelope = Envelope::item(body, url, spec.method.as_str());
                spec.normalizer
                    .get_response_data(&envelope)?
                    .into_iter()
                    .next()
                    .map(|item| item.with_id_from(spec.primary_key()))
                    .ok_or_else(not_found)
            }
        }
    }

    pub async fn update(&self, list: &ListDescriptor, id: &str, body: Map<String, Value>, ctx: &RequestContext) -> Result<Outcome, AppError> {
        self.check_csrf(ctx)?;
        if list.noedit {
            return Err(AppError::Policy(format!("{} cannot be edited.", list.plural)));
        }
        let fields = reconstruct(list, body);
        let outcome = Outcome::new(item_url(&self.path_prefix, list, id))
            .with_flash(Flash::success(format!("Update {} success.", list.singular)));
        match &list.backing {
            Backing::Native => {
                list.id_type.check(id)?;
                let fields = FieldValidator::coerce(list, fields, WriteMode::Update)?;
                let item = self
                    .bounded(ctx, self.backends.store.update(list, id, &fields))
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{} {}", list.singular, id)))?;
                tracing::info!(list = %list.key, %id, "updated");
                Ok(outcome.with_item(item))
            }
            Backing::Api(api) => {
                let spec = api.operation(&list.key, Operation::Update)?;
                let body = spec.normalizer.prepare_request_data(fields)?;
                self.backends
                    .rest
                    .send(spec.method, &spec.item_url(id), Some(&body), &ctx.cancel)
                    .await?;
                tracing::info!(list = %list.key, %id, "updated via api");
                Ok(outcome)
            }
        }
    }

    /// Delete one or more records; repeated ids count once. Guards run in order (csrf, nodelete, self-delete) before any I/O.
    pub async fn delete(&self, list: &ListDescriptor, ids: Vec<String>, ctx: &RequestContext) -> Result<DeleteReport, AppError> {
        self.check_csrf(ctx)?;
        if list.nodelete {
            return Err(AppError::Policy(format!("{} cannot be deleted.", list.plural)));
        }
        if ids.is_empty() {
            return Err(AppError::Validation(IDS_ERROR.into()));
        }
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        if let Some(actor) = ctx.actor.as_deref() {
            if ids.iter().any(|id| id == actor) {
                return Err(AppError::Policy(format!("You can't delete your own {}.", list.singular)));
            }
        }
        match &list.backing {
            Backing::Api(api) => self.delete_via_api(list, api, ids, ctx).await,
            Backing::Native => {
                for id in &ids {
                    list.id_type.check(id)?;
                }
                self.delete_native(list, ids, ctx).await
            }
        }
    }

    async fn delete_via_api(&self, list: &ListDescriptor, api: &ApiDetails, ids: Vec<String>, ctx: &RequestContext) -> Result<DeleteReport, AppError> {
        let spec = api.operation(&list.key, Operation::Delete)?;
        let [id] = <[String; 1]>::try_from(ids)
            .map_err(|_| AppError::Validation("REST-backed lists delete one record per request".into()))?;
        self.backends.rest.send(spec.method, &spec.item_url(&id), None, &ctx.cancel).await?;
        tracing::info!(list = %list.key, %id, "deleted via api");
        Ok(DeleteReport::new(vec![id]))
    }

    async fn delete_native(&self, list: &ListDescriptor, ids: Vec<String>, ctx: &RequestContext) -> Result<DeleteReport, AppError> {
        let store = &self.backends.store;
        let timeout = self.backends.timeout();
        let deleted: HashSet<String> = stream::iter(ids.iter().cloned())
            .map(|id| async move {
                let res = bounded(&ctx.cancel, timeout, store.delete(list, &id)).await;
                (id, res)
            })
            .buffer_unordered(MAX_DELETES_IN_FLIGHT)
            .filter_map(|(id, res)| async move {
                match res {
                    Ok(true) => Some(id),
                    Ok(false) => {
                        tracing::warn!(list = %list.key, %id, "delete: no such record");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(list = %list.key, %id, error = %e, "delete failed");
                        None
                    }
                }
            })
            .collect()
            .await;
        if ctx.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let ids: Vec<String> = ids.into_iter().filter(|id| deleted.contains(id)).collect();
        tracing::info!(list = %list.key, count = ids.len(), "bulk delete");
        Ok(DeleteReport::new(ids))
    }

    /// Apply a JSON object of field values to every record (`?update=<json>`). Native lists only.
    pub async fn update_all(&self, list: &ListDescriptor, raw: Option<&str>, ctx: &RequestContext) -> Result<Outcome, AppError> {
        self.check_csrf(ctx)?;
        if list.noedit {
            return Err(AppError::Policy(format!("{} cannot be edited.", list.plural)));
        }
        if list.use_api() {
            return Err(AppError::Policy("Update all is not supported for REST-backed lists.".into()));
        }
        let data = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Map::new(),
            Some(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                _ => return Err(AppError::Validation("There was an error parsing the update data.".into())),
            },
        };
        let data = FieldValidator::coerce(list, data, WriteMode::Update)?;
        let count = self.bounded(ctx, self.backends.store.update_all(list, &data)).await?;
        tracing::info!(list = %list.key, count, "updated all");
        let mut outcome = Outcome::new(list_url(&self.path_prefix, list))
            .with_flash(Flash::success(format!("All {} updated successfully.", list.plural)));
        outcome.updated = Some(count);
        Ok(outcome)
    }

    fn check_csrf(&self, ctx: &RequestContext) -> Result<(), AppError> {
        if self.csrf.validate(ctx.csrf_token.as_deref()) {
            Ok(())
        } else {
            tracing::warn!("csrf failure");
            Err(AppError::Csrf)
        }
    }

    async fn bounded<T, F>(&self, ctx: &RequestContext, fut: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, AppError>>,
    {
        bounded(&ctx.cancel, self.backends.timeout(), fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn targets_parse_from_strings_and_arrays() {
        assert_eq!(Target::parse(""), Target::None);
        assert_eq!(Target::parse("7"), Target::Id("7".into()));
        assert_eq!(Target::parse("1, 2,,3"), Target::Ids(vec!["1".into(), "2".into(), "3".into()]));
        assert_eq!(
            Target::from_value(&json!(["a", 5])).unwrap(),
            Target::Ids(vec!["a".into(), "5".into()])
        );
        assert!(Target::from_value(&json!({ "id": 1 })).is_err());
        assert!(Target::from_value(&json!([{}])).is_err());
    }
}
