//! List handlers: paginated listing, single item, create, update, delete, bulk delete, update-all.

use crate::config::{ListDescriptor, Operation};
use crate::error::AppError;
use crate::extractors::{ActorId, CsrfToken};
use crate::filter::{get_search_filters, process_filters};
use crate::pagination::paginate;
use crate::response::{success_one_ok, ListPage, ListSummary, SuccessOne};
use crate::service::{Outcome, RequestContext, Target};
use crate::sort::{expand_columns, resolve_sort};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `path:expr;path:expr`
    pub filters: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub regex: bool,
    pub sort: Option<String>,
    pub cols: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAllQuery {
    pub update: Option<String>,
}

/// Request-scoped token; dropping the guard (handler finished or client gone) cancels in-flight calls.
fn request_context(actor: ActorId, csrf: CsrfToken) -> (RequestContext, DropGuard) {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    (RequestContext::new(cancel).with_actor(actor.0).with_csrf(csrf.0), guard)
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Success as JSON; failure as the error body with the admin redirect and flash in `details`.
fn respond(
    state: &AppState,
    list: &ListDescriptor,
    op: Operation,
    status: StatusCode,
    res: Result<Outcome, AppError>,
) -> Response {
    match res {
        Ok(outcome) => (status, Json(SuccessOne { data: outcome, meta: None })).into_response(),
        Err(err) => {
            let failure = Outcome::failure(state.dispatcher.path_prefix(), list, op, &err);
            let details = serde_json::to_value(failure).unwrap_or(Value::Null);
            err.with_details(details)
        }
    }
}

pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let lists: Vec<ListSummary> = state.registry.lists.iter().map(|l| ListSummary::from(l.as_ref())).collect();
    success_one_ok(lists)
}

pub async fn list(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let list = state.list(&path)?;
    let base = process_filters(&list, q.filters.as_deref());
    let filters = get_search_filters(&list, q.search.as_deref(), base, q.regex);
    let sort = resolve_sort(&list, q.sort.as_deref());
    let columns = expand_columns(&list, q.cols.as_deref());

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let page = paginate(
        list.clone(),
        filters,
        q.page.unwrap_or(1),
        q.per_page.filter(|n| *n > 0),
        state.settings.max_pages,
    )
    .sort(sort.spec.clone())
    .exec(state.dispatcher.backends(), &cancel)
    .await?;

    Ok(success_one_ok(ListPage {
        list: ListSummary::from(list.as_ref()),
        columns,
        sort: sort.spec,
        sort_cleared: sort.cleared,
        visible_pages: page.visible_pages(),
        page,
    }))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let list = state.list(&path)?;
    let (ctx, _guard) = request_context(ActorId(None), CsrfToken(None));
    let item = state.dispatcher.read(&list, &id, &ctx).await?;
    Ok(success_one_ok(item))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path): Path<String>,
    actor: ActorId,
    csrf: CsrfToken,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let list = state.list(&path)?;
    let body = body_to_map(body)?;
    let (ctx, _guard) = request_context(actor, csrf);
    let res = state.dispatcher.execute(&list, Operation::Create, Target::None, Some(body), &ctx).await;
    Ok(respond(&state, &list, Operation::Create, StatusCode::CREATED, res))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path, id)): Path<(String, String)>,
    actor: ActorId,
    csrf: CsrfToken,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let list = state.list(&path)?;
    let body = body_to_map(body)?;
    let (ctx, _guard) = request_context(actor, csrf);
    let res = state
        .dispatcher
        .execute(&list, Operation::Update, Target::Id(id), Some(body), &ctx)
        .await;
    Ok(respond(&state, &list, Operation::Update, StatusCode::OK, res))
}

/// `DELETE /:list/:id`; the id segment may be a comma-delimited list.
pub async fn delete(
    State(state): State<AppState>,
    Path((path, ids)): Path<(String, String)>,
    actor: ActorId,
    csrf: CsrfToken,
) -> Result<Response, AppError> {
    let list = state.list(&path)?;
    let (ctx, _guard) = request_context(actor, csrf);
    let res = state
        .dispatcher
        .execute(&list, Operation::Delete, Target::parse(&ids), None, &ctx)
        .await;
    Ok(respond(&state, &list, Operation::Delete, StatusCode::OK, res))
}

/// `POST /:list/delete` with `{"ids": [...]}` or `{"ids": "a,b"}` (or `id`). Responds `{success, ids, count}`.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Path(path): Path<String>,
    actor: ActorId,
    csrf: CsrfToken,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let list = state.list(&path)?;
    let raw = body
        .get("ids")
        .or_else(|| body.get("id"))
        .ok_or_else(|| AppError::Validation("ids must be an Array or comma-delimited list of ids".into()))?;
    let ids = Target::from_value(raw)?.into_ids();
    let (ctx, _guard) = request_context(actor, csrf);
    let report = state.dispatcher.delete(&list, ids, &ctx).await?;
    Ok(Json(report))
}

/// `POST /:list/update-all?update=<json>`
pub async fn update_all(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<UpdateAllQuery>,
    actor: ActorId,
    csrf: CsrfToken,
) -> Result<Response, AppError> {
    let list = state.list(&path)?;
    let (ctx, _guard) = request_context(actor, csrf);
    let res = state.dispatcher.update_all(&list, q.update.as_deref(), &ctx).await;
    Ok(respond(&state, &list, Operation::Update, StatusCode::OK, res))
}
