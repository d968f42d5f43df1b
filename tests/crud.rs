mod common;

use admin_list_adapter::service::MAX_DELETES_IN_FLIGHT;
use admin_list_adapter::{AppError, Item, ListStore, MemoryListStore, RequestContext, SharedSecretCsrf, Target};
use admin_list_adapter::config::Operation;
use axum::http::Method;
use common::{events, posts, records, state, state_with, state_with_timeout, users, CountingStore, MockBackend};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn body(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn create_merges_split_date_and_time() {
    let list = posts();
    let store = Arc::new(MemoryListStore::new());
    let state = state(vec![list.clone()], store.clone());
    let outcome = state
        .dispatcher
        .create(
            &list,
            body(json!({ "title": "Kickoff", "start_date": "2024-05-01", "start_time": "10:30", "_csrf": "x" })),
            &RequestContext::default(),
        )
        .await
        .unwrap();
    let item = outcome.item.unwrap();
    assert_eq!(item.get("start"), Some(&json!("2024-05-01 10:30")));
    assert!(item.get("_csrf").is_none());
    assert_eq!(outcome.redirect, "/keystone/posts/1");
    assert_eq!(outcome.flash.unwrap().message, "New Post Kickoff created.");
    assert_eq!(store.len(&list).await, 1);
}

#[tokio::test]
async fn create_requires_name_and_update_reports_flash() {
    let list = posts();
    let store = Arc::new(MemoryListStore::new());
    store.seed(&list, records(3)).await;
    let state = state(vec![list.clone()], store);
    let ctx = RequestContext::default();

    let err = state.dispatcher.create(&list, body(json!({ "rank": "4" })), &ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Title is required."));

    let outcome = state
        .dispatcher
        .execute(&list, Operation::Update, Target::Id("2".into()), Some(body(json!({ "rank": "20" }))), &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.item.unwrap().get("rank"), Some(&json!(20)));
    assert_eq!(outcome.flash.unwrap().message, "Update Post success.");

    let missing = state
        .dispatcher
        .execute(&list, Operation::Update, Target::Id("99".into()), Some(body(json!({ "rank": 1 }))), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
}

#[tokio::test]
async fn bulk_delete_bounds_concurrency_and_skips_failures() {
    let list = posts();
    let store = Arc::new(CountingStore::new());
    store.inner.seed(&list, records(25)).await;
    store.fail_delete_of("7");
    let state = state(vec![list.clone()], store.clone());

    let ids: Vec<String> = (1..=25).map(|i| i.to_string()).collect();
    let report = state.dispatcher.delete(&list, ids, &RequestContext::default()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.count, 24);
    assert!(!report.ids.contains(&"7".to_string()));
    assert_eq!(report.ids.first().map(String::as_str), Some("1"));
    assert_eq!(report.ids.last().map(String::as_str), Some("25"));
    assert!(store.max_in_flight() <= MAX_DELETES_IN_FLIGHT);
    assert!(store.max_in_flight() > 1);
    assert_eq!(store.inner.len(&list).await, 1);
}

#[tokio::test]
async fn self_delete_is_refused_before_any_store_call() {
    let list = users();
    let store = Arc::new(CountingStore::new());
    store
        .inner
        .seed(&list, vec![Item::from_value(json!({ "id": "u1", "email": "a@b.c" })).unwrap()])
        .await;
    let state = state(vec![list.clone()], store.clone());
    let ctx = RequestContext::default().with_actor(Some("u1".into()));

    let err = state
        .dispatcher
        .delete(&list, vec!["u2".into(), "u1".into()], &ctx)
        .await
        .unwrap_err();
    assert!(err.is_policy());
    assert_eq!(err.to_string(), "not allowed: You can't delete your own User.");
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn csrf_is_checked_before_writes() {
    let list = posts();
    let store = Arc::new(CountingStore::new());
    let state = state_with(vec![list.clone()], store.clone(), Arc::new(SharedSecretCsrf::new("tok")));

    let err = state
        .dispatcher
        .create(&list, body(json!({ "title": "x" })), &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Csrf));
    assert_eq!(store.calls(), 0);

    let ctx = RequestContext::default().with_csrf(Some("tok".into()));
    assert!(state.dispatcher.create(&list, body(json!({ "title": "x" })), &ctx).await.is_ok());
}

#[tokio::test]
async fn update_all_applies_parsed_json_to_every_record() {
    let list = posts();
    let store = Arc::new(MemoryListStore::new());
    store.seed(&list, records(4)).await;
    let state = state(vec![list.clone()], store.clone());
    let ctx = RequestContext::default();

    let outcome = state
        .dispatcher
        .update_all(&list, Some(r#"{"state": "published"}"#), &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.updated, Some(4));
    assert_eq!(outcome.flash.unwrap().message, "All Posts updated successfully.");
    let item = store.find_by_id(&list, "3").await.unwrap().unwrap();
    assert_eq!(item.get("state"), Some(&json!("published")));

    let err = state.dispatcher.update_all(&list, Some("{not json"), &ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "validation: There was an error parsing the update data.");
}

#[tokio::test]
async fn rest_crud_dispatches_configured_verbs() {
    let mock = MockBackend::default();
    let base = mock.start().await;
    let list = events(&base);
    let state = state(vec![list.clone()], Arc::new(MemoryListStore::new()));
    let ctx = RequestContext::new(CancellationToken::new());

    let created = state
        .dispatcher
        .create(&list, body(json!({ "name": "Launch", "start_date": "2024-06-01", "start_time": "09:00" })), &ctx)
        .await
        .unwrap();
    assert_eq!(created.redirect, "/keystone/events/e9");

    let item = state.dispatcher.read(&list, "e1", &ctx).await.unwrap();
    assert_eq!(item.id_string().as_deref(), Some("e1"));
    assert_eq!(item.get("name"), Some(&json!("Launch")));

    state
        .dispatcher
        .update(&list, "e1", body(json!({ "location": "Paris" })), &ctx)
        .await
        .unwrap();
    let report = state.dispatcher.delete(&list, vec!["e2".into()], &ctx).await.unwrap();
    assert_eq!(report.ids, vec!["e2"]);

    let multi = state
        .dispatcher
        .delete(&list, vec!["e1".into(), "e2".into()], &ctx)
        .await
        .unwrap_err();
    assert!(matches!(multi, AppError::Validation(_)));

    let missing = state.dispatcher.read(&list, "missing", &ctx).await.unwrap_err();
    assert!(matches!(missing, AppError::Backend(ref m) if m.contains("404")));

    let seen: Vec<(Method, String)> = mock.requests().into_iter().map(|r| (r.method, r.path)).collect();
    assert_eq!(
        seen,
        vec![
            (Method::POST, "/events".to_string()),
            (Method::GET, "/events/e1".to_string()),
            (Method::PATCH, "/events/e1".to_string()),
            (Method::DELETE, "/events/e2".to_string()),
            (Method::GET, "/events/missing".to_string()),
        ]
    );
    let create_body = mock.requests()[0].body.clone().unwrap();
    assert_eq!(
        create_body,
        json!({ "data": { "name": "Launch", "start": "2024-06-01 09:00" } })
    );
}

#[tokio::test]
async fn update_all_is_refused_for_rest_lists() {
    let mock = MockBackend::default();
    let base = mock.start().await;
    let list = events(&base);
    let state = state(vec![list.clone()], Arc::new(MemoryListStore::new()));
    let err = state
        .dispatcher
        .update_all(&list, Some(r#"{"archived": true}"#), &RequestContext::default())
        .await
        .unwrap_err();
    assert!(err.is_policy());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn repeated_ids_are_deleted_and_counted_once() {
    let list = posts();
    let store = Arc::new(CountingStore::new());
    store.inner.seed(&list, records(3)).await;
    let state = state(vec![list.clone()], store.clone());

    let report = state
        .dispatcher
        .delete(&list, vec!["1".into(), "1".into(), "2".into()], &RequestContext::default())
        .await
        .unwrap();
    assert_eq!(report.ids, vec!["1", "2"]);
    assert_eq!(report.count, 2);
    assert_eq!(store.calls(), 2);
    assert_eq!(store.inner.len(&list).await, 1);
}

#[tokio::test]
async fn cancelling_the_request_stops_a_running_bulk_delete() {
    let list = posts();
    let store = Arc::new(CountingStore::new());
    store.inner.seed(&list, records(25)).await;
    let state = state(vec![list.clone()], store.clone());

    let cancel = CancellationToken::new();
    let ctx = RequestContext::new(cancel.clone());
    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        cancel.cancel();
    });
    let ids: Vec<String> = (1..=25).map(|i| i.to_string()).collect();
    let err = state.dispatcher.delete(&list, ids, &ctx).await.unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, AppError::Cancelled));
    assert!(store.calls() < 25);
    assert!(store.inner.len(&list).await > 0);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let mock = MockBackend::default();
    let base = mock.start().await;
    let list = events(&format!("{}/slow", base));
    let state = state_with_timeout(vec![list.clone()], Arc::new(MemoryListStore::new()), Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = state
        .dispatcher
        .read(&list, "e1", &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Backend(ref m) if m.contains("timed out")), "{err}");
    assert!(started.elapsed() < common::SLOW_RESPONSE);
    assert_eq!(mock.requests()[0].path, "/slow/events/e1");
}
