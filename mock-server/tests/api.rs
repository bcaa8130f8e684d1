use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_store, Object, Store};
use serde_json::{json, Value};
use tower::ServiceExt;

const API: &str = "/attask/api/v4.0";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, path_and_query: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(format!("{API}{path_and_query}"))
        .body(String::new())
        .unwrap()
}

async fn call(router: &axum::Router, method: &str, path_and_query: &str) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(request(method, path_and_query)).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn login(router: &axum::Router) -> String {
    let (status, body) = call(router, "POST", "/login?method=POST&username=ann&password=pw").await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["sessionID"].as_str().unwrap().to_string()
}

fn seeded() -> (axum::Router, String) {
    let mut store = Store::default();
    let mut fields = Object::new();
    fields.insert("name".into(), json!("Launch"));
    fields.insert("status".into(), json!("CUR"));
    fields.insert("assignedToID".into(), json!("ann"));
    let id = store.insert("task", fields);
    let mut other = Object::new();
    other.insert("name".into(), json!("Backlog"));
    other.insert("status".into(), json!("NEW"));
    store.insert("task", other);
    (app_with_store(store), id)
}

// --- session ---

#[tokio::test]
async fn login_returns_session_id() {
    let router = app();
    let (status, body) = call(&router, "POST", "/login?method=POST&username=ann&password=pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userID"], "ann");
    assert!(body["data"]["sessionID"].is_string());
}

#[tokio::test]
async fn login_with_rejected_password_is_an_error_envelope() {
    let router = app();
    let (status, body) = call(&router, "POST", "/login?method=POST&username=ann&password=wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid username or password");
}

#[tokio::test]
async fn calls_without_session_are_rejected() {
    let router = app();
    let (status, body) = call(&router, "GET", "/task/search?method=GET").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "You are not currently logged in");
}

#[tokio::test]
async fn logout_ends_session() {
    let router = app();
    let session = login(&router).await;
    let (status, body) = call(&router, "GET", &format!("/logout?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    let (status, _) = call(&router, "GET", &format!("/metadata?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unversioned_context_is_served() {
    let router = app();
    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/attask/api/login?username=ann&password=pw")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_context_is_not_found() {
    let router = app();
    let resp = router
        .oneshot(Request::builder().uri("/api/task").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_json(resp).await["error"]["message"].is_string());
}

// --- objects ---

#[tokio::test]
async fn search_filters_by_field() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (status, body) = call(
        &router,
        "GET",
        &format!("/task/search?sessionID={session}&method=GET&status=CUR&fields=name"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["ID"], id.as_str());
}

#[tokio::test]
async fn count_and_report() {
    let (router, _) = seeded();
    let session = login(&router).await;
    let (_, body) = call(&router, "GET", &format!("/task/count?sessionID={session}&method=GET")).await;
    assert_eq!(body["data"]["count"], 2);
    let (_, body) = call(&router, "GET", &format!("/task/report?sessionID={session}&method=GET&status=NEW")).await;
    assert_eq!(body["data"]["dcount"], 1);
}

#[tokio::test]
async fn method_parameter_overrides_http_verb() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (status, body) = call(&router, "GET", &format!("/task/{id}?sessionID={session}&method=DELETE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    let (status, _) = call(&router, "GET", &format!("/task/{id}?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_update_and_copy() {
    let router = app();
    let session = login(&router).await;

    let (_, body) = call(&router, "POST", &format!("/proj?sessionID={session}&method=POST&name=Alpha")).await;
    let id = body["data"]["ID"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["objCode"], "PROJ");
    assert_eq!(body["data"]["name"], "Alpha");

    let (_, body) = call(
        &router,
        "PUT",
        &format!("/proj/{id}?sessionID={session}&method=PUT&updates=%7B%22name%22%3A%22Beta%22%7D"),
    )
    .await;
    assert_eq!(body["data"]["name"], "Beta");

    let (_, body) = call(
        &router,
        "POST",
        &format!("/proj?sessionID={session}&method=POST&copySourceID={id}&updates=%7B%22status%22%3A%22NEW%22%7D"),
    )
    .await;
    assert_ne!(body["data"]["ID"], id.as_str());
    assert_eq!(body["data"]["name"], "Beta");
    assert_eq!(body["data"]["status"], "NEW");
}

#[tokio::test]
async fn bad_updates_are_rejected() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (status, body) = call(&router, "PUT", &format!("/task/{id}?sessionID={session}&method=PUT&updates=nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "updates must be a JSON object");
}

#[tokio::test]
async fn execute_records_action() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (_, body) = call(&router, "PUT", &format!("/task/{id}/markDone?sessionID={session}&method=PUT")).await;
    assert_eq!(body["data"]["success"], true);
    let (_, body) = call(&router, "GET", &format!("/task/{id}?sessionID={session}&method=GET")).await;
    assert_eq!(body["data"]["lastAction"], "markDone");
}

#[tokio::test]
async fn named_query_and_metadata() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (_, body) = call(&router, "GET", &format!("/task/myWork?sessionID={session}&method=GET")).await;
    let mine = body["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["ID"], id.as_str());

    let (_, body) = call(&router, "GET", &format!("/task/metadata?sessionID={session}&method=GET")).await;
    assert_eq!(body["data"]["objCode"], "TASK");
    assert!(body["data"]["fields"].as_array().unwrap().contains(&json!("status")));

    let (_, body) = call(&router, "GET", &format!("/metadata?sessionID={session}&method=GET")).await;
    assert_eq!(body["data"]["objects"], json!(["task"]));
}

// --- batch ---

#[tokio::test]
async fn batch_runs_each_uri_under_batch_session() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (status, body) = call(
        &router,
        "GET",
        &format!(
            "/batch?sessionID={session}&method=GET&uri=%2Ftask%2F{id}%3Fmethod%3DGET&uri=%2Ftask%2Fcount%3Fmethod%3DGET"
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["name"], "Launch");
    assert_eq!(results[1]["count"], 2);
}

#[tokio::test]
async fn non_atomic_batch_reports_failures_inline() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (_, body) = call(
        &router,
        "GET",
        &format!("/batch?sessionID={session}&method=GET&uri=%2Ftask%2F{id}%3Fmethod%3DDELETE&uri=%2Ftask%2Fmissing%3Fmethod%3DGET"),
    )
    .await;
    let results = body["data"].as_array().unwrap();
    assert_eq!(results[0]["success"], true);
    assert!(results[1]["error"]["message"].is_string());
}

#[tokio::test]
async fn atomic_batch_rolls_back_on_failure() {
    let (router, id) = seeded();
    let session = login(&router).await;
    let (status, body) = call(
        &router,
        "GET",
        &format!(
            "/batch?sessionID={session}&method=GET&atomic=true&uri=%2Ftask%2F{id}%3Fmethod%3DDELETE&uri=%2Ftask%2Fmissing%3Fmethod%3DGET"
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"].is_string());

    let (status, _) = call(&router, "GET", &format!("/task/{id}?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let router = app();
    let session = login(&router).await;
    let (status, _) = call(&router, "GET", &format!("/batch?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_id_is_not_found_but_my_work_lists() {
    let (router, _) = seeded();
    let session = login(&router).await;
    let (status, body) = call(&router, "GET", &format!("/task/allOpen?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "task allOpen not found");

    let (status, body) = call(&router, "GET", &format!("/task/myWork?sessionID={session}&method=GET")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_array());
}
