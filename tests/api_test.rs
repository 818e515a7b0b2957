mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{app_state, StubTrendProvider, WORKER_SECRET};
use umkm_pantau::app::create_app;
use umkm_pantau::models::{Frequency, UserPreference};
use umkm_pantau::store::{InMemoryStore, PreferenceStore};

fn app(store: &InMemoryStore) -> Router {
    let provider = StubTrendProvider::default()
        .with("harga cabai", &[80.0, 90.0])
        .with("harga beras", &[50.0, 51.0]);
    create_app(app_state(Arc::new(store.clone()), provider))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn worker_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let store = InMemoryStore::new();
    let (status, body) = send(&app(&store), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_worker_requires_bearer_token() {
    let store = InMemoryStore::new();
    let app = app(&store);

    let (status, _) = send(&app, worker_request("/api/worker/notifications", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, worker_request("/api/worker/notifications", Some("salah"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/worker/runs")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_worker_secret_surrounding_whitespace_is_ignored() {
    let store = InMemoryStore::new();
    let mut state = app_state(Arc::new(store.clone()), StubTrendProvider::default());
    state.worker_secret = Some(Arc::from(format!("  {}\n", WORKER_SECRET)));
    let app = create_app(state);

    let (status, _) = send(&app, worker_request("/api/worker/notifications", Some(WORKER_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_worker_rejects_unknown_frequency() {
    let store = InMemoryStore::new();
    let (status, body) = send(
        &app(&store),
        worker_request("/api/worker/notifications?frequency=monthly", Some(WORKER_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("monthly"));
}

#[tokio::test]
async fn test_worker_run_generates_and_is_tracked() {
    let store = InMemoryStore::new();
    let user_id = Uuid::new_v4();
    let mut pref = UserPreference::default_for_user(user_id);
    pref.frequency = Frequency::Hourly;
    pref.keywords = vec!["harga cabai".to_string(), "harga beras".to_string()];
    store.upsert_preference(&pref).await.unwrap();

    let app = app(&store);
    let (status, body) = send(
        &app,
        worker_request("/api/worker/notifications?frequency=hourly", Some(WORKER_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], 1);
    assert_eq!(body["summary"]["users_processed"], 1);
    assert_eq!(body["summary"]["frequency"], "hourly");

    let runs_request = Request::builder()
        .uri("/api/worker/runs")
        .header(header::AUTHORIZATION, format!("Bearer {}", WORKER_SECRET))
        .body(Body::empty())
        .unwrap();
    let (status, runs) = send(&app, runs_request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs[0]["job_name"], "notification_worker_hourly");
    assert_eq!(runs[0]["status"], "success");

    let (status, inbox) = send(&app, get(&format!("/api/users/{}/notifications", user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["direction"], "naik");
    assert_eq!(inbox[0]["icon_hint"], "trending_up");
}

#[tokio::test]
async fn test_notification_inbox_flow() {
    let store = InMemoryStore::new();
    let app = app(&store);
    let user_id = Uuid::new_v4();
    let base = format!("/api/users/{}/notifications", user_id);

    let (status, created) = send(
        &app,
        json_request(
            Method::POST,
            &base,
            json!({ "title": "Tes notifikasi", "body": "Ini uji coba", "direction": "turun" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["category"], "manual");
    assert_eq!(created["read"], false);
    let id = created["id"].as_str().unwrap().to_string();

    send(
        &app,
        json_request(Method::POST, &base, json!({ "title": "Kedua", "body": "Lagi" })),
    )
    .await;

    let (_, count) = send(&app, get(&format!("{}/unread-count", base))).await;
    assert_eq!(count["count"], 2);

    // Another user cannot touch it
    let other = format!("/api/users/{}/notifications/{}/read", Uuid::new_v4(), id);
    let (status, _) = send(&app, json_request(Method::POST, &other, json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, read) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri(format!("{}/{}/read", base, id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);

    let (_, unread) = send(&app, get(&format!("{}?unread_only=true", base))).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
    assert_eq!(unread[0]["title"], "Kedua");

    let (_, updated) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri(format!("{}/read-all", base))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(updated["updated"], 1);

    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("{}/{}", base, id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.notification_count(), 1);
}

#[tokio::test]
async fn test_manual_notification_validation_error() {
    let store = InMemoryStore::new();
    let (status, body) = send(
        &app(&store),
        json_request(
            Method::POST,
            &format!("/api/users/{}/notifications", Uuid::new_v4()),
            json!({ "title": "", "body": "isi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_preferences_round_trip() {
    let store = InMemoryStore::new();
    let app = app(&store);
    let uri = format!("/api/users/{}/preferences", Uuid::new_v4());

    let (status, prefs) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["frequency"], "daily");
    assert_eq!(prefs["notifications_enabled"], true);

    let (status, prefs) = send(
        &app,
        json_request(
            Method::PUT,
            &uri,
            json!({ "frequency": "weekly", "keywords": ["  Harga Gula "] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["frequency"], "weekly");
    assert_eq!(prefs["keywords"], json!(["harga gula"]));

    let (status, _) = send(
        &app,
        json_request(Method::PUT, &uri, json!({ "change_threshold_percent": 150.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(Method::PUT, &uri, json!({ "keywords": ["a".repeat(150)] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("100"));

    let (status, prefs) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri(format!("{}/reset", uri))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["frequency"], "daily");
}

#[tokio::test]
async fn test_trend_series_and_analysis() {
    let store = InMemoryStore::new();
    let app = app(&store);

    let (status, _) = send(&app, get("/api/trends/harga%20cabai/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, series) = send(&app, get("/api/trends/harga%20cabai?persist=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series["keyword"], "harga cabai");
    assert_eq!(series["points"].as_array().unwrap().len(), 2);

    let (status, latest) = send(&app, get("/api/trends/harga%20cabai/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["points"].as_array().unwrap().len(), 2);

    let (status, analysis) = send(&app, get("/api/trends/harga%20cabai/analysis")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["significant"], true);
    assert_eq!(analysis["change"]["direction"], "naik");
    assert!((analysis["change"]["percent_change"].as_f64().unwrap() - 12.5).abs() < 1e-9);
    assert_eq!(analysis["analysis"]["source"], "template");

    let (_, small) = send(&app, get("/api/trends/harga%20beras/analysis")).await;
    assert_eq!(small["significant"], false);
    assert!(small["analysis"].is_null());

    // Unknown keyword: provider outage with no snapshot gives an empty series
    let (status, empty) = send(&app, get("/api/trends/harga%20gula/analysis")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["series_len"], 0);
    assert_eq!(empty["no_signal_reason"], "insufficient_data");
}

#[tokio::test]
async fn test_chat_degrades_when_ai_is_disabled() {
    let store = InMemoryStore::new();
    let (status, body) = send(
        &app(&store),
        json_request(
            Method::POST,
            "/api/chat",
            json!({ "user_id": Uuid::new_v4(), "message": "Apakah harga cabai akan naik?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["degraded"], true);
    assert!(!body["reply"].as_str().unwrap().is_empty());
}
