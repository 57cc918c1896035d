mod common;

use axum::http::StatusCode;
use benefits_service::Application;
use common::{get, send, FakeStore, TestApp};
use reqwest::Client;

#[tokio::test]
async fn health_check_works() {
    let router = TestApp::with_store(FakeStore::unreachable()).router();

    let res = send(router, get("/health")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["service"], "benefits-service");
}

#[tokio::test]
async fn readiness_follows_database_probe() {
    let ready = send(
        TestApp::with_store(FakeStore::new(Vec::new())).router(),
        get("/ready"),
    )
    .await;
    assert_eq!(ready.status, StatusCode::OK);

    let not_ready = send(
        TestApp::with_store(FakeStore::unreachable()).router(),
        get("/ready"),
    )
    .await;
    assert_eq!(not_ready.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn served_over_tcp_with_request_id() {
    let state = TestApp::with_store(FakeStore::new(Vec::new())).state();
    let app = Application::with_state(0, state)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let client = Client::new();
    let mut response = None;
    for _ in 0..50 {
        if let Ok(res) = client
            .get(format!("{}/benefits", address))
            .header("x-request-id", "req-42")
            .send()
            .await
        {
            response = Some(res);
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
    let response = response.expect("Server did not start");

    assert!(response.status().is_success());
    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body, serde_json::json!([]));
}
