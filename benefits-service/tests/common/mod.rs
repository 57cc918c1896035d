//! Common test utilities for benefits-service integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use benefits_service::models::{Benefit, BenefitFilter};
use benefits_service::services::{
    AiWebhookClient, BenefitCatalog, BenefitStore, ServiceAccountAuth, SheetsClient,
};
use benefits_service::{build_router, AppState};
use http_body_util::BodyExt;
use service_core::error::AppError;
use std::sync::{Arc, Mutex, Once};
use tower::util::ServiceExt;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/service_account_key.pub.pem");
pub const TEST_SERVICE_ACCOUNT: &str = "benefits-reader@test-project.iam.gserviceaccount.com";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,benefits_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// In-memory stand-in for the Postgres store. Category and bank filters
/// use exact, case-sensitive equality like SQL `=` under a deterministic
/// collation.
pub struct FakeStore {
    reachable: bool,
    query_fails: bool,
    rows: Vec<Benefit>,
    queries: Mutex<Vec<BenefitFilter>>,
}

impl FakeStore {
    pub fn new(rows: Vec<Benefit>) -> Arc<Self> {
        Arc::new(Self {
            reachable: true,
            query_fails: false,
            rows,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reachable: false,
            query_fails: false,
            rows: Vec::new(),
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Connects fine, but every query errors the way `run_query` does.
    pub fn failing_query() -> Arc<Self> {
        Arc::new(Self {
            reachable: true,
            query_fails: true,
            rows: Vec::new(),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<BenefitFilter> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BenefitStore for FakeStore {
    async fn check_connection(&self) -> bool {
        self.reachable
    }

    async fn fetch_benefits(&self, filter: &BenefitFilter) -> Result<Vec<Benefit>, AppError> {
        self.queries.lock().unwrap().push(filter.clone());
        if self.query_fails {
            return Err(AppError::SourceUnavailable(anyhow::anyhow!(
                "Database query failed: relation \"benefits\" does not exist"
            )));
        }

        let exact = |benefit: &Benefit, key: &str, wanted: &Option<String>| match wanted {
            Some(wanted) => benefit.text(key) == Some(wanted.as_str()),
            None => true,
        };
        let matching = self
            .rows
            .iter()
            .filter(|b| exact(b, "category", &filter.category) && exact(b, "bank", &filter.bank))
            .cloned();

        Ok(match filter.limit {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        })
    }
}

pub fn benefit(pairs: &[(&str, &str)]) -> Benefit {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

/// Builder for a router wired to fakes and mock servers.
pub struct TestApp {
    sheet_url: Option<String>,
    auth: Option<ServiceAccountAuth>,
    store: Arc<dyn BenefitStore>,
    webhook_url: Option<String>,
}

impl TestApp {
    pub fn with_store(store: Arc<dyn BenefitStore>) -> Self {
        init_tracing();
        Self {
            sheet_url: None,
            auth: None,
            store,
            webhook_url: None,
        }
    }

    pub fn sheet(mut self, url: impl Into<String>) -> Self {
        self.sheet_url = Some(url.into());
        self
    }

    pub fn service_account(mut self, token_url: &str) -> Self {
        self.auth = Some(
            ServiceAccountAuth::new(
                reqwest::Client::new(),
                TEST_SERVICE_ACCOUNT,
                TEST_PRIVATE_KEY,
                token_url,
            )
            .expect("Failed to build service account auth"),
        );
        self
    }

    pub fn webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn state(self) -> AppState {
        let client = reqwest::Client::new();
        let sheets = self
            .sheet_url
            .map(|url| SheetsClient::new(client.clone(), url, self.auth));
        AppState::new(
            BenefitCatalog::new(sheets, self.store),
            AiWebhookClient::new(client, self.webhook_url),
        )
    }

    pub fn router(self) -> Router {
        build_router(self.state())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Drive one request through the router and decode the JSON body
/// (`Null` when the body is empty).
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("Request failed");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn assert_fixed_headers(headers: &HeaderMap) {
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-credentials"], "true");
}
