//! Scripted HTTP backend and small fixtures shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, SET_COOKIE};
use reqwest::StatusCode;

use crate::api::transport::{ApiRequest, ApiResponse, HttpBackend};
use crate::api::ApiError;
use crate::auth::store::CredentialStore;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync;

/// Backend whose responses come from a closure. Records every request and can
/// delay responses so tests can pile up concurrent callers deterministically.
pub struct MockBackend {
    handler: Box<Handler>,
    delay: Duration,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockBackend {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn with_delay(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay,
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.log.lock().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl HttpBackend for MockBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.log.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request)
    }
}

pub fn response(status: u16) -> ApiResponse {
    ApiResponse {
        status: StatusCode::from_u16(status).expect("valid status code"),
        headers: HeaderMap::new(),
        body: Vec::new(),
    }
}

pub fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
    let mut response = response(status);
    response.body = body.to_string().into_bytes();
    response
}

/// A 200 response carrying the csrftoken cookie, like `GET /csrf/` returns.
pub fn csrf_response(token: &str) -> ApiResponse {
    let mut response = response(200);
    let cookie = format!("csrftoken={token}; Path=/; SameSite=Lax");
    response.headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("valid cookie"),
    );
    response
}

/// The bearer token a request carries, if any.
pub fn bearer_of(request: &ApiRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// A credential store rooted in a fresh temp dir. Keep the dir alive for the
/// duration of the test.
pub fn temp_store() -> (tempfile::TempDir, CredentialStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CredentialStore::open(dir.path().join("tokens.json")).expect("open store");
    (dir, store)
}
