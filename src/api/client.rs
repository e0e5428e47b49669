//! The authenticated request pipeline.
//!
//! Every application request goes through `send`: the stored access token is
//! attached as a bearer header, a 401 response triggers one coordinated
//! refresh, and the original request is replayed at most once with the fresh
//! token. Account endpoints that sit outside the token flow (signup, logout,
//! password reset) are CSRF-gated instead and bypass the 401 interception,
//! so a rejected login can never recurse into the refresh path.

use std::sync::Arc;

use reqwest::header::HeaderName;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::auth::refresh::RefreshCoordinator;
use crate::auth::store::{CredentialStore, TokenKind};
use crate::models::{TokenPair, UserInfo};

use super::error::flatten_field_errors;
use super::transport::{ApiRequest, ApiResponse, HttpBackend};
use super::ApiError;

// ============================================================================
// Routes
// ============================================================================

const TOKEN_PATH: &str = "/token/";
const USER_PATH: &str = "/auth/user/";
const CSRF_PATH: &str = "/csrf/";
const SIGNUP_PATH: &str = "/signup/";
const LOGOUT_PATH: &str = "/logout/";
const PASSWORD_RESET_PATH: &str = "/password-reset/";

/// Cookie set by the CSRF endpoint.
const CSRF_COOKIE: &str = "csrftoken";

/// Header carrying the anti-forgery token on mutating calls.
const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrftoken");

/// Authenticated request pipeline over a pluggable backend.
/// Clone is cheap - the backend, store and coordinator are all shared.
#[derive(Clone)]
pub struct ApiClient {
    backend: Arc<dyn HttpBackend>,
    store: CredentialStore,
    refresher: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        store: CredentialStore,
        refresher: RefreshCoordinator,
    ) -> Self {
        Self {
            backend,
            store,
            refresher,
        }
    }

    // ===== Request pipeline =====

    /// Issue an authenticated request, refreshing the access token at most
    /// once on a 401 and replaying the original request with the new token.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let attempt = self.with_stored_bearer(request.clone())?;
        let response = self.backend.execute(attempt).await?;
        if response.status.as_u16() != 401 {
            return Self::check(response);
        }
        debug!(path = %request.path, "got 401, refreshing access token");
        let access = self.refresher.refresh().await?;
        let retried = request.with_bearer(&access)?;
        let response = self.backend.execute(retried).await?;
        // A second 401 is terminal - never refresh twice for one request
        Self::check(response)
    }

    /// Issue a request without 401 interception (token and account routes).
    async fn send_raw(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.backend.execute(request).await?;
        Self::check(response)
    }

    fn with_stored_bearer(&self, request: ApiRequest) -> Result<ApiRequest, ApiError> {
        match self.store.get(TokenKind::Access) {
            Some(token) => request.with_bearer(&token),
            None => Ok(request),
        }
    }

    fn check(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.text()))
        }
    }

    /// Map a failed response to `Validation` when it carries field errors.
    fn check_validation(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.status.is_success() {
            return Ok(response);
        }
        if let Ok(value) = response.json::<serde_json::Value>() {
            let message = flatten_field_errors(&value);
            if !message.is_empty() {
                return Err(ApiError::Validation(message));
            }
        }
        Err(ApiError::from_status(response.status, &response.text()))
    }

    // ===== Convenience verbs for application resources =====

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).with_json(body)).await?.json()
    }

    // ===== Authentication endpoints =====

    /// Exchange username/password for a token pair. A 401 here means the
    /// credentials were rejected, not that a token expired, so the refresh
    /// pipeline is deliberately not involved.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(TOKEN_PATH)
            .with_json(json!({ "username": username, "password": password }));
        let response = self.backend.execute(request).await?;
        if response.status.as_u16() == 401 {
            let detail = response
                .json::<serde_json::Value>()
                .ok()
                .and_then(|value| {
                    value
                        .get("detail")
                        .and_then(|d| d.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "invalid username or password".to_string());
            return Err(ApiError::InvalidCredentials(detail));
        }
        Self::check(response)?.json()
    }

    /// Fetch the authenticated principal.
    pub async fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.send(ApiRequest::get(USER_PATH)).await?.json()
    }

    // ===== CSRF-gated account endpoints =====

    /// Fetch the anti-forgery token. The server rotates the cookie (notably
    /// on login), so every mutating call fetches a fresh value instead of
    /// reusing one that may already be stale.
    pub async fn fetch_csrf(&self) -> Result<String, ApiError> {
        let response = self.send_raw(ApiRequest::get(CSRF_PATH)).await?;
        response.cookie(CSRF_COOKIE).ok_or_else(|| {
            ApiError::InvalidResponse("CSRF endpoint set no csrftoken cookie".to_string())
        })
    }

    async fn csrf_request(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiRequest, ApiError> {
        let csrf = self.fetch_csrf().await?;
        ApiRequest::post(path)
            .with_json(body)
            .with_header(CSRF_HEADER, &csrf)
    }

    /// Create an account. Field errors come back concatenated into one
    /// user-facing message.
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        password2: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "username": username, "password": password, "password2": password2 });
        let request = self.csrf_request(SIGNUP_PATH, body).await?;
        let response = self.backend.execute(request).await?;
        Self::check_validation(response)?;
        Ok(())
    }

    /// Tell the backend the session ended. The caller decides whether a
    /// failure matters; local logout never depends on this call.
    pub async fn backend_logout(&self) -> Result<(), ApiError> {
        let request = self.csrf_request(LOGOUT_PATH, json!({})).await?;
        // Attach the bearer if one is still stored, but skip the refresh
        // pipeline - a dying session should not mint new tokens
        let request = self.with_stored_bearer(request)?;
        let response = self.backend.execute(request).await?;
        Self::check(response)?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .csrf_request(PASSWORD_RESET_PATH, json!({ "email": email }))
            .await?;
        let response = self.backend.execute(request).await?;
        Self::check_validation(response)?;
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/password-reset-confirm/{}/{}/", uid, token);
        let request = self.csrf_request(&path, json!({ "password": password })).await?;
        let response = self.backend.execute(request).await?;
        Self::check_validation(response)?;
        Ok(())
    }
}
