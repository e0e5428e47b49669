//! Single-flight refresh of the access token.
//!
//! Any number of requests can observe a 401 concurrently; the coordinator
//! guarantees at most one refresh call is in flight and every waiter sees
//! that call's outcome. The pending slot holds a shared future and is
//! cleared when the refresh settles, so a later 401 starts a fresh attempt.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::error::RefreshError;
use crate::api::transport::{ApiRequest, HttpBackend};
use crate::auth::session::SessionHandle;
use crate::auth::store::{CredentialStore, TokenKind};
use crate::models::RefreshResponse;

/// Route exchanging a refresh token for a new access token.
const REFRESH_PATH: &str = "/token/refresh/";

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    store: CredentialStore,
    backend: Arc<dyn HttpBackend>,
    session: SessionHandle,
    pending: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(
        store: CredentialStore,
        backend: Arc<dyn HttpBackend>,
        session: SessionHandle,
    ) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                store,
                backend,
                session,
                pending: Mutex::new(None),
            }),
        }
    }

    /// Obtain a fresh access token, joining any refresh already in flight.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let pending = {
            let mut slot = self.inner.pending.lock();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = run_refresh(self.inner.clone()).boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }
}

/// The single in-flight refresh. Clears the pending slot and runs the
/// terminal-failure side effects exactly once.
async fn run_refresh(inner: Arc<RefreshInner>) -> Result<String, RefreshError> {
    let result = exchange(&inner).await;
    if let Err(ref err) = result {
        warn!(%err, "token refresh failed, clearing credentials");
        if let Err(err) = inner.store.clear_all() {
            warn!(%err, "failed to clear persisted tokens");
        }
        inner.session.force_logout();
    }
    // Clear the slot only after the failure cleanup, so a caller arriving
    // mid-cleanup joins this attempt instead of leading a new one with the
    // already-rejected refresh token
    *inner.pending.lock() = None;
    result
}

async fn exchange(inner: &RefreshInner) -> Result<String, RefreshError> {
    let Some(refresh_token) = inner.store.get(TokenKind::Refresh) else {
        return Err(RefreshError::NoRefreshToken);
    };
    debug!("exchanging refresh token for a new access token");
    let request = ApiRequest::post(REFRESH_PATH)
        .with_json(serde_json::json!({ "refresh": refresh_token }));
    let response = inner
        .backend
        .execute(request)
        .await
        .map_err(|err| RefreshError::Network(err.to_string()))?;
    if !response.status.is_success() {
        return Err(RefreshError::Rejected);
    }
    let parsed: RefreshResponse = response
        .json()
        .map_err(|err| RefreshError::Network(err.to_string()))?;
    if let Err(err) = inner.store.set(TokenKind::Access, &parsed.access) {
        warn!(%err, "failed to persist refreshed access token");
    }
    Ok(parsed.access)
}
