//! Reactive session state and the outward-facing session manager.
//!
//! `Session` is the three-state machine the UI consumes. `SessionHandle` is
//! the observable holder (watch channel) plus the navigation-intent hook;
//! the session layer is its only writer. `SessionManager` is the facade the
//! application constructs once: it owns the credential store, the refresh
//! coordinator, the transport pipeline and the session state, with no
//! free-floating globals.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::transport::{HttpBackend, ReqwestBackend};
use crate::api::{ApiClient, ApiError};
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::store::{CredentialStore, TokenKind};
use crate::config::Config;
use crate::models::UserInfo;

/// Authentication state visible to the UI layer.
///
/// `Authenticated` carries the principal, so "authenticated with no
/// principal" is unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    /// Initial bootstrap has not settled yet.
    Loading,
    Anonymous,
    Authenticated(UserInfo),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Session::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

type NavigateHook = Box<dyn Fn() + Send + Sync>;

/// Observable session state. Any number of consumers can subscribe; only the
/// session layer writes it.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<Session>>,
    navigate: Arc<RwLock<Option<NavigateHook>>>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::Loading);
        Self {
            state: Arc::new(tx),
            navigate: Arc::new(RwLock::new(None)),
        }
    }

    /// Current state snapshot.
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Register the hook fired when the session ends and the UI should show
    /// its login view.
    pub fn on_logout_navigate(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.navigate.write() = Some(Box::new(hook));
    }

    pub(crate) fn set_authenticated(&self, user: UserInfo) {
        self.state.send_replace(Session::Authenticated(user));
    }

    pub(crate) fn set_anonymous(&self) {
        self.state.send_replace(Session::Anonymous);
    }

    /// Explicit logout: always lands in `Anonymous` and always requests
    /// navigation to the login view.
    pub(crate) fn logout(&self) {
        self.state.send_replace(Session::Anonymous);
        self.fire_navigate();
    }

    /// Logout forced by an invalidated credential. Navigation fires only on
    /// a real `Authenticated -> Anonymous` transition, so concurrent refresh
    /// failures and bootstrap misses do not re-fire it.
    pub(crate) fn force_logout(&self) {
        let previous = self.state.send_replace(Session::Anonymous);
        if previous.is_authenticated() {
            self.fire_navigate();
        }
    }

    fn fire_navigate(&self) {
        if let Some(hook) = self.navigate.read().as_ref() {
            hook();
        }
    }
}

/// One per application instance: owns the credential store, the refresh
/// coordinator, the transport pipeline and the session state.
pub struct SessionManager {
    store: CredentialStore,
    api: ApiClient,
    session: SessionHandle,
}

impl SessionManager {
    /// Build a manager against the real HTTP backend described by `config`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let backend = Arc::new(ReqwestBackend::new(&config.base_url)?);
        Self::with_backend(config, backend)
    }

    /// Build a manager over an explicit backend (tests use a scripted one).
    pub fn with_backend(
        config: &Config,
        backend: Arc<dyn HttpBackend>,
    ) -> anyhow::Result<Self> {
        let store = CredentialStore::open(&config.token_path)?;
        let session = SessionHandle::new();
        let refresher = RefreshCoordinator::new(store.clone(), backend.clone(), session.clone());
        let api = ApiClient::new(backend, store.clone(), refresher);
        Ok(Self {
            store,
            api,
            session,
        })
    }

    /// Settle the initial `Loading` state by asking the backend who we are.
    /// Any failure, including a failed refresh, lands in `Anonymous`.
    pub async fn bootstrap(&self) {
        if self.store.get(TokenKind::Access).is_none() {
            debug!("no stored access token, starting anonymous");
            self.session.set_anonymous();
            return;
        }
        match self.api.current_user().await {
            Ok(user) => {
                info!(username = %user.username, "restored session");
                self.session.set_authenticated(user);
            }
            Err(err) => {
                debug!(%err, "bootstrap auth check failed");
                self.session.set_anonymous();
            }
        }
    }

    /// Exchange username/password for a token pair and load the principal.
    /// On failure the session state is left untouched and the error carries
    /// a user-facing message (invalid credentials vs network vs other).
    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, ApiError> {
        let tokens = self.api.login(username, password).await?;
        // Persist before fetching the principal, so a failed fetch still
        // leaves a refreshable pair behind.
        if let Err(err) = self.store.set_pair(&tokens.access, &tokens.refresh) {
            warn!(%err, "failed to persist issued tokens");
        }
        let user = self.api.current_user().await?;
        info!(username = %user.username, "login succeeded");
        self.session.set_authenticated(user.clone());
        Ok(user)
    }

    /// End the session. Local logout always succeeds; the backend
    /// notification is best-effort and failures are swallowed.
    pub async fn logout(&self) {
        if let Err(err) = self.store.clear_all() {
            warn!(%err, "failed to clear persisted tokens");
        }
        if let Err(err) = self.api.backend_logout().await {
            warn!(%err, "backend logout failed");
        }
        self.session.logout();
    }

    // ===== Facade accessors =====

    pub fn session(&self) -> Session {
        self.session.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn on_logout_navigate(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.session.on_logout_navigate(hook);
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.session.current().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.current().is_authenticated()
    }

    pub fn is_privileged(&self) -> bool {
        self.current_user()
            .map(|user| user.is_privileged())
            .unwrap_or(false)
    }

    /// True until the initial bootstrap settles.
    pub fn loading(&self) -> bool {
        matches!(self.session.current(), Session::Loading)
    }

    /// Pipeline handle for application resource calls.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
