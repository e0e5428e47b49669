//! sessiongate - client-side session and authentication manager.
//!
//! The crate owns a short-lived access token and a longer-lived refresh
//! token, renews the access token at most once per failed request through a
//! single-flight refresh, and exposes a reactive anonymous / loading /
//! authenticated state for a UI layer to consume.
//!
//! Construct one [`SessionManager`] per application instance:
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use sessiongate::{Config, SessionManager};
//!
//! let manager = SessionManager::new(&Config::from_env()?)?;
//! manager.bootstrap().await;
//! let user = manager.login("alice", "p@ss").await?;
//! assert_eq!(user.username, "alice");
//! # Ok(()) }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiClient, ApiError, RefreshError};
pub use auth::{CredentialStore, RefreshCoordinator, Session, SessionHandle, SessionManager, TokenKind};
pub use config::Config;
pub use models::{TokenPair, UserInfo};
