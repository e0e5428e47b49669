//! Session lifecycle: credential persistence, coordinated refresh and the
//! reactive authentication state.
//!
//! This module provides:
//! - `CredentialStore`: durable storage for the access/refresh token pair
//! - `RefreshCoordinator`: single-flight exchange of refresh for access
//! - `SessionManager`: the facade the application constructs once

pub mod refresh;
pub mod session;
pub mod store;

pub use refresh::RefreshCoordinator;
pub use session::{Session, SessionHandle, SessionManager};
pub use store::{CredentialStore, TokenKind};
