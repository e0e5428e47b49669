//! Wire and domain types shared by the API and session layers.
//!
//! Field names follow the backend JSON exactly (`is_staff`, `access`, ...),
//! so no serde renames are needed.

use serde::{Deserialize, Serialize};

/// Identity record reported by `GET /auth/user/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl UserInfo {
    /// Role flags are server-derived and read-only on the client; either one
    /// makes the user privileged.
    pub fn is_privileged(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Credential pair issued by `POST /token/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of a successful `POST /token/refresh/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}
