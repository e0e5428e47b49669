//! Durable storage for the access/refresh token pair.
//!
//! Tokens are opaque server-issued strings persisted as JSON so a session
//! survives application restarts. An in-memory copy backs the synchronous
//! accessors; every mutation writes through to disk under the lock, which
//! orders writes relative to reads.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Named token slots persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoredTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

/// Cheap to clone - all handles share one persisted record.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl CredentialStore {
    /// Open a store backed by the given file, loading any persisted tokens.
    /// A missing or corrupt file starts the store empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(tokens) => tokens,
                Err(err) => {
                    warn!(%err, path = %path.display(), "ignoring corrupt token file");
                    StoredTokens::default()
                }
            },
            Err(_) => StoredTokens::default(),
        };
        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                tokens: RwLock::new(tokens),
            }),
        })
    }

    pub fn get(&self, kind: TokenKind) -> Option<String> {
        let tokens = self.inner.tokens.read();
        match kind {
            TokenKind::Access => tokens.access_token.clone(),
            TokenKind::Refresh => tokens.refresh_token.clone(),
        }
    }

    pub fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let mut tokens = self.inner.tokens.write();
        match kind {
            TokenKind::Access => tokens.access_token = Some(value.to_string()),
            TokenKind::Refresh => tokens.refresh_token = Some(value.to_string()),
        }
        tokens.saved_at = Some(Utc::now());
        self.persist(&tokens)
    }

    /// Store both halves of a freshly issued credential pair.
    pub fn set_pair(&self, access: &str, refresh: &str) -> Result<()> {
        let mut tokens = self.inner.tokens.write();
        tokens.access_token = Some(access.to_string());
        tokens.refresh_token = Some(refresh.to_string());
        tokens.saved_at = Some(Utc::now());
        self.persist(&tokens)
    }

    pub fn clear(&self, kind: TokenKind) -> Result<()> {
        let mut tokens = self.inner.tokens.write();
        match kind {
            TokenKind::Access => tokens.access_token = None,
            TokenKind::Refresh => tokens.refresh_token = None,
        }
        self.persist(&tokens)
    }

    /// Drop both tokens and remove the file from disk.
    pub fn clear_all(&self) -> Result<()> {
        let mut tokens = self.inner.tokens.write();
        *tokens = StoredTokens::default();
        if self.inner.path.exists() {
            std::fs::remove_file(&self.inner.path).context("Failed to remove token file")?;
        }
        Ok(())
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.inner.path, contents).context("Failed to write token file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::open(dir.path().join("tokens.json")).expect("open store")
    }

    #[test]
    fn test_set_get_clear_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_in(&dir);
        assert_eq!(store.get(TokenKind::Access), None);

        store.set(TokenKind::Access, "A1").expect("set access");
        store.set(TokenKind::Refresh, "R1").expect("set refresh");
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("A1"));
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("R1"));

        store.clear(TokenKind::Access).expect("clear access");
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("R1"));
    }

    #[test]
    fn test_tokens_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        open_in(&dir).set_pair("A1", "R1").expect("set pair");

        let reopened = open_in(&dir);
        assert_eq!(reopened.get(TokenKind::Access).as_deref(), Some("A1"));
        assert_eq!(reopened.get(TokenKind::Refresh).as_deref(), Some("R1"));
    }

    #[test]
    fn test_clear_all_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_in(&dir);
        store.set_pair("A1", "R1").expect("set pair");
        assert!(dir.path().join("tokens.json").exists());

        store.clear_all().expect("clear all");
        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);
        assert!(!dir.path().join("tokens.json").exists());

        // Clearing an already-empty store is fine
        store.clear_all().expect("clear all again");
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("tokens.json"), "{not json").expect("write");
        let store = open_in(&dir);
        assert_eq!(store.get(TokenKind::Access), None);
    }
}
