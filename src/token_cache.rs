#![allow(dead_code)]
//! File-backed token cache.
//!
//! Goals:
//! - Persist the raw vendor token JSON between requests to avoid rate limits.
//! - The file's modification time is the authoritative issuance timestamp;
//!   no separate metadata is written.
//! - A record is reusable only while `expires_in - (now - issued_at)` stays
//!   above a small safety margin; at or below it the record must be
//!   invalidated and refetched.
//!
//! Design notes:
//! - `TokenStore` is the seam: load/store/invalidate over opaque raw bytes.
//!   The file backing is one implementation; anything with a byte payload
//!   and an issuance instant can stand in (tests use a temp directory).
//! - Corrupt content or unreadable metadata counts as stale; the caller
//!   invalidates and refetches rather than failing the request.
//! - Freshness math lives here so every accessor applies the same margin.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

use crate::token::Result;

/// Safety margin in seconds; a token with this much (or less) lifetime
/// remaining is treated as already expired.
pub const EXPIRY_MARGIN_SECS: i64 = 5;

/// Default cache file for the application-level token.
pub const APP_TOKEN_FILE: &str = "access_token.json";

/// Default cache file for the user-level (OAuth) token.
pub const OAUTH_TOKEN_FILE: &str = "oauth_access_token.json";

/// One persisted token: the vendor response verbatim plus when it was stored.
#[derive(Clone, Debug)]
pub struct StoredToken {
    /// Raw vendor JSON as received
    pub raw: Vec<u8>,
    /// Issuance timestamp (file mtime for the file backing)
    pub issued_at: SystemTime,
}

/// Storage seam for cached tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stable identity of this store, used to scope the refresh lock.
    fn key(&self) -> &str;

    /// Load the persisted record, `None` when absent.
    async fn load(&self) -> Result<Option<StoredToken>>;

    /// Persist the raw vendor JSON, overwriting any previous record.
    async fn store(&self, raw: &[u8]) -> Result<()>;

    /// Drop the persisted record; absent is not an error.
    async fn invalidate(&self) -> Result<()>;
}

/// Flat-file store in the process working directory (or any given path).
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path.to_string_lossy().into_owned();
        Self { path, key }
    }

    /// Store under the conventional application token file name.
    pub fn app_default() -> Self {
        Self::new(APP_TOKEN_FILE)
    }

    /// Store under the conventional OAuth token file name.
    pub fn oauth_default() -> Self {
        Self::new(OAUTH_TOKEN_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Option<StoredToken>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let issued_at = tokio::fs::metadata(&self.path).await?.modified()?;
        Ok(Some(StoredToken { raw, issued_at }))
    }

    async fn store(&self, raw: &[u8]) -> Result<()> {
        tokio::fs::write(&self.path, raw).await?;
        debug!(path = %self.key, "token cached");
        Ok(())
    }

    async fn invalidate(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.key, "token cache invalidated");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Remaining lifetime in seconds: `expires_in - (now - issued_at)`.
///
/// An `issued_at` in the future (clock adjustment) counts as zero elapsed.
pub fn remaining_secs(expires_in: u32, issued_at: SystemTime, now: SystemTime) -> i64 {
    let elapsed = now
        .duration_since(issued_at)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    i64::from(expires_in) - elapsed
}

/// Whether a record may still be served from cache.
pub fn is_fresh(expires_in: u32, issued_at: SystemTime, now: SystemTime) -> bool {
    remaining_secs(expires_in, issued_at, now) > EXPIRY_MARGIN_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_store(name: &str) -> (tempfile::TempDir, FileTokenStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join(name));
        (dir, store)
    }

    #[tokio::test]
    async fn load_absent_is_none() {
        let (_dir, store) = temp_store("access_token.json");
        assert!(store.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn store_then_load_returns_raw_and_recent_mtime() {
        let (_dir, store) = temp_store("access_token.json");
        let raw = br#"{"access_token":"T","expires_in":7200}"#;
        store.store(raw).await.expect("store");

        let st = store.load().await.expect("load").expect("present");
        assert_eq!(st.raw, raw);
        let age = SystemTime::now()
            .duration_since(st.issued_at)
            .expect("mtime in the past");
        assert!(age < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn invalidate_removes_file_and_tolerates_absence() {
        let (_dir, store) = temp_store("oauth_access_token.json");
        store.store(b"{}").await.expect("store");
        store.invalidate().await.expect("invalidate");
        assert!(store.load().await.expect("load").is_none());
        // second invalidate hits the NotFound path
        store.invalidate().await.expect("invalidate absent");
    }

    #[test]
    fn freshness_margin_boundary() {
        let now = SystemTime::now();
        let issued = now - Duration::from_secs(100);
        // 106s lifetime leaves 6s remaining: still fresh
        assert!(is_fresh(106, issued, now));
        // 105s lifetime leaves exactly the margin: stale
        assert!(!is_fresh(105, issued, now));
        // long expired
        assert!(!is_fresh(50, issued, now));
    }

    #[test]
    fn future_mtime_counts_as_zero_elapsed() {
        let now = SystemTime::now();
        let issued = now + Duration::from_secs(3600);
        assert_eq!(remaining_secs(7200, issued, now), 7200);
    }
}
