//! Registry of revoked session tokens

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Revoked-but-not-yet-expired tokens, keyed by the raw token string
///
/// Cloning is cheap and every clone shares the same entries. One lock guards
/// all of them and is only held for the in-memory operation itself.
#[derive(Debug, Clone, Default)]
pub struct RevocationRegistry {
    /// Token string -> its natural expiry
    entries: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a revoked token; revoking twice is a no-op
    pub async fn add(&self, token: &str, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.entry(token.to_string()).or_insert(expires_at);
    }

    pub async fn contains(&self, token: &str) -> bool {
        let entries = self.entries.lock().await;
        entries.contains_key(token)
    }

    /// Drop every entry whose token can no longer pass the expiry check anyway
    ///
    /// Returns how many entries were removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = before - entries.len();

        if removed > 0 {
            info!("Evicted {} expired revocation entries", removed);
        } else {
            debug!("No expired revocation entries to evict");
        }

        removed
    }

    pub async fn size(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Forget every entry; only meant for tests
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
