//! Time-windowed guard against the same file being submitted twice.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait DedupCache: Send + Sync {
    /// Returns `true` when `key` was recorded within the window. Otherwise
    /// records it and returns `false`.
    async fn check_and_record(&self, key: &str) -> bool;
}

/// Process-local cache. Expired keys are swept on every check.
pub struct InMemoryDedupCache {
    window: Duration,
    seen: RwLock<HashMap<String, Instant>>,
}

impl InMemoryDedupCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.seen.read().await.len()
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut seen = self.seen.write().await;
        seen.retain(|_, recorded| now.saturating_duration_since(*recorded) < self.window);

        if seen.contains_key(key) {
            return true;
        }
        seen.insert(key.to_string(), now);
        false
    }
}

#[async_trait]
impl DedupCache for InMemoryDedupCache {
    async fn check_and_record(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }
}

/// Key identifying a submission: case, original filename and size.
pub fn dedup_key(case_id: &uuid::Uuid, original_name: &str, size: usize) -> String {
    format!("{}:{}:{}", case_id, original_name, size)
}
