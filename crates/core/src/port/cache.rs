// Provider response cache and the lock guarding its refresh

use crate::error::Result;
use async_trait::async_trait;

/// Cached provider payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub fetched_at: i64, // epoch ms
}

#[async_trait]
pub trait ProviderCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or replace the entry for `key`
    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<()>;

    /// Drop entries fetched before `cutoff`. Returns how many were removed.
    async fn purge_older_than(&self, cutoff: i64) -> Result<u64>;
}

/// Lock shared by every worker process using the same database.
///
/// A lock expires on its own after its TTL so a crashed holder cannot
/// block the refresh forever.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Take `name` for `owner` until `now + ttl_ms`. False if held by someone else.
    async fn try_acquire(&self, name: &str, owner: &str, ttl_ms: i64, now_millis: i64)
        -> Result<bool>;

    /// Release `name` if `owner` still holds it
    async fn release(&self, name: &str, owner: &str) -> Result<bool>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryCache {
        entries: Mutex<HashMap<String, CacheEntry>>,
    }

    impl InMemoryCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl ProviderCache for InMemoryCache {
        async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), entry.clone());
            Ok(())
        }

        async fn purge_older_than(&self, cutoff: i64) -> Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|_, e| e.fetched_at >= cutoff);
            Ok((before - entries.len()) as u64)
        }
    }

    #[derive(Default)]
    pub struct InMemoryLock {
        held: Mutex<HashMap<String, (String, i64)>>,
    }

    impl InMemoryLock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pretend another worker holds `name` until `expires_at`
        pub fn hold(&self, name: &str, owner: &str, expires_at: i64) {
            self.held
                .lock()
                .unwrap()
                .insert(name.to_string(), (owner.to_string(), expires_at));
        }
    }

    #[async_trait]
    impl DistributedLock for InMemoryLock {
        async fn try_acquire(
            &self,
            name: &str,
            owner: &str,
            ttl_ms: i64,
            now_millis: i64,
        ) -> Result<bool> {
            let mut held = self.held.lock().unwrap();
            match held.get(name) {
                Some((_, expires_at)) if *expires_at > now_millis => Ok(false),
                _ => {
                    held.insert(name.to_string(), (owner.to_string(), now_millis + ttl_ms));
                    Ok(true)
                }
            }
        }

        async fn release(&self, name: &str, owner: &str) -> Result<bool> {
            let mut held = self.held.lock().unwrap();
            match held.get(name) {
                Some((holder, _)) if holder == owner => {
                    held.remove(name);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }
}
