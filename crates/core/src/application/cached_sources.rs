// Read-through provider cache with a lock-guarded refresh

use crate::application::worker::constants::{DEFAULT_CACHE_LOCK_TTL_MS, DEFAULT_CACHE_TTL_MS};
use crate::domain::Imo;
use crate::error::AppError;
use crate::port::{
    CacheEntry, DistributedLock, IdProvider, Inspection, InspectionsSource, MovementsSource,
    PortCall, ProviderCache, ProviderError, SanctionHit, SanctionsSource, TimeProvider, ZoneVisit,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Freshness settings of the provider cache
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// Entries younger than this are served without calling the provider
    pub ttl_ms: i64,
    /// Expiry of the refresh lock, in case the holder dies
    pub lock_ttl_ms: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            lock_ttl_ms: DEFAULT_CACHE_LOCK_TTL_MS,
        }
    }
}

/// Wraps the provider ports with a shared cache.
///
/// A stale or missing entry is refreshed by whoever takes the refresh lock
/// for its key. Everyone else gets `RefreshInProgress` and retries later,
/// so the upstream API sees one call per key per refresh window.
pub struct CachedSources {
    sanctions: Arc<dyn SanctionsSource>,
    inspections: Arc<dyn InspectionsSource>,
    movements: Arc<dyn MovementsSource>,
    cache: Arc<dyn ProviderCache>,
    lock: Arc<dyn DistributedLock>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    settings: CacheSettings,
}

impl CachedSources {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sanctions: Arc<dyn SanctionsSource>,
        inspections: Arc<dyn InspectionsSource>,
        movements: Arc<dyn MovementsSource>,
        cache: Arc<dyn ProviderCache>,
        lock: Arc<dyn DistributedLock>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            sanctions,
            inspections,
            movements,
            cache,
            lock,
            id_provider,
            time_provider,
            settings,
        }
    }

    /// Entry for `key` if it is younger than the TTL and still decodes
    async fn fresh<T>(&self, key: &str, now: i64) -> Result<Option<T>, ProviderError>
    where
        T: DeserializeOwned,
    {
        let Some(entry) = self.cache.get(key).await.map_err(storage_error)? else {
            return Ok(None);
        };
        if now - entry.fetched_at >= self.settings.ttl_ms {
            return Ok(None);
        }
        match serde_json::from_value(entry.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    async fn cached<T, F, Fut>(&self, key: String, fetch: F) -> Result<T, ProviderError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, ProviderError>> + Send,
    {
        let now = self.time_provider.now_millis();

        if let Some(value) = self.fresh(&key, now).await? {
            debug!(key = %key, "Provider cache hit");
            return Ok(value);
        }

        let lock_name = format!("refresh:{}", key);
        let owner = self.id_provider.generate_id();
        let acquired = self
            .lock
            .try_acquire(&lock_name, &owner, self.settings.lock_ttl_ms, now)
            .await
            .map_err(storage_error)?;
        if !acquired {
            debug!(key = %key, "Refresh held by another worker");
            return Err(ProviderError::RefreshInProgress(key));
        }

        // The previous holder may have stored a response after our first read
        let refreshed = match self.fresh(&key, now).await {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        };
        if let Some(result) = refreshed {
            debug!(key = %key, "Refreshed by another worker meanwhile");
            if let Err(e) = self.lock.release(&lock_name, &owner).await {
                warn!(key = %key, error = %e, "Failed to release refresh lock");
            }
            return result;
        }

        let result = fetch().await;

        if let Ok(value) = &result {
            match serde_json::to_value(value) {
                Ok(payload) => {
                    let entry = CacheEntry {
                        payload,
                        fetched_at: self.time_provider.now_millis(),
                    };
                    if let Err(e) = self.cache.put(&key, &entry).await {
                        warn!(key = %key, error = %e, "Failed to store provider response");
                    }
                }
                Err(e) => warn!(key = %key, error = %e, "Provider response not cacheable"),
            }
        }

        if let Err(e) = self.lock.release(&lock_name, &owner).await {
            warn!(key = %key, error = %e, "Failed to release refresh lock");
        }

        result
    }
}

fn storage_error(err: AppError) -> ProviderError {
    ProviderError::Unavailable(format!("provider cache: {}", err))
}

#[async_trait]
impl SanctionsSource for CachedSources {
    async fn ship_sanctions(&self, imo: &Imo) -> Result<Vec<SanctionHit>, ProviderError> {
        self.cached(format!("sanctions:ship:{}", imo), || {
            self.sanctions.ship_sanctions(imo)
        })
        .await
    }

    async fn company_sanctions(&self, name: &str) -> Result<Vec<SanctionHit>, ProviderError> {
        let key = format!("sanctions:company:{}", name.trim().to_lowercase());
        self.cached(key, || self.sanctions.company_sanctions(name))
            .await
    }
}

#[async_trait]
impl InspectionsSource for CachedSources {
    async fn inspections(&self, imo: &Imo, since: i64) -> Result<Vec<Inspection>, ProviderError> {
        self.cached(format!("inspections:{}", imo), || {
            self.inspections.inspections(imo, since)
        })
        .await
    }
}

#[async_trait]
impl MovementsSource for CachedSources {
    async fn port_calls(&self, imo: &Imo, since: i64) -> Result<Vec<PortCall>, ProviderError> {
        self.cached(format!("movements:port-calls:{}", imo), || {
            self.movements.port_calls(imo, since)
        })
        .await
    }

    async fn zone_visits(&self, imo: &Imo, since: i64) -> Result<Vec<ZoneVisit>, ProviderError> {
        self.cached(format!("movements:zone-visits:{}", imo), || {
            self.movements.zone_visits(imo, since)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::cache::mocks::{InMemoryCache, InMemoryLock};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::sources::mocks::StaticSources;
    use crate::port::time_provider::mocks::ManualClock;

    struct Fixture {
        sources: Arc<StaticSources>,
        cache: Arc<InMemoryCache>,
        lock: Arc<InMemoryLock>,
        clock: Arc<ManualClock>,
        cached: CachedSources,
    }

    fn fixture() -> Fixture {
        let sources = Arc::new(StaticSources::new());
        let cache = Arc::new(InMemoryCache::new());
        let lock = Arc::new(InMemoryLock::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cached = CachedSources::new(
            sources.clone(),
            sources.clone(),
            sources.clone(),
            cache.clone(),
            lock.clone(),
            Arc::new(SequentialIdProvider::new("owner")),
            clock.clone(),
            CacheSettings {
                ttl_ms: 60_000,
                lock_ttl_ms: 5_000,
            },
        );
        Fixture {
            sources,
            cache,
            lock,
            clock,
            cached,
        }
    }

    fn imo() -> Imo {
        Imo::parse("9074729").unwrap()
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_is_served_from_cache() {
        let f = fixture();
        f.sources.sanction_ship(&imo(), "EU");

        let first = f.cached.ship_sanctions(&imo()).await.unwrap();
        let second = f.cached.ship_sanctions(&imo()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(f.sources.call_count(), 1);
        assert_eq!(f.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed() {
        let f = fixture();
        f.cached.inspections(&imo(), 0).await.unwrap();

        f.clock.advance(60_000);
        f.cached.inspections(&imo(), 0).await.unwrap();

        assert_eq!(f.sources.call_count(), 2);
    }

    #[tokio::test]
    async fn test_held_lock_reports_refresh_in_progress() {
        let f = fixture();
        f.lock
            .hold("refresh:movements:port-calls:9074729", "other-worker", 1_004_000);

        let err = f.cached.port_calls(&imo(), 0).await.unwrap_err();

        assert!(matches!(err, ProviderError::RefreshInProgress(_)));
        assert!(err.is_retryable());
        assert_eq!(f.sources.call_count(), 0);

        // Lock expires on its own
        f.clock.advance(5_000);
        assert!(f.cached.port_calls(&imo(), 0).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_and_releases_lock() {
        let f = fixture();
        f.sources.set_failure(Some(ProviderError::RateLimited));
        assert_eq!(
            f.cached.zone_visits(&imo(), 0).await.unwrap_err(),
            ProviderError::RateLimited
        );
        assert!(f.cache.is_empty());

        f.sources.set_failure(None);
        assert!(f.cached.zone_visits(&imo(), 0).await.is_ok());
        assert_eq!(f.sources.call_count(), 2);
    }

    /// Stores a fresh response right before granting the lock, like a
    /// worker that finished its refresh between our cache read and acquire
    struct LateWriterLock {
        inner: InMemoryLock,
        cache: Arc<InMemoryCache>,
        fetched_at: i64,
    }

    #[async_trait]
    impl DistributedLock for LateWriterLock {
        async fn try_acquire(
            &self,
            name: &str,
            owner: &str,
            ttl_ms: i64,
            now_millis: i64,
        ) -> crate::error::Result<bool> {
            let entry = CacheEntry {
                payload: serde_json::json!([]),
                fetched_at: self.fetched_at,
            };
            self.cache.put("inspections:9074729", &entry).await?;
            self.inner.try_acquire(name, owner, ttl_ms, now_millis).await
        }

        async fn release(&self, name: &str, owner: &str) -> crate::error::Result<bool> {
            self.inner.release(name, owner).await
        }
    }

    #[tokio::test]
    async fn test_entry_stored_while_acquiring_is_reused() {
        let sources = Arc::new(StaticSources::new());
        let cache = Arc::new(InMemoryCache::new());
        let lock = Arc::new(LateWriterLock {
            inner: InMemoryLock::new(),
            cache: cache.clone(),
            fetched_at: 1_000_000,
        });
        let cached = CachedSources::new(
            sources.clone(),
            sources.clone(),
            sources.clone(),
            cache.clone(),
            lock.clone(),
            Arc::new(SequentialIdProvider::new("owner")),
            Arc::new(ManualClock::new(1_000_000)),
            CacheSettings {
                ttl_ms: 60_000,
                lock_ttl_ms: 5_000,
            },
        );

        assert!(cached.inspections(&imo(), 0).await.unwrap().is_empty());
        assert_eq!(sources.call_count(), 0);

        // The lock was handed back, so the next refresh is not blocked
        assert!(lock
            .inner
            .try_acquire("refresh:inspections:9074729", "someone", 5_000, 1_000_000)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_company_key_ignores_case() {
        let f = fixture();
        f.sources.sanction_company("Blue Ocean Ltd", "UN");

        f.cached.company_sanctions("Blue Ocean Ltd").await.unwrap();
        let hits = f.cached.company_sanctions("BLUE OCEAN LTD ").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(f.sources.call_count(), 1);
    }
}
