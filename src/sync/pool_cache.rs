use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Instant};

use crate::arb::types::{PairKey, Pool};
use crate::dex::DexClient;
use crate::error::FetchError;
use crate::utils::constants::BPS_DENOMINATOR;

/// Tuning of the pool cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCacheSettings {
    /// How long a refresh is served before the next one reaches the DEX, and how
    /// old a pool may get before it stops being active
    pub ttl: Duration,
    /// Both reserves must be strictly above this for a pool to be active
    pub min_liquidity: U256,
    /// Maximum number of concurrent reserve requests
    pub concurrency: usize,
    /// Bound on each reserve request
    pub request_timeout: Duration,
}

/// An immutable view of every known pool.
///
/// A refresh builds a new snapshot and swaps it in whole, so readers holding an
/// `Arc<PoolSnapshot>` never see a half-updated cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pools: BTreeMap<PairKey, Pool>,
    refreshed_at: Option<Instant>,
}

impl PoolSnapshot {
    /// Every known pool, including stale and illiquid ones, ordered by pair
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Last known state of one pool
    #[must_use]
    pub fn get(&self, pair: &PairKey) -> Option<&Pool> {
        self.pools.get(pair)
    }

    /// When the last successful refresh happened, `None` before the first one
    #[must_use]
    pub const fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    /// Number of known pools
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pool is known yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Result of a successful [`PoolCache::refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache is younger than its TTL, nothing was fetched
    Skipped,
    /// Pools were fetched. Failed pools keep their previous state.
    Refreshed {
        /// Pools read successfully
        fetched: usize,
        /// Pools that could not be read
        failed: usize,
    },
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Refreshed { fetched, failed } => write!(f, "{fetched} fetched, {failed} failed"),
        }
    }
}

/// Reserves of the configured pools, refreshed from the DEX at most once per TTL.
pub struct PoolCache {
    client: Arc<dyn DexClient>,
    pairs: Vec<PairKey>,
    settings: PoolCacheSettings,
    snapshot: RwLock<Arc<PoolSnapshot>>,
    refreshing: Mutex<()>,
}

impl PoolCache {
    /// Creates an empty cache tracking `pairs`
    pub fn new(client: Arc<dyn DexClient>, pairs: impl IntoIterator<Item = PairKey>, settings: PoolCacheSettings) -> Self {
        let mut pairs: Vec<PairKey> = pairs.into_iter().collect();
        pairs.sort();
        pairs.dedup();
        Self {
            client,
            pairs,
            settings,
            snapshot: RwLock::new(Arc::new(PoolSnapshot::default())),
            refreshing: Mutex::new(()),
        }
    }

    /// The tracked pairs
    #[must_use]
    pub fn pairs(&self) -> &[PairKey] {
        &self.pairs
    }

    /// The current snapshot
    pub async fn snapshot(&self) -> Arc<PoolSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Pools that are both liquid and no older than the TTL, ordered by pair
    pub async fn get_active_pools(&self) -> Vec<Pool> {
        let snapshot = self.snapshot().await;
        let now = Instant::now();
        snapshot
            .pools()
            .filter(|pool| pool.is_liquid(self.settings.min_liquidity))
            .filter(|pool| pool.is_fresh(now, self.settings.ttl))
            .cloned()
            .collect()
    }

    /// Reads every tracked pool from the DEX, unless the cache is younger than
    /// its TTL and `force` is false.
    ///
    /// Pools that cannot be read keep their previous state and age out on their
    /// own. Concurrent calls are serialized, so a caller that waited on another
    /// refresh usually gets [`RefreshOutcome::Skipped`].
    ///
    /// # Errors
    /// [`FetchError::Unavailable`] when not a single pool could be read. The
    /// previous snapshot is kept and the next call tries again.
    pub async fn refresh(&self, force: bool) -> Result<RefreshOutcome, FetchError> {
        let _guard = self.refreshing.lock().await;
        let current = self.snapshot().await;

        if !force {
            if let Some(refreshed_at) = current.refreshed_at {
                let age = Instant::now().saturating_duration_since(refreshed_at);
                if age < self.settings.ttl {
                    log::debug!("sync::pool_cache: cache is {}s old, skipping refresh", age.as_secs());
                    return Ok(RefreshOutcome::Skipped);
                }
            }
        }

        let results: Vec<(PairKey, Result<Pool, FetchError>)> = stream::iter(self.pairs.iter().cloned())
            .map(|pair| async move {
                let result = self.fetch(&pair).await;
                (pair, result)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut pools = current.pools.clone();
        let mut failed = 0;
        for (pair, result) in results {
            match result {
                Ok(pool) => {
                    pools.insert(pair, pool);
                }
                Err(e) => {
                    failed += 1;
                    log::warn!("sync::pool_cache: keeping previous state of {pair}: {e}");
                }
            }
        }
        let fetched = self.pairs.len() - failed;
        if fetched == 0 && !self.pairs.is_empty() {
            log::error!("sync::pool_cache: none of the {} pools could be read", self.pairs.len());
            return Err(FetchError::Unavailable {
                attempted: self.pairs.len(),
            });
        }

        let snapshot = Arc::new(PoolSnapshot {
            pools,
            refreshed_at: Some(Instant::now()),
        });
        let now = Instant::now();
        let active = snapshot
            .pools()
            .filter(|pool| pool.is_liquid(self.settings.min_liquidity) && pool.is_fresh(now, self.settings.ttl))
            .count();
        *self.snapshot.write().await = snapshot;

        log::info!("sync::pool_cache: refreshed {fetched}/{} pools, {active} active", self.pairs.len());
        Ok(RefreshOutcome::Refreshed { fetched, failed })
    }

    async fn fetch(&self, pair: &PairKey) -> Result<Pool, FetchError> {
        let reserves = timeout(self.settings.request_timeout, self.client.get_reserves(pair))
            .await
            .map_err(|_| FetchError::Timeout(pair.clone()))??;
        if u64::from(reserves.fee_bps) >= BPS_DENOMINATOR {
            return Err(FetchError::InvalidFee {
                pair: pair.clone(),
                fee_bps: reserves.fee_bps,
            });
        }
        Ok(Pool::new(pair.clone(), reserves.reserve0, reserves.reserve1, reserves.fee_bps))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;
    use crate::dex::mock::MockDexClient;
    use crate::dex::Reserves;

    const TTL: Duration = Duration::from_secs(150);

    fn settings(min_liquidity: u64) -> PoolCacheSettings {
        PoolCacheSettings {
            ttl: TTL,
            min_liquidity: U256::from(min_liquidity),
            concurrency: 2,
            request_timeout: Duration::from_secs(15),
        }
    }

    fn scenario() -> Arc<MockDexClient> {
        Arc::new(MockDexClient::with_pools(&[
            ("GUSDC", "GALA", 100_000, 50_000, 30),
            ("GALA", "GWETH", 50_000, 200, 30),
            ("GWETH", "GUSDC", 200, 100_500, 30),
        ]))
    }

    fn cache(client: &Arc<MockDexClient>, min_liquidity: u64) -> PoolCache {
        let pairs = vec![pair("GUSDC", "GALA"), pair("GALA", "GWETH"), pair("GWETH", "GUSDC")];
        PoolCache::new(client.clone(), pairs, settings(min_liquidity))
    }

    fn active_pairs(pools: &[Pool]) -> Vec<String> {
        pools.iter().map(|pool| pool.pair.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_within_ttl_is_idempotent() {
        let client = scenario();
        let cache = cache(&client, 0);

        let outcome = cache.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 3, failed: 0 });
        assert_eq!(client.fetch_count(), 3);
        let first = cache.snapshot().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.refresh(false).await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(client.fetch_count(), 3);
        let second = cache.snapshot().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_ttl_or_forced() {
        let client = scenario();
        let cache = cache(&client, 0);

        cache.refresh(false).await.unwrap();
        cache.refresh(true).await.unwrap();
        assert_eq!(client.fetch_count(), 6);

        tokio::time::advance(TTL).await;
        cache.refresh(false).await.unwrap();
        assert_eq!(client.fetch_count(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_pools_sorted_by_pair() {
        let client = scenario();
        let cache = cache(&client, 0);
        assert!(cache.get_active_pools().await.is_empty());

        cache.refresh(false).await.unwrap();
        let active = cache.get_active_pools().await;
        assert_eq!(active_pairs(&active), vec!["GALA/GUSDC", "GALA/GWETH", "GUSDC/GWETH"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_illiquid_pools_are_not_active() {
        let client = scenario();

        for (min_liquidity, expected) in &[
            (0, vec!["GALA/GUSDC", "GALA/GWETH", "GUSDC/GWETH"]),
            (199, vec!["GALA/GUSDC", "GALA/GWETH", "GUSDC/GWETH"]),
            // strictly above the threshold
            (200, vec!["GALA/GUSDC"]),
            (50_000, vec![]),
        ] {
            let cache = cache(&client, *min_liquidity);
            cache.refresh(false).await.unwrap();
            assert_eq!(active_pairs(&cache.get_active_pools().await), *expected, "min {min_liquidity}");
            // illiquid pools are still known
            assert_eq!(cache.snapshot().await.len(), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_keeps_previous_state() {
        let client = scenario();
        let cache = cache(&client, 0);
        cache.refresh(false).await.unwrap();
        let before = cache.snapshot().await.get(&pair("GALA", "GWETH")).cloned().unwrap();

        client.fail_fetch(pair("GALA", "GWETH"));
        tokio::time::advance(Duration::from_secs(60)).await;
        let outcome = cache.refresh(true).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 2, failed: 1 });

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.get(&pair("GALA", "GWETH")), Some(&before));
        assert_eq!(snapshot.refreshed_at(), Some(Instant::now()));
        // still within its own TTL
        assert_eq!(cache.get_active_pools().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pool_excluded_after_ttl() {
        let client = scenario();
        let cache = cache(&client, 0);
        cache.refresh(false).await.unwrap();

        client.fail_fetch(pair("GALA", "GWETH"));
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(60)).await;
            cache.refresh(false).await.unwrap();
        }

        let active = cache.get_active_pools().await;
        assert_eq!(active_pairs(&active), vec!["GALA/GUSDC", "GUSDC/GWETH"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_counts_as_failure() {
        let client = scenario();
        client.hang_fetch(pair("GUSDC", "GWETH"));
        let cache = cache(&client, 0);

        let outcome = cache.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 2, failed: 1 });
        assert!(cache.snapshot().await.get(&pair("GUSDC", "GWETH")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_fetches_failing_is_an_error() {
        let client = scenario();
        let cache = cache(&client, 0);
        cache.refresh(false).await.unwrap();
        let before = cache.snapshot().await;

        for pair in cache.pairs().to_vec() {
            client.fail_fetch(pair);
        }
        let err = cache.refresh(true).await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable { attempted: 3 });
        assert!(Arc::ptr_eq(&before, &cache.snapshot().await));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_pair_is_a_failure() {
        let client = scenario();
        let pairs = vec![pair("GUSDC", "GALA"), pair("GUSDT", "GALA")];
        let cache = PoolCache::new(client.clone(), pairs, settings(0));

        let outcome = cache.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 1, failed: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_concurrency_is_bounded() {
        let pairs: Vec<PairKey> = (0..10).map(|i| pair(&format!("TKN{i}"), "GALA")).collect();
        let reserves = Reserves {
            reserve0: U256::from(1_000_000),
            reserve1: U256::from(1_000_000),
            fee_bps: 30,
        };
        let client = Arc::new(
            MockDexClient::new(pairs.iter().map(|pair| (pair.clone(), reserves)))
                .slow_fetch(Duration::from_millis(10)),
        );
        let settings = PoolCacheSettings {
            concurrency: 3,
            ..settings(0)
        };
        let cache = PoolCache::new(client.clone(), pairs, settings);

        let outcome = cache.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 10, failed: 0 });
        assert_eq!(client.fetch_count(), 10);
        assert_eq!(client.peak_fetches_in_flight(), 3);
        assert_eq!(cache.get_active_pools().await.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_fee_is_a_failure() {
        let client = Arc::new(MockDexClient::with_pools(&[
            ("GUSDC", "GALA", 100_000, 50_000, 30),
            ("GALA", "GWETH", 50_000, 200, 10_000),
            ("GWETH", "GUSDC", 200, 100_500, 30),
        ]));
        let cache = cache(&client, 0);

        let outcome = cache.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { fetched: 2, failed: 1 });
        assert!(cache.snapshot().await.get(&pair("GALA", "GWETH")).is_none());

        let err = cache.fetch(&pair("GALA", "GWETH")).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::InvalidFee {
                pair: pair("GALA", "GWETH"),
                fee_bps: 10_000,
            }
        );
    }
}
