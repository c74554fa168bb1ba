/// Pool cache
///
/// Keeps the reserves of the configured pools, refreshed from the DEX at most
/// once per TTL.
pub mod pool_cache;

pub use pool_cache::{PoolCache, PoolCacheSettings, PoolSnapshot, RefreshOutcome};
