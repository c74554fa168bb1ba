#![allow(clippy::unwrap_used)]
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{DexClient, Reserves, SnapshotDexClient, TradeReceipt, TradeRequest, WalletCredentials};
use crate::arb::types::PairKey;
use crate::error::{FetchError, SubmissionError};

/// Scripted client for tests. Settles trades like [`SnapshotDexClient`] and
/// records every call.
pub struct MockDexClient {
    inner: SnapshotDexClient,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fetch_delay: Option<Duration>,
    failing: Mutex<HashSet<PairKey>>,
    hanging: Mutex<HashSet<PairKey>>,
    submissions: Mutex<Vec<TradeRequest>>,
    fail_submission: Option<usize>,
    hang_submission: Option<usize>,
}

#[allow(dead_code)]
impl MockDexClient {
    pub fn new(pools: impl IntoIterator<Item = (PairKey, Reserves)>) -> Self {
        Self {
            inner: SnapshotDexClient::new(pools),
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            fetch_delay: None,
            failing: Mutex::default(),
            hanging: Mutex::default(),
            submissions: Mutex::default(),
            fail_submission: None,
            hang_submission: None,
        }
    }

    /// `(token_a, token_b, reserve_a, reserve_b, fee_bps)` pools
    pub fn with_pools(pools: &[(&str, &str, u64, u64, u16)]) -> Self {
        Self::new(pools.iter().map(|(a, b, reserve_a, reserve_b, fee_bps)| {
            let pool = crate::arb::test_helpers::pool(a, b, *reserve_a, *reserve_b, *fee_bps);
            let reserves = Reserves {
                reserve0: pool.reserve0,
                reserve1: pool.reserve1,
                fee_bps: pool.fee_bps,
            };
            (pool.pair, reserves)
        }))
    }

    /// Every reserve read takes `delay` to answer
    pub fn slow_fetch(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Rejects the n-th submission, 1-based
    pub fn failing_submission(mut self, n: usize) -> Self {
        self.fail_submission = Some(n);
        self
    }

    /// Never answers the n-th submission, 1-based
    pub fn hanging_submission(mut self, n: usize) -> Self {
        self.hang_submission = Some(n);
        self
    }

    pub fn fail_fetch(&self, pair: PairKey) {
        self.failing.lock().unwrap().insert(pair);
    }

    pub fn hang_fetch(&self, pair: PairKey) {
        self.hanging.lock().unwrap().insert(pair);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Most reserve reads ever outstanding at once
    pub fn peak_fetches_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<TradeRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

impl MockDexClient {
    /// Scripted answer to a reserve read
    async fn read_reserves(&self, pair: &PairKey) -> Result<Reserves, FetchError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let hangs = self.hanging.lock().unwrap().contains(pair);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        let fails = self.failing.lock().unwrap().contains(pair);
        if fails {
            return Err(FetchError::Rejected {
                pair: pair.clone(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.get_reserves(pair).await
    }
}

#[async_trait]
impl DexClient for MockDexClient {
    async fn get_reserves(&self, pair: &PairKey) -> Result<Reserves, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let result = self.read_reserves(pair).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn submit_trade(
        &self,
        request: &TradeRequest,
        wallet: &WalletCredentials,
    ) -> Result<TradeReceipt, SubmissionError> {
        let n = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(request.clone());
            submissions.len()
        };
        if self.hang_submission == Some(n) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.fail_submission == Some(n) {
            return Err(SubmissionError::Rejected("insufficient gas".to_string()));
        }
        self.inner.submit_trade(request, wallet).await
    }
}
