use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::U256;
use async_trait::async_trait;
use eyre::{bail, Result, WrapErr};
use log::{debug, info};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{DexClient, Reserves, TradeReceipt, TradeRequest, WalletCredentials};
use crate::arb::swap::{Direction, Swap};
use crate::arb::types::{PairKey, Pool, Token};
use crate::error::{FetchError, SubmissionError};
use crate::utils::constants::BPS_DENOMINATOR;

/// One pool of a snapshot file. Amounts are decimal strings since they do not
/// fit JSON numbers.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    token_a: String,
    token_b: String,
    reserve_a: String,
    reserve_b: String,
    fee_bps: u16,
}

/// A DEX held entirely in memory.
///
/// Reserves come from a JSON snapshot. Trades are settled against those reserves
/// with the same constant-product math the engine simulates with, so a
/// dry-run-off session is paper trading against a frozen market that only moves
/// with our own trades.
pub struct SnapshotDexClient {
    pools: Mutex<HashMap<PairKey, Reserves>>,
    trades: AtomicU64,
}

impl SnapshotDexClient {
    /// Creates a client serving the given pools
    #[must_use]
    pub fn new(pools: impl IntoIterator<Item = (PairKey, Reserves)>) -> Self {
        Self {
            pools: Mutex::new(pools.into_iter().collect()),
            trades: AtomicU64::new(0),
        }
    }

    /// Loads a snapshot file
    ///
    /// # Errors
    /// Fails if the file cannot be read or is not a valid snapshot
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read pool snapshot {}", path.display()))?;
        let client = Self::from_json(&json)
            .wrap_err_with(|| format!("Invalid pool snapshot {}", path.display()))?;
        info!("snapshot: loaded {} pools from {}", client.pool_count(), path.display());
        Ok(client)
    }

    /// Parses a snapshot document
    ///
    /// # Errors
    /// Fails on malformed JSON, unparsable amounts, invalid fees or duplicated pools
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<SnapshotEntry> = serde_json::from_str(json)?;
        let mut pools = HashMap::with_capacity(entries.len());
        for entry in entries {
            let Some(pair) = PairKey::new(Token::new(&entry.token_a), Token::new(&entry.token_b)) else {
                bail!("Pool {}/{} has identical tokens", entry.token_a, entry.token_b);
            };
            if u64::from(entry.fee_bps) >= BPS_DENOMINATOR {
                bail!("Pool {pair} fee must be below 10000 bps, got {}", entry.fee_bps);
            }
            let reserve_a = parse_amount(&entry.reserve_a).wrap_err_with(|| format!("Pool {pair} reserve_a"))?;
            let reserve_b = parse_amount(&entry.reserve_b).wrap_err_with(|| format!("Pool {pair} reserve_b"))?;
            let (reserve0, reserve1) = if pair.token0.as_str() == entry.token_a {
                (reserve_a, reserve_b)
            } else {
                (reserve_b, reserve_a)
            };
            let reserves = Reserves {
                reserve0,
                reserve1,
                fee_bps: entry.fee_bps,
            };
            if pools.insert(pair.clone(), reserves).is_some() {
                bail!("Pool {pair} appears more than once");
            }
        }
        Ok(Self::new(pools))
    }

    /// Number of pools served. Zero while a trade is settling.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.try_lock().map_or(0, |pools| pools.len())
    }

    /// Number of trades settled so far
    #[must_use]
    pub fn trade_count(&self) -> u64 {
        self.trades.load(Ordering::Relaxed)
    }
}

fn parse_amount(amount: &str) -> Result<U256> {
    U256::from_str(amount.trim()).wrap_err_with(|| format!("Invalid amount {amount:?}"))
}

#[async_trait]
impl DexClient for SnapshotDexClient {
    async fn get_reserves(&self, pair: &PairKey) -> Result<Reserves, FetchError> {
        self.pools
            .lock()
            .await
            .get(pair)
            .copied()
            .ok_or_else(|| FetchError::UnknownPair(pair.clone()))
    }

    async fn submit_trade(
        &self,
        request: &TradeRequest,
        wallet: &WalletCredentials,
    ) -> Result<TradeReceipt, SubmissionError> {
        let mut pools = self.pools.lock().await;
        let reserves = pools
            .get_mut(&request.pair)
            .ok_or_else(|| SubmissionError::Rejected(format!("unknown pool {}", request.pair)))?;

        let pool = Pool::new(request.pair.clone(), reserves.reserve0, reserves.reserve1, reserves.fee_bps);
        let swap = Swap::from_pool(&pool, request.direction);
        let amount_out = swap
            .amount_out(request.amount_in)
            .ok_or_else(|| SubmissionError::Rejected(format!("pool {} is illiquid", request.pair)))?;
        if amount_out < request.min_amount_out {
            return Err(SubmissionError::BelowMinimum {
                received: amount_out,
                minimum: request.min_amount_out,
            });
        }

        // The whole input, fee included, stays in the pool
        let (reserve_in, reserve_out) = match request.direction {
            Direction::ZeroForOne => (&mut reserves.reserve0, &mut reserves.reserve1),
            Direction::OneForZero => (&mut reserves.reserve1, &mut reserves.reserve0),
        };
        *reserve_in = reserve_in.saturating_add(request.amount_in);
        *reserve_out = reserve_out.saturating_sub(amount_out);

        let n = self.trades.fetch_add(1, Ordering::Relaxed) + 1;
        let tx_ref = format!("paper-{n}");
        debug!(
            "snapshot: {tx_ref} for {} sold {} {} for {amount_out} {}",
            wallet.user_address,
            request.amount_in,
            swap.token_in(),
            swap.token_out()
        );
        Ok(TradeReceipt { amount_out, tx_ref })
    }

    fn is_paper(&self) -> bool {
        true
    }
}
