//! # DEX Module
//!
//! The seam between the engine and the exchange. The engine only ever reads
//! reserves and submits single-pool trades, so that is all a client provides.

use std::fmt;

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::arb::swap::Direction;
use crate::arb::types::PairKey;
use crate::error::{FetchError, SubmissionError};

/// In-memory paper-trading client backed by a JSON snapshot
pub mod snapshot;
/// Scripted client for tests
#[cfg(test)]
pub(crate) mod mock;

pub use snapshot::SnapshotDexClient;

/// Pool state as reported by the DEX, in `pair` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    /// Reserve of `pair.token0`
    pub reserve0: U256,
    /// Reserve of `pair.token1`
    pub reserve1: U256,
    /// Pool fee in basis points
    pub fee_bps: u16,
}

/// One hop of a cycle, ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    /// Pool to trade through
    pub pair: PairKey,
    /// Which token of the pool is sold
    pub direction: Direction,
    /// Amount sold
    pub amount_in: U256,
    /// The trade must fail rather than return less than this
    pub min_amount_out: U256,
}

impl fmt::Display for TradeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in={} min_out={}",
            self.pair, self.direction, self.amount_in, self.min_amount_out
        )
    }
}

/// What a settled trade returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    /// Amount actually received
    pub amount_out: U256,
    /// Transaction reference assigned by the DEX
    pub tx_ref: String,
}

/// The wallet trades are signed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletCredentials {
    /// Address of the trading wallet
    pub user_address: String,
}

/// Client of a constant-product DEX.
///
/// Implementations must be cheap to share: the pool cache calls
/// `get_reserves` concurrently for several pools.
#[async_trait]
pub trait DexClient: Send + Sync {
    /// Current reserves and fee of a pool
    async fn get_reserves(&self, pair: &PairKey) -> Result<Reserves, FetchError>;

    /// Submits a single trade and waits for it to settle
    async fn submit_trade(
        &self,
        request: &TradeRequest,
        wallet: &WalletCredentials,
    ) -> Result<TradeReceipt, SubmissionError>;

    /// True when trades settle against a local copy of the pools and never
    /// reach the chain
    fn is_paper(&self) -> bool {
        false
    }
}
