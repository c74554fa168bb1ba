//! Error taxonomy of the opportunity engine.
//!
//! Each stage fails in its own way and is recovered at a different level:
//! fetch errors stay inside the pool cache, simulation errors discard a single
//! cycle, submission errors end an execution attempt and configuration errors
//! abort the process before the first scan.

use std::time::Duration;

use alloy::primitives::U256;
use thiserror::Error;

use crate::arb::types::PairKey;

/// Reading a pool from the DEX failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not answer within the configured timeout
    #[error("reserves request for {0} timed out")]
    Timeout(PairKey),
    /// The DEX answered with an error
    #[error("reserves request for {pair} failed: {reason}")]
    Rejected {
        /// Pool that was requested
        pair: PairKey,
        /// Error reported by the client
        reason: String,
    },
    /// The DEX does not know this pool
    #[error("pool {0} does not exist on the DEX")]
    UnknownPair(PairKey),
    /// The pool answered with a fee outside `[0, 10000)` bps
    #[error("pool {pair} reported an invalid fee of {fee_bps} bps")]
    InvalidFee {
        /// Pool that was requested
        pair: PairKey,
        /// Fee as reported
        fee_bps: u16,
    },
    /// Not a single configured pool could be read
    #[error("all {attempted} pool requests failed")]
    Unavailable {
        /// Number of pools requested
        attempted: usize,
    },
}

/// A cycle cannot be simulated against the cached reserves
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// One of the hops has an empty reserve or would divide by zero
    #[error("hop {hop} through pool {pool} is illiquid")]
    IlliquidHop {
        /// 1-based hop index
        hop: usize,
        /// Pool used by the hop
        pool: PairKey,
    },
    /// Simulating nothing is meaningless
    #[error("amount in must be positive")]
    ZeroAmountIn,
}

/// A trade call failed. Never retried within the same attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// No answer within the configured timeout. The trade may or may not have settled.
    #[error("trade submission timed out after {0:?}")]
    Timeout(Duration),
    /// The DEX refused the trade
    #[error("trade rejected: {0}")]
    Rejected(String),
    /// The trade would have returned less than the slippage-protected minimum
    #[error("trade would return {received}, below the minimum of {minimum}")]
    BelowMinimum {
        /// Amount the trade would have returned
        received: U256,
        /// Minimum accepted amount
        minimum: U256,
    },
}

/// Invalid settings. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("{0} must be set")]
    Missing(&'static str),
    /// A setting is present but unusable
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`]
    pub fn invalid(key: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// The execution coordinator was driven incorrectly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Another attempt has not reached a terminal state yet
    #[error("an execution attempt is already in flight")]
    Busy,
    /// The state machine does not allow this event in this state
    #[error("invalid transition: {event} while {from}")]
    InvalidTransition {
        /// State the attempt was in
        from: String,
        /// Event that was rejected
        event: String,
    },
}
