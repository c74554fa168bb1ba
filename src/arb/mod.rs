//! # Arbitrage Module
//!
//! Pure algorithmic core of the bot: pool and swap modeling, the pool graph
//! with its triangle finder, cycle simulation and the profitability decision.
//! Nothing in here performs I/O.

/// Validated three-hop cycles
pub mod cycle;
/// Cycle simulation
pub mod cycle_quote;
/// Profitability decision and best-cycle selection
pub mod evaluator;
/// Token/pool graph and triangle enumeration
pub mod graph;
/// Constant-product swap model
pub mod swap;
/// Single hop quotes
pub mod swap_quote;
/// Fixture builders for tests
#[cfg(test)]
pub(crate) mod test_helpers;
/// Tokens, pair keys and pools
pub mod types;
