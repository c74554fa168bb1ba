/*!
 * # GalaSwap Arb - Triangular Arbitrage Opportunity Engine
 *
 * Finds and trades three-hop cycles through constant-product pools that return
 * more of the start token than they take.
 *
 * ## Core Features
 *
 * - **Pool Cache**: reserves of the configured pools with a TTL and
 *   copy-on-refresh snapshots
 * - **Triangle Finder**: every closed three-pool cycle through the start token
 * - **Trade Simulator**: integer constant-product math, rounded down
 * - **Profitability Evaluator**: minimum profit plus safety buffer, one cycle per scan
 * - **Execution Coordinator**: dry-run or live hop-by-hop execution that reports
 *   the held position instead of unwinding
 *
 * ## Module Structure
 *
 * - `arb`: Pure arbitrage math, graph and decision logic
 * - `bot`: Scan loop
 * - `config`: Configuration from the environment
 * - `dex`: DEX client seam and the snapshot paper-trading client
 * - `error`: Error taxonomy
 * - `execution`: Execution attempts and their coordinator
 * - `notify`: Scan and attempt reporting
 * - `sync`: Pool cache
 * - `utils`: Logger and constants
 */

/// Arbitrage detection logic
pub mod arb;
/// Scan loop
pub mod bot;
/// Configuration management for the system
pub mod config;
/// DEX client interface and implementations
pub mod dex;
/// Error types
pub mod error;
/// Trade execution
pub mod execution;
/// Reporting
pub mod notify;
/// Pool state synchronization
pub mod sync;
/// Utility functions and helpers
pub mod utils;
