//! Scan loop: one refresh, search, decision and (at most) one execution per
//! interval.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use eyre::Result;
use serde::Serialize;
use tokio::sync::watch;

use crate::arb::cycle_quote::{simulate, CycleQuote};
use crate::arb::evaluator::{Decision, Evaluator};
use crate::arb::graph::PoolGraph;
use crate::arb::types::Token;
use crate::config::Config;
use crate::dex::DexClient;
use crate::execution::{AttemptReport, ExecutionCoordinator};
use crate::notify::Reporter;
use crate::sync::PoolCache;

/// What one scan found and did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// 1-based scan number
    pub scan: u64,
    /// Pools liquid and fresh enough to trade through
    pub active_pools: usize,
    /// Closed triangles through the start token
    pub candidate_cycles: usize,
    /// Candidates that could be simulated
    pub simulated_cycles: usize,
    /// Token path of the best simulated cycle
    pub best_cycle: Option<String>,
    /// Net profit of the best simulated cycle
    pub best_net_profit_bps: Option<i64>,
    /// Whether the best cycle was worth executing
    pub decision: Decision,
    /// Report of the execution, when the decision was to execute
    pub attempt: Option<AttemptReport>,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan #{}: {} active pools, {} candidate cycles, {} simulated",
            self.scan, self.active_pools, self.candidate_cycles, self.simulated_cycles
        )?;
        if let (Some(cycle), Some(bps)) = (&self.best_cycle, self.best_net_profit_bps) {
            write!(f, ", best {cycle} at {bps} bps")?;
        }
        write!(f, ", decision: {}", self.decision)?;
        if let Some(attempt) = &self.attempt {
            write!(f, ", attempt {}", attempt.state)?;
        }
        Ok(())
    }
}

/// The opportunity engine
pub struct Bot {
    start_token: Token,
    start_amount: U256,
    max_cycles_per_scan: usize,
    scan_interval: Duration,
    cache: PoolCache,
    evaluator: Evaluator,
    coordinator: ExecutionCoordinator,
    reporter: Arc<dyn Reporter>,
    scans: AtomicU64,
}

impl Bot {
    /// Wires a bot to a DEX client. The cache starts empty.
    pub fn new(config: &Config, client: Arc<dyn DexClient>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            start_token: config.start_token.clone(),
            start_amount: config.start_amount,
            max_cycles_per_scan: config.max_cycles_per_scan,
            scan_interval: config.scan_interval,
            cache: PoolCache::new(Arc::clone(&client), config.pools.iter().cloned(), config.pool_cache_settings()),
            evaluator: config.evaluator(),
            coordinator: ExecutionCoordinator::new(
                client,
                config.execution_mode(),
                config.slippage_tolerance_bps,
                config.request_timeout,
            ),
            reporter,
            scans: AtomicU64::new(0),
        }
    }

    /// The pool cache
    #[must_use]
    pub const fn cache(&self) -> &PoolCache {
        &self.cache
    }

    /// Number of scans run so far
    #[must_use]
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Runs one scan: refresh the cache, find and simulate the triangles through
    /// the start token, then execute the best one if it clears the thresholds.
    ///
    /// A failed refresh is not fatal: the scan goes on with whatever cached pools
    /// are still fresh.
    ///
    /// An execution the coordinator refuses is logged and leaves the summary
    /// without an attempt.
    ///
    /// # Errors
    /// Never at the moment
    pub async fn scan_once(&self) -> Result<ScanSummary> {
        let scan = self.scans.fetch_add(1, Ordering::Relaxed) + 1;
        if let Err(e) = self.cache.refresh(false).await {
            log::warn!("bot: scan #{scan} continues on cached pools: {e}");
        }

        let active = self.cache.get_active_pools().await;
        let active_pools = active.len();
        let graph = PoolGraph::build(active);

        let mut candidate_cycles = 0;
        let mut quotes: Vec<CycleQuote> = Vec::new();
        for cycle in graph.find_triangles(&self.start_token) {
            candidate_cycles += 1;
            if candidate_cycles > self.max_cycles_per_scan {
                continue;
            }
            match simulate(&cycle, self.start_amount) {
                Ok(quote) => {
                    log::debug!("bot: {quote}");
                    quotes.push(quote);
                }
                Err(e) => log::debug!("bot: discarding {cycle}: {e}"),
            }
        }
        let simulated_cycles = quotes.len();

        let best = Evaluator::select_best(quotes);
        let decision = best
            .as_ref()
            .map_or(Decision::Skip, |quote| self.evaluator.evaluate(quote));

        let attempt = match (&best, decision) {
            (Some(quote), Decision::Execute) => {
                match self.coordinator.execute(quote).await {
                    Ok(report) => {
                        self.reporter.attempt_finished(&report).await;
                        Some(report)
                    }
                    Err(e) => {
                        log::warn!("bot: scan #{scan} could not execute {}: {e}", quote.cycle());
                        None
                    }
                }
            }
            _ => None,
        };

        let summary = ScanSummary {
            scan,
            active_pools,
            candidate_cycles,
            simulated_cycles,
            best_cycle: best.as_ref().map(|quote| quote.cycle().to_string()),
            best_net_profit_bps: best.as_ref().map(CycleQuote::net_profit_bps),
            decision,
            attempt,
        };
        self.reporter.scan_completed(&summary).await;
        Ok(summary)
    }

    /// Scans every interval until `shutdown` turns true or its sender is
    /// dropped. A scan in progress, including its execution, always finishes.
    ///
    /// # Errors
    /// Never at the moment. Failed scans are logged and the loop goes on.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        log::info!(
            "bot: scanning every {}s from {} {} ({})",
            self.scan_interval.as_secs(),
            self.start_amount,
            self.start_token,
            self.coordinator.trading_mode()
        );
        while !*shutdown.borrow() {
            if let Err(e) = self.scan_once().await {
                log::error!("bot: scan failed: {e}");
            }
            tokio::select! {
                () = tokio::time::sleep(self.scan_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        log::info!("bot: stopped after {} scans", self.scan_count());
        Ok(())
    }
}
