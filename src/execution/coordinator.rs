use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::state::{AttemptReport, ExecutionAttempt, HopRecord};
use crate::arb::cycle_quote::CycleQuote;
use crate::arb::swap_quote::min_amount_out;
use crate::dex::{DexClient, TradeRequest, WalletCredentials};
use crate::error::{ExecutionError, SubmissionError};

/// How trades are carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Walk through every hop with simulated amounts, never submit
    DryRun,
    /// Submit every hop for real from this wallet
    Live(WalletCredentials),
}

/// Runs the three hops of a selected cycle, one attempt at a time.
///
/// A live hop that fails ends the attempt where it stands. Hops already settled
/// are not reversed: the report names the token and amount now held so the
/// operator can decide what to do with it.
pub struct ExecutionCoordinator {
    client: Arc<dyn DexClient>,
    mode: ExecutionMode,
    slippage_tolerance_bps: u32,
    submit_timeout: Duration,
    pub(crate) in_flight: Mutex<()>,
}

impl ExecutionCoordinator {
    /// Creates a coordinator
    pub fn new(
        client: Arc<dyn DexClient>,
        mode: ExecutionMode,
        slippage_tolerance_bps: u32,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            client,
            mode,
            slippage_tolerance_bps,
            submit_timeout,
            in_flight: Mutex::new(()),
        }
    }

    /// Whether trades are only simulated
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        matches!(self.mode, ExecutionMode::DryRun)
    }

    /// How trades are carried out, for the operator: `dry run`, `paper` when
    /// the client settles trades locally, or `live`
    #[must_use]
    pub fn trading_mode(&self) -> &'static str {
        if self.is_dry_run() {
            "dry run"
        } else if self.client.is_paper() {
            "paper"
        } else {
            "live"
        }
    }

    /// Executes the cycle of `quote`, starting with its simulated input amount.
    ///
    /// Each hop sells exactly what the previous hop returned. Its minimum output
    /// is that amount re-quoted on the cached reserves, less the slippage
    /// tolerance. Submission errors do not fail this call: they end up in the
    /// report as a failed attempt.
    ///
    /// # Errors
    /// [`ExecutionError::Busy`] if another attempt is still running
    pub async fn execute(&self, quote: &CycleQuote) -> Result<AttemptReport, ExecutionError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::warn!("execution: attempt for {} refused, another one is in flight", quote.cycle());
            return Err(ExecutionError::Busy);
        };

        let mut attempt = ExecutionAttempt::new(quote.clone(), self.is_dry_run());
        log::info!(
            "execution: {}starting {} with {} {}",
            if self.is_dry_run() { "[dry run] " } else { "" },
            quote.cycle(),
            quote.amount_in(),
            quote.cycle().start_token()
        );

        for (index, swap) in quote.cycle().swaps().iter().enumerate() {
            let hop = index + 1;
            let (_, amount_in) = attempt.held();
            // the cached reserves were liquid when the cycle was simulated
            let expected_out = swap.amount_out(amount_in).unwrap_or(U256::ZERO);
            let record = HopRecord {
                hop,
                pair: swap.pair().clone(),
                direction: swap.direction(),
                token_in: swap.token_in().clone(),
                token_out: swap.token_out().clone(),
                amount_in,
                expected_out,
                min_amount_out: min_amount_out(expected_out, self.slippage_tolerance_bps),
                amount_out: None,
                tx_ref: None,
            };

            let wallet = match &self.mode {
                ExecutionMode::DryRun => {
                    attempt.submit(record)?;
                    attempt.confirm(expected_out, None)?;
                    continue;
                }
                ExecutionMode::Live(wallet) => wallet,
            };

            let request = TradeRequest {
                pair: record.pair.clone(),
                direction: record.direction,
                amount_in: record.amount_in,
                min_amount_out: record.min_amount_out,
            };
            attempt.submit(record)?;
            log::info!("execution: hop {hop} submitted: {request}");

            let result = timeout(self.submit_timeout, self.client.submit_trade(&request, wallet))
                .await
                .unwrap_or(Err(SubmissionError::Timeout(self.submit_timeout)));
            match result {
                Ok(receipt) => {
                    log::info!(
                        "execution: hop {hop} confirmed: received {} {} ({})",
                        receipt.amount_out,
                        swap.token_out(),
                        receipt.tx_ref
                    );
                    attempt.confirm(receipt.amount_out, Some(receipt.tx_ref))?;
                }
                Err(e) => {
                    attempt.fail(e.to_string())?;
                    break;
                }
            }
        }

        let report = attempt.report();
        if report.is_stranded() {
            log::error!(
                "execution: {} stopped at hop {}. Funds are held in {}: {} {}. No reversal was attempted",
                report.cycle,
                report.hops_completed + 1,
                report.held_token,
                report.held_amount,
                report.held_token
            );
        } else if report.state.is_terminal() && report.hops_completed == 0 && !report.dry_run {
            log::warn!("execution: {}", report);
        } else {
            log::info!("execution: {}", report);
        }
        Ok(report)
    }
}
