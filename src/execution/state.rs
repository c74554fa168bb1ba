use std::fmt;

use alloy::primitives::U256;
use serde::{Serialize, Serializer};

use crate::arb::cycle_quote::CycleQuote;
use crate::arb::swap::Direction;
use crate::arb::types::{PairKey, Token};
use crate::error::ExecutionError;
use crate::utils::constants::CYCLE_HOPS;

/// Where an execution attempt stands.
///
/// Hops are strictly ordered: hop N+1 is only submitted once hop N is confirmed.
/// Any submitted hop may fail, after which the attempt is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing sent yet
    Pending,
    /// First trade sent, awaiting its receipt
    Hop1Submitted,
    /// First trade settled
    Hop1Confirmed,
    /// Second trade sent, awaiting its receipt
    Hop2Submitted,
    /// Second trade settled
    Hop2Confirmed,
    /// Last trade sent, awaiting its receipt
    Hop3Submitted,
    /// All three hops settled
    Completed,
    /// A submitted hop did not settle
    Failed {
        /// 1-based hop that failed
        hop: usize,
        /// Error reported for it
        reason: String,
    },
}

/// What happened to the hop in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    /// The next hop was sent
    Submit,
    /// The hop in flight settled
    Confirm,
    /// The hop in flight was rejected or timed out
    Fail(String),
}

impl fmt::Display for AttemptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submit => write!(f, "submit"),
            Self::Confirm => write!(f, "confirm"),
            Self::Fail(reason) => write!(f, "fail ({reason})"),
        }
    }
}

impl AttemptState {
    /// The state after `event`
    ///
    /// # Errors
    /// [`ExecutionError::InvalidTransition`] if `event` is not allowed now
    pub fn apply(&self, event: &AttemptEvent) -> Result<Self, ExecutionError> {
        let next = match (self, event) {
            (Self::Pending, AttemptEvent::Submit) => Self::Hop1Submitted,
            (Self::Hop1Submitted, AttemptEvent::Confirm) => Self::Hop1Confirmed,
            (Self::Hop1Confirmed, AttemptEvent::Submit) => Self::Hop2Submitted,
            (Self::Hop2Submitted, AttemptEvent::Confirm) => Self::Hop2Confirmed,
            (Self::Hop2Confirmed, AttemptEvent::Submit) => Self::Hop3Submitted,
            (Self::Hop3Submitted, AttemptEvent::Confirm) => Self::Completed,
            (Self::Hop1Submitted | Self::Hop2Submitted | Self::Hop3Submitted, AttemptEvent::Fail(reason)) => {
                Self::Failed {
                    hop: self.hop_in_flight().unwrap_or_default(),
                    reason: reason.clone(),
                }
            }
            _ => {
                return Err(ExecutionError::InvalidTransition {
                    from: self.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }

    /// 1-based hop currently submitted and not yet settled
    #[must_use]
    pub const fn hop_in_flight(&self) -> Option<usize> {
        match self {
            Self::Hop1Submitted => Some(1),
            Self::Hop2Submitted => Some(2),
            Self::Hop3Submitted => Some(3),
            _ => None,
        }
    }

    /// Number of hops that settled
    #[must_use]
    pub const fn hops_confirmed(&self) -> usize {
        match self {
            Self::Pending | Self::Hop1Submitted => 0,
            Self::Hop1Confirmed | Self::Hop2Submitted => 1,
            Self::Hop2Confirmed | Self::Hop3Submitted => 2,
            Self::Completed => CYCLE_HOPS,
            Self::Failed { hop, .. } => hop.saturating_sub(1),
        }
    }

    /// Completed or failed
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Hop1Submitted => write!(f, "hop 1 submitted"),
            Self::Hop1Confirmed => write!(f, "hop 1 confirmed"),
            Self::Hop2Submitted => write!(f, "hop 2 submitted"),
            Self::Hop2Confirmed => write!(f, "hop 2 confirmed"),
            Self::Hop3Submitted => write!(f, "hop 3 submitted"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { hop, reason } => write!(f, "failed at hop {hop}: {reason}"),
        }
    }
}

impl Serialize for AttemptState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Amounts are written as decimal strings
#[allow(clippy::trivially_copy_pass_by_ref)]
fn decimal<S: Serializer>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

#[allow(clippy::ref_option)]
fn decimal_opt<S: Serializer>(amount: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
    match amount {
        Some(amount) => serializer.collect_str(amount),
        None => serializer.serialize_none(),
    }
}

/// One submitted hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HopRecord {
    /// 1-based position in the cycle
    pub hop: usize,
    /// Pool traded through
    pub pair: PairKey,
    /// Which of the pool's tokens was sold
    pub direction: Direction,
    /// Token sold
    pub token_in: Token,
    /// Token bought
    pub token_out: Token,
    /// Amount sold: the previous hop's realized output
    #[serde(serialize_with = "decimal")]
    pub amount_in: U256,
    /// Output predicted for `amount_in` on the cached reserves
    #[serde(serialize_with = "decimal")]
    pub expected_out: U256,
    /// Slippage-protected minimum sent with the trade
    #[serde(serialize_with = "decimal")]
    pub min_amount_out: U256,
    /// Realized output, once the hop settled
    #[serde(serialize_with = "decimal_opt")]
    pub amount_out: Option<U256>,
    /// Transaction reference, once the hop settled
    pub tx_ref: Option<String>,
}

/// One execution of a chosen cycle, dry or live.
///
/// Tracks the token and amount currently held so that a failed attempt reports
/// exactly what was left in the wallet.
#[derive(Debug, Clone)]
pub struct ExecutionAttempt {
    quote: CycleQuote,
    dry_run: bool,
    state: AttemptState,
    hops: Vec<HopRecord>,
    held_token: Token,
    held_amount: U256,
}

impl ExecutionAttempt {
    /// A pending attempt holding the starting amount of the start token
    #[must_use]
    pub fn new(quote: CycleQuote, dry_run: bool) -> Self {
        let held_token = quote.cycle().start_token().clone();
        let held_amount = quote.amount_in();
        Self {
            quote,
            dry_run,
            state: AttemptState::Pending,
            hops: Vec::with_capacity(CYCLE_HOPS),
            held_token,
            held_amount,
        }
    }

    /// The simulation the attempt was started from
    #[must_use]
    pub const fn quote(&self) -> &CycleQuote {
        &self.quote
    }

    /// Where the attempt stands
    #[must_use]
    pub const fn state(&self) -> &AttemptState {
        &self.state
    }

    /// True when no trade is sent to the DEX
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Submitted hops so far
    #[must_use]
    pub fn hops(&self) -> &[HopRecord] {
        &self.hops
    }

    /// Token currently held and its amount
    #[must_use]
    pub const fn held(&self) -> (&Token, U256) {
        (&self.held_token, self.held_amount)
    }

    /// Records the submission of the next hop
    ///
    /// # Errors
    /// If a hop is already in flight, the attempt is over, or `record` is not the
    /// next hop
    pub fn submit(&mut self, record: HopRecord) -> Result<(), ExecutionError> {
        let next = self.state.apply(&AttemptEvent::Submit)?;
        if next.hop_in_flight() != Some(record.hop) || record.token_in != self.held_token {
            return Err(ExecutionError::InvalidTransition {
                from: self.state.to_string(),
                event: format!("submit hop {} selling {}", record.hop, record.token_in),
            });
        }
        self.state = next;
        self.hops.push(record);
        Ok(())
    }

    /// Records the settlement of the hop in flight. The output becomes the held
    /// position.
    ///
    /// # Errors
    /// If no hop is in flight
    pub fn confirm(&mut self, amount_out: U256, tx_ref: Option<String>) -> Result<(), ExecutionError> {
        let next = self.state.apply(&AttemptEvent::Confirm)?;
        if let Some(record) = self.hops.last_mut() {
            record.amount_out = Some(amount_out);
            record.tx_ref = tx_ref;
            self.held_token = record.token_out.clone();
            self.held_amount = amount_out;
        }
        self.state = next;
        Ok(())
    }

    /// Records the failure of the hop in flight. The held position is unchanged.
    ///
    /// # Errors
    /// If no hop is in flight
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ExecutionError> {
        self.state = self.state.apply(&AttemptEvent::Fail(reason.into()))?;
        Ok(())
    }

    /// Terminal report of the attempt
    #[must_use]
    pub fn report(&self) -> AttemptReport {
        AttemptReport {
            cycle: self.quote.cycle().to_string(),
            state: self.state.clone(),
            dry_run: self.dry_run,
            hops_completed: self.state.hops_confirmed(),
            amount_in: self.quote.amount_in(),
            simulated_out: self.quote.amount_out(),
            held_token: self.held_token.clone(),
            held_amount: self.held_amount,
            tx_refs: self.hops.iter().filter_map(|hop| hop.tx_ref.clone()).collect(),
            hops: self.hops.clone(),
        }
    }
}

/// Outcome of an attempt, as reported to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptReport {
    /// Token path, e.g. `GUSDC->GALA->GWETH->GUSDC`
    pub cycle: String,
    /// Final state of the attempt
    pub state: AttemptState,
    /// Simulated only, nothing was submitted
    pub dry_run: bool,
    /// Trades confirmed before the attempt ended
    pub hops_completed: usize,
    /// Amount of the start token put into the first hop
    #[serde(serialize_with = "decimal")]
    pub amount_in: U256,
    /// Final amount the simulation predicted
    #[serde(serialize_with = "decimal")]
    pub simulated_out: U256,
    /// Token held when the attempt ended
    pub held_token: Token,
    /// Realized amount held when the attempt ended
    #[serde(serialize_with = "decimal")]
    pub held_amount: U256,
    /// DEX references of the confirmed trades
    pub tx_refs: Vec<String>,
    /// One record per submitted hop
    pub hops: Vec<HopRecord>,
}

impl AttemptReport {
    /// A live attempt that stopped with funds in an intermediate token
    #[must_use]
    pub fn is_stranded(&self) -> bool {
        !self.dry_run && matches!(self.state, AttemptState::Failed { .. }) && self.hops_completed > 0
    }
}

impl fmt::Display for AttemptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}: {}/{CYCLE_HOPS} hops, holding {} {} (in {}, simulated out {})",
            if self.dry_run { "[dry run] " } else { "" },
            self.cycle,
            self.state,
            self.hops_completed,
            self.held_amount,
            self.held_token,
            self.amount_in,
            self.simulated_out,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::cycle_quote::simulate;
    use crate::arb::test_helpers::*;

    fn quote() -> CycleQuote {
        let cycle = cycle(&[
            ("A", "B", 1_000_000, 2_000_000, 30),
            ("B", "C", 2_000_000, 2_000_000, 30),
            ("C", "A", 2_000_000, 1_100_000, 30),
        ]);
        simulate(&cycle, U256::from(1_000)).unwrap()
    }

    fn record(quote: &CycleQuote, hop: usize, amount_in: U256) -> HopRecord {
        let swap = &quote.cycle().swaps()[hop - 1];
        let expected_out = swap.amount_out(amount_in).unwrap();
        HopRecord {
            hop,
            pair: swap.pair().clone(),
            direction: swap.direction(),
            token_in: swap.token_in().clone(),
            token_out: swap.token_out().clone(),
            amount_in,
            expected_out,
            min_amount_out: expected_out,
            amount_out: None,
            tx_ref: None,
        }
    }

    #[test]
    fn test_apply_happy_path() {
        let mut state = AttemptState::Pending;
        for (event, expected) in [
            (AttemptEvent::Submit, AttemptState::Hop1Submitted),
            (AttemptEvent::Confirm, AttemptState::Hop1Confirmed),
            (AttemptEvent::Submit, AttemptState::Hop2Submitted),
            (AttemptEvent::Confirm, AttemptState::Hop2Confirmed),
            (AttemptEvent::Submit, AttemptState::Hop3Submitted),
            (AttemptEvent::Confirm, AttemptState::Completed),
        ] {
            state = state.apply(&event).unwrap();
            assert_eq!(state, expected);
        }
        assert!(state.is_terminal());
        assert_eq!(state.hops_confirmed(), 3);
    }

    #[test]
    fn test_apply_fail_only_from_submitted() {
        let fail = AttemptEvent::Fail("rejected".to_string());
        for (state, expected) in [
            (AttemptState::Hop1Submitted, Some(1)),
            (AttemptState::Hop2Submitted, Some(2)),
            (AttemptState::Hop3Submitted, Some(3)),
            (AttemptState::Pending, None),
            (AttemptState::Hop1Confirmed, None),
            (AttemptState::Hop2Confirmed, None),
            (AttemptState::Completed, None),
        ] {
            let next = state.apply(&fail);
            match expected {
                Some(hop) => {
                    let next = next.unwrap();
                    assert_eq!(
                        next,
                        AttemptState::Failed {
                            hop,
                            reason: "rejected".to_string()
                        }
                    );
                    assert_eq!(next.hops_confirmed(), hop - 1);
                }
                None => assert!(
                    matches!(next, Err(ExecutionError::InvalidTransition { .. })),
                    "{state}"
                ),
            }
        }
    }

    #[test]
    fn test_apply_invalid_transitions() {
        let failed = AttemptState::Failed {
            hop: 2,
            reason: "timeout".to_string(),
        };
        for (state, event) in [
            (AttemptState::Pending, AttemptEvent::Confirm),
            (AttemptState::Hop1Submitted, AttemptEvent::Submit),
            (AttemptState::Hop2Confirmed, AttemptEvent::Confirm),
            (AttemptState::Completed, AttemptEvent::Submit),
            (failed.clone(), AttemptEvent::Submit),
            (failed, AttemptEvent::Confirm),
        ] {
            assert!(state.apply(&event).is_err(), "{event} while {state}");
        }
    }

    #[test]
    fn test_attempt_tracks_held_position() {
        let quote = quote();
        let mut attempt = ExecutionAttempt::new(quote.clone(), false);
        assert_eq!(attempt.held(), (&token("A"), U256::from(1_000)));

        attempt.submit(record(&quote, 1, U256::from(1_000))).unwrap();
        // nothing settled yet
        assert_eq!(attempt.held(), (&token("A"), U256::from(1_000)));
        attempt.confirm(U256::from(1_990), Some("tx-1".to_string())).unwrap();
        assert_eq!(attempt.held(), (&token("B"), U256::from(1_990)));

        attempt.submit(record(&quote, 2, U256::from(1_990))).unwrap();
        attempt.fail("rejected").unwrap();

        let report = attempt.report();
        assert_eq!(
            report.state,
            AttemptState::Failed {
                hop: 2,
                reason: "rejected".to_string()
            }
        );
        assert_eq!(report.hops_completed, 1);
        assert_eq!(report.held_token, token("B"));
        assert_eq!(report.held_amount, U256::from(1_990));
        assert_eq!(report.tx_refs, vec!["tx-1".to_string()]);
        assert_eq!(report.hops.len(), 2);
        assert!(report.is_stranded());
    }

    #[test]
    fn test_submit_rejects_out_of_order_hop() {
        let quote = quote();
        let mut attempt = ExecutionAttempt::new(quote.clone(), true);
        assert!(attempt.submit(record(&quote, 2, U256::from(1_000))).is_err());
        assert_eq!(attempt.state(), &AttemptState::Pending);
        assert!(attempt.hops().is_empty());
    }

    #[test]
    fn test_report_json() {
        let quote = quote();
        let mut attempt = ExecutionAttempt::new(quote.clone(), true);
        attempt.submit(record(&quote, 1, U256::from(1_000))).unwrap();
        attempt.confirm(U256::from(1_992), None).unwrap();

        let json = serde_json::to_value(attempt.report()).unwrap();
        assert_eq!(json["cycle"], "A->B->C->A");
        assert_eq!(json["state"], "hop 1 confirmed");
        assert_eq!(json["held_token"], "B");
        assert_eq!(json["held_amount"], "1992");
        assert_eq!(json["hops"][0]["pair"], "A/B");
        assert_eq!(json["hops"][0]["amount_out"], "1992");
        assert!(!attempt.report().is_stranded());
    }
}
