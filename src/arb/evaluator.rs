//! Profitability evaluator: decides whether the best simulated cycle of a scan
//! is worth executing.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::cycle_quote::CycleQuote;

/// What to do with a simulated cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Profitable beyond both thresholds
    Execute,
    /// Not profitable enough, or nothing to evaluate
    Skip,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execute => write!(f, "execute"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Profit thresholds. Both are additive: a cycle must clear their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    /// Minimum profit worth trading for
    pub min_profit_bps: u32,
    /// Safety margin for price moves between scan and settlement
    pub profit_buffer_bps: u32,
}

impl Evaluator {
    /// Creates an evaluator
    #[must_use]
    pub const fn new(min_profit_bps: u32, profit_buffer_bps: u32) -> Self {
        Self {
            min_profit_bps,
            profit_buffer_bps,
        }
    }

    /// `min_profit_bps + profit_buffer_bps`
    #[must_use]
    pub fn threshold_bps(&self) -> i64 {
        i64::from(self.min_profit_bps) + i64::from(self.profit_buffer_bps)
    }

    /// Execute only if the quote clears the threshold and actually returns more
    /// than it takes
    #[must_use]
    pub fn evaluate(&self, quote: &CycleQuote) -> Decision {
        if quote.net_profit_bps() >= self.threshold_bps() && quote.is_profitable() {
            Decision::Execute
        } else {
            Decision::Skip
        }
    }

    /// The single best quote of a scan: highest `net_profit_bps`, then highest
    /// final amount, then the smallest cycle by token sequence and pools.
    pub fn select_best(quotes: impl IntoIterator<Item = CycleQuote>) -> Option<CycleQuote> {
        quotes.into_iter().min_by(rank)
    }
}

/// `Less` means `a` ranks ahead of `b`
fn rank(a: &CycleQuote, b: &CycleQuote) -> Ordering {
    b.net_profit_bps()
        .cmp(&a.net_profit_bps())
        .then_with(|| b.amount_out().cmp(&a.amount_out()))
        .then_with(|| a.cycle().cmp(b.cycle()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::arb::cycle_quote::simulate;
    use crate::arb::test_helpers::*;

    fn quote(hops: &[(&str, &str, u64, u64, u16)], amount_in: u64) -> CycleQuote {
        simulate(&cycle(hops), U256::from(amount_in)).unwrap()
    }

    fn profitable(net_out: u64) -> [(&'static str, &'static str, u64, u64, u16); 3] {
        // huge reserves so that the output is close to the spot product
        let r = 1_000_000_000_000;
        [
            ("A", "B", r, r, 0),
            ("B", "C", r, r, 0),
            ("C", "A", r, r * net_out / 10_000, 0),
        ]
    }

    #[test]
    fn test_evaluate_threshold_is_additive() {
        let evaluator = Evaluator::new(10, 5);
        assert_eq!(evaluator.threshold_bps(), 15);

        for (net_out, expected_bps, expected) in &[
            (10_016, 15, Decision::Execute),
            (10_015, 14, Decision::Skip),
            (10_200, 199, Decision::Execute),
            (9_000, -1_000, Decision::Skip),
        ] {
            let quote = quote(&profitable(*net_out), 1_000_000);
            assert_eq!(quote.net_profit_bps(), *expected_bps, "net_out {net_out}");
            assert_eq!(evaluator.evaluate(&quote), *expected, "net_out {net_out}");
        }
    }

    #[test]
    fn test_evaluate_scenario_is_skipped() {
        let evaluator = Evaluator::new(10, 5);
        let quote = quote(
            &[
                ("GUSDC", "GALA", 100_000, 50_000, 30),
                ("GALA", "GWETH", 50_000, 200, 30),
                ("GWETH", "GUSDC", 200, 100_500, 30),
            ],
            1_000,
        );
        assert_eq!(evaluator.evaluate(&quote), Decision::Skip);
    }

    #[test]
    fn test_zero_threshold_never_executes_a_loss() {
        let evaluator = Evaluator::new(0, 0);
        let quote = quote(&profitable(10_000), 1_000_000);
        // rounds to 0 bps but returns less than it takes
        assert_eq!(quote.net_profit_bps(), 0);
        assert_eq!(evaluator.evaluate(&quote), Decision::Skip);
    }

    #[test]
    fn test_select_best_highest_profit() {
        let low = quote(&profitable(10_100), 1_000_000);
        let high = quote(&profitable(10_300), 1_000_000);
        let best = Evaluator::select_best(vec![low, high.clone()]).unwrap();
        assert_eq!(best.net_profit_bps(), high.net_profit_bps());
        assert!(Evaluator::select_best(Vec::new()).is_none());
    }

    #[test]
    fn test_select_best_tie_break_is_deterministic() {
        let r = 1_000_000_000_000;
        let abc = quote(
            &[("A", "B", r, r, 0), ("B", "C", r, r, 0), ("C", "A", r, r * 2, 0)],
            1_000_000,
        );
        let acb = quote(
            &[("A", "C", r, r, 0), ("C", "B", r, r, 0), ("B", "A", r, r * 2, 0)],
            1_000_000,
        );
        assert_eq!(abc.net_profit_bps(), acb.net_profit_bps());
        assert_eq!(abc.amount_out(), acb.amount_out());

        for quotes in [vec![abc.clone(), acb.clone()], vec![acb, abc]] {
            let best = Evaluator::select_best(quotes).unwrap();
            assert_eq!(path(best.cycle()), "A->B->C->A");
        }
    }
}
