use std::fmt::{self, Display};

use alloy::primitives::{I256, U256};

use super::cycle::Cycle;
use super::swap_quote::SwapQuote;
use crate::error::SimulationError;
use crate::utils::constants::BPS_DENOMINATOR;

/// Simulated outcome of running a whole cycle against cached reserves.
///
/// Each hop's output is the next hop's input. Reserves are not depleted between
/// hops since every pool appears at most once in a cycle. All amounts are rounded
/// down, so the quote never overstates what the cycle returns.
#[derive(Debug, Clone)]
pub struct CycleQuote {
    /// The simulated cycle
    cycle: Cycle,
    /// The quotes for each swap in the cycle
    swap_quotes: Vec<SwapQuote>,
    /// Net return relative to the input, in basis points
    net_profit_bps: i64,
}

impl CycleQuote {
    /// Simulates the cycle for `amount_in` of its start token.
    ///
    /// # Errors
    ///
    /// * [`SimulationError::ZeroAmountIn`] if `amount_in` is zero
    /// * [`SimulationError::IlliquidHop`] if any hop has an empty reserve
    pub fn new(cycle: &Cycle, amount_in: U256) -> Result<Self, SimulationError> {
        if amount_in.is_zero() {
            return Err(SimulationError::ZeroAmountIn);
        }

        let mut swap_quotes = Vec::with_capacity(cycle.swaps().len());
        let mut amount = amount_in;
        for (index, swap) in cycle.swaps().iter().enumerate() {
            let quote = SwapQuote::new(swap, amount).ok_or_else(|| SimulationError::IlliquidHop {
                hop: index + 1,
                pool: swap.pair().clone(),
            })?;
            amount = quote.amount_out();
            swap_quotes.push(quote);
        }

        Ok(Self {
            cycle: cycle.clone(),
            swap_quotes,
            net_profit_bps: net_profit_bps(amount_in, amount),
        })
    }

    /// The simulated cycle
    #[must_use]
    pub const fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    /// Per-hop quotes, in execution order
    #[must_use]
    pub fn swap_quotes(&self) -> &[SwapQuote] {
        &self.swap_quotes
    }

    /// The initial amount input into the first swap of the cycle
    #[must_use]
    pub fn amount_in(&self) -> U256 {
        self.swap_quotes
            .first()
            .map_or(U256::ZERO, SwapQuote::amount_in)
    }

    /// The final amount output from the last swap of the cycle
    #[must_use]
    pub fn amount_out(&self) -> U256 {
        self.swap_quotes
            .last()
            .map_or(U256::ZERO, SwapQuote::amount_out)
    }

    /// Profit in the start token, negative for a losing cycle
    #[must_use]
    pub fn profit(&self) -> I256 {
        I256::from_raw(self.amount_out()).saturating_sub(I256::from_raw(self.amount_in()))
    }

    /// `(amount_out - amount_in) * 10000 / amount_in`
    #[must_use]
    pub const fn net_profit_bps(&self) -> i64 {
        self.net_profit_bps
    }

    /// Whether the cycle returns strictly more than it takes
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.amount_out() > self.amount_in()
    }
}

impl Display for CycleQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | in={} out={} profit={} bps",
            self.cycle,
            self.amount_in(),
            self.amount_out(),
            self.net_profit_bps
        )
    }
}

/// Net return in basis points. The fraction is truncated toward zero, which for a
/// gain rounds down. A truncated loss can read as 0 bps but never as a gain.
fn net_profit_bps(amount_in: U256, amount_out: U256) -> i64 {
    if amount_in.is_zero() {
        return 0;
    }
    let denominator = U256::from(BPS_DENOMINATOR);
    if amount_out >= amount_in {
        let gain = (amount_out - amount_in).saturating_mul(denominator) / amount_in;
        i64::try_from(gain).unwrap_or(i64::MAX)
    } else {
        // a loss is bounded by the whole input, i.e. 10000 bps
        let loss = (amount_in - amount_out).saturating_mul(denominator) / amount_in;
        i64::try_from(loss).map_or(i64::MIN, |loss| -loss)
    }
}

/// Simulates `cycle` for `amount_in`, see [`CycleQuote::new`]
///
/// # Errors
///
/// See [`CycleQuote::new`]
pub fn simulate(cycle: &Cycle, amount_in: U256) -> Result<CycleQuote, SimulationError> {
    CycleQuote::new(cycle, amount_in)
}
