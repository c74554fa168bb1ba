use std::fmt::{self, Display};

use alloy::primitives::U256;

use super::swap::Swap;
use crate::utils::constants::BPS_DENOMINATOR;

/// A swap priced for a concrete input amount
#[derive(Debug, Clone)]
pub struct SwapQuote {
    /// The swap being priced
    swap: Swap,
    /// Amount going in
    amount_in: U256,
    /// Amount coming out, rounded down
    amount_out: U256,
    /// Output shortfall against the spot price
    price_impact_bps: u32,
}

impl SwapQuote {
    /// Prices `swap` for `amount_in`, `None` if the swap is illiquid
    #[must_use]
    pub fn new(swap: &Swap, amount_in: U256) -> Option<Self> {
        let amount_out = swap.amount_out(amount_in)?;
        Some(Self {
            swap: swap.clone(),
            amount_in,
            amount_out,
            price_impact_bps: swap.price_impact_bps(amount_in),
        })
    }

    /// The quoted swap
    #[must_use]
    pub const fn swap(&self) -> &Swap {
        &self.swap
    }

    /// Amount going in
    #[must_use]
    pub const fn amount_in(&self) -> U256 {
        self.amount_in
    }

    /// Amount coming out
    #[must_use]
    pub const fn amount_out(&self) -> U256 {
        self.amount_out
    }

    /// Price impact in basis points
    #[must_use]
    pub const fn price_impact_bps(&self) -> u32 {
        self.price_impact_bps
    }

    /// The least output to accept when this quote is submitted
    #[must_use]
    pub fn min_amount_out(&self, slippage_tolerance_bps: u32) -> U256 {
        min_amount_out(self.amount_out, slippage_tolerance_bps)
    }
}

impl Display for SwapQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {} (fee {}bps, impact {}bps)",
            self.amount_in,
            self.swap.token_in(),
            self.amount_out,
            self.swap.token_out(),
            self.swap.fee_bps(),
            self.price_impact_bps
        )
    }
}

/// `expected * (10000 - slippage) / 10000`, rounded down. A tolerance of 100% or
/// more accepts anything.
#[must_use]
pub fn min_amount_out(expected: U256, slippage_tolerance_bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(u64::from(slippage_tolerance_bps));
    expected.saturating_mul(U256::from(keep)) / U256::from(BPS_DENOMINATOR)
}
