/// A swap is one of the two sides of a pool: `ZeroForOne` or `OneForZero`.
/// It knows the reserves and fee, and computes constant-product outputs.
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};

use alloy::primitives::U256;
use serde::Serialize;

use super::types::{PairKey, Pool, Token};
use crate::utils::constants::BPS_DENOMINATOR;

/// The direction of a swap in a liquidity pool.
///
/// A pool holds `token0` and `token1` (sorted by symbol), so a swap goes either
/// from token0 to token1 or from token1 to token0.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum Direction {
    /// Swap from token0 to token1 in the pool
    ZeroForOne,
    /// Swap from token1 to token0 in the pool
    OneForZero,
}

impl Direction {
    /// The direction that takes `token_in` into the pool, `None` if the pool does
    /// not hold that token
    #[must_use]
    pub fn selling(pair: &PairKey, token_in: &Token) -> Option<Self> {
        if &pair.token0 == token_in {
            Some(Self::ZeroForOne)
        } else if &pair.token1 == token_in {
            Some(Self::OneForZero)
        } else {
            None
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Debug for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroForOne => write!(f, "0>1"),
            Self::OneForZero => write!(f, "1>0"),
        }
    }
}

/// A single swap between two tokens in a pool in one direction or the other.
/// This codifies the direction of the swap and carries the reserves and fee it was
/// built from. Swap amounts live in [`super::swap_quote::SwapQuote`].
#[derive(Clone, Eq)]
pub struct Swap {
    /// Pool the swap goes through
    pair: PairKey,
    /// Direction through the pool
    direction: Direction,
    /// The token being swapped in
    token_in: Token,
    /// The token being swapped out
    token_out: Token,
    /// Pool reserve of the input token
    reserve_in: U256,
    /// Pool reserve of the output token
    reserve_out: U256,
    /// Pool fee in basis points
    fee_bps: u16,
}

/// Swaps are compared by pool and direction only. Reserves are a snapshot and do
/// not change which swap this is.
impl PartialEq for Swap {
    fn eq(&self, other: &Self) -> bool {
        self.pair == other.pair && self.direction == other.direction
    }
}

impl Hash for Swap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pair.hash(state);
        self.direction.hash(state);
    }
}

impl Debug for Swap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Swap(GALA/GUSDC 1>0, 100000 GUSDC / 50000 GALA @ 30bps)
        write!(
            f,
            "Swap({} {:?}, {} {} / {} {} @ {}bps)",
            self.pair,
            self.direction,
            self.reserve_in,
            self.token_in,
            self.reserve_out,
            self.token_out,
            self.fee_bps
        )
    }
}

impl Display for Swap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.token_in, self.token_out)
    }
}

impl Swap {
    /// Creates the swap selling `pool`'s token in the given direction
    #[must_use]
    pub fn from_pool(pool: &Pool, direction: Direction) -> Self {
        let (reserve_in, reserve_out) = match direction {
            Direction::ZeroForOne => (pool.reserve0, pool.reserve1),
            Direction::OneForZero => (pool.reserve1, pool.reserve0),
        };
        let (token_in, token_out) = match direction {
            Direction::ZeroForOne => (pool.token0().clone(), pool.token1().clone()),
            Direction::OneForZero => (pool.token1().clone(), pool.token0().clone()),
        };
        Self {
            pair: pool.pair.clone(),
            direction,
            token_in,
            token_out,
            reserve_in,
            reserve_out,
            // Pools never leave the cache with a fee of 100% or more
            fee_bps: pool.fee_bps.min(9_999),
        }
    }

    /// The pool the swap goes through
    #[must_use]
    pub const fn pair(&self) -> &PairKey {
        &self.pair
    }

    /// The direction of the swap through its pool
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The token being swapped in
    #[must_use]
    pub const fn token_in(&self) -> &Token {
        &self.token_in
    }

    /// The token being swapped out
    #[must_use]
    pub const fn token_out(&self) -> &Token {
        &self.token_out
    }

    /// Pool reserve of the input token
    #[must_use]
    pub const fn reserve_in(&self) -> U256 {
        self.reserve_in
    }

    /// Pool reserve of the output token
    #[must_use]
    pub const fn reserve_out(&self) -> U256 {
        self.reserve_out
    }

    /// Pool fee in basis points
    #[must_use]
    pub const fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    /// `amount_in * (10000 - fee) / 10000`, rounded down
    #[must_use]
    pub fn amount_in_after_fee(&self, amount_in: U256) -> U256 {
        let keep = U256::from(BPS_DENOMINATOR - u64::from(self.fee_bps));
        amount_in.saturating_mul(keep) / U256::from(BPS_DENOMINATOR)
    }

    /// Constant-product output for `amount_in`, rounded down:
    /// `reserve_out * in_after_fee / (reserve_in + in_after_fee)`.
    ///
    /// Returns `None` when the hop is illiquid: either reserve is zero or the
    /// denominator would be zero.
    #[must_use]
    pub fn amount_out(&self, amount_in: U256) -> Option<U256> {
        if self.reserve_in.is_zero() || self.reserve_out.is_zero() {
            return None;
        }
        let in_after_fee = self.amount_in_after_fee(amount_in);
        let denominator = self.reserve_in.checked_add(in_after_fee)?;
        if denominator.is_zero() {
            return None;
        }
        let numerator = self.reserve_out.checked_mul(in_after_fee)?;
        Some(numerator / denominator)
    }

    /// Shortfall of the constant-product output against the spot price, in bps.
    ///
    /// Relative to the spot output `in_after_fee * reserve_out / reserve_in` the pool
    /// pays `reserve_in / (reserve_in + in_after_fee)` of it, so the impact is
    /// `in_after_fee / (reserve_in + in_after_fee)`. Rounded up.
    #[must_use]
    pub fn price_impact_bps(&self, amount_in: U256) -> u32 {
        let in_after_fee = self.amount_in_after_fee(amount_in);
        let Some(denominator) = self.reserve_in.checked_add(in_after_fee) else {
            return u32::try_from(BPS_DENOMINATOR).unwrap_or(u32::MAX);
        };
        if denominator.is_zero() {
            return 0;
        }
        let numerator = in_after_fee.saturating_mul(U256::from(BPS_DENOMINATOR));
        let impact = numerator.div_ceil(denominator);
        u32::try_from(impact).unwrap_or(u32::MAX)
    }
}
