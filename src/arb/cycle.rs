/// Cycle is three swaps that form a loop: start -> X -> Y -> start.
/// It is what the triangle finder produces and what the simulator prices.
use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
};

use eyre::{bail, Result};
use itertools::Itertools;

use super::swap::Swap;
use super::types::{PairKey, Token};
use crate::utils::constants::CYCLE_HOPS;

/// A triangular cycle of swaps that starts and ends at the same token
#[derive(Clone)]
pub struct Cycle {
    /// The three swaps, in execution order
    swaps: [Swap; CYCLE_HOPS],
}

impl Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle({})",
            self.swaps.iter().map(|s| format!("{s:?}")).join(", ")
        )
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.tokens().join("->"), self.start_token())
    }
}

impl PartialEq for Cycle {
    fn eq(&self, other: &Self) -> bool {
        self.swaps == other.swaps
    }
}

impl Eq for Cycle {}

impl Hash for Cycle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for swap in &self.swaps {
            swap.hash(state);
        }
    }
}

/// Orders by token sequence, then by pools. Used as the deterministic tie-break
/// between equally profitable cycles.
impl Ord for Cycle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens()
            .cmp(other.tokens())
            .then_with(|| self.pairs().cmp(other.pairs()))
    }
}

impl PartialOrd for Cycle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Cycle {
    /// Creates a cycle from exactly three chained swaps.
    ///
    /// # Errors
    ///
    /// * If there are not exactly three swaps
    /// * If a swap does not sell what the previous one bought, including the closing hop
    /// * If a token is visited twice or a pool is used twice
    pub fn new(swaps: Vec<Swap>) -> Result<Self> {
        let Ok(swaps) = <[Swap; CYCLE_HOPS]>::try_from(swaps) else {
            bail!("Cycle must have exactly {CYCLE_HOPS} swaps");
        };
        let cycle = Self { swaps };
        cycle.validate_swaps()?;
        Ok(cycle)
    }

    fn validate_swaps(&self) -> Result<()> {
        for i in 0..CYCLE_HOPS {
            let next = (i + 1) % CYCLE_HOPS;
            if self.swaps[i].token_out() != self.swaps[next].token_in() {
                bail!(
                    "Swap {} token_out ({}) does not match swap {} token_in ({})",
                    i,
                    self.swaps[i].token_out(),
                    next,
                    self.swaps[next].token_in()
                );
            }
        }

        if let Some(token) = self.tokens().duplicates().next() {
            bail!("Cycle visits {token} more than once");
        }
        if let Some(pair) = self.pairs().duplicates().next() {
            bail!("Cycle uses pool {pair} more than once");
        }
        Ok(())
    }

    /// The swaps in execution order
    #[must_use]
    pub const fn swaps(&self) -> &[Swap; CYCLE_HOPS] {
        &self.swaps
    }

    /// The token the cycle starts and ends with
    #[must_use]
    pub fn start_token(&self) -> &Token {
        self.swaps[0].token_in()
    }

    /// The visited tokens in order, starting with the start token
    pub fn tokens(&self) -> impl Iterator<Item = &Token> + Clone {
        self.swaps.iter().map(Swap::token_in)
    }

    /// The pools used, in execution order
    pub fn pairs(&self) -> impl Iterator<Item = &PairKey> + Clone {
        self.swaps.iter().map(Swap::pair)
    }
}
