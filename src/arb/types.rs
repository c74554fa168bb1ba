use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use derive_more::Display;
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::error::ConfigError;

/// Symbolic token identifier, e.g. `GUSDC`. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct Token(Arc<str>);

impl Token {
    /// Creates a token from its symbol
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self(Arc::from(symbol))
    }

    /// The token symbol
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Unordered pair of distinct tokens identifying a pool.
///
/// The tokens are stored sorted so that `GALA/GUSDC` and `GUSDC/GALA` are the same
/// key. `token0` is always the smaller symbol.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{token0}/{token1}")]
pub struct PairKey {
    /// Lexicographically smaller token
    pub token0: Token,
    /// Lexicographically larger token
    pub token1: Token,
}

impl PairKey {
    /// Creates the canonical key for two tokens, `None` if they are the same token
    #[must_use]
    pub fn new(a: Token, b: Token) -> Option<Self> {
        match a.cmp(&b) {
            Ordering::Less => Some(Self {
                token0: a,
                token1: b,
            }),
            Ordering::Greater => Some(Self {
                token0: b,
                token1: a,
            }),
            Ordering::Equal => None,
        }
    }

    /// Whether the token is one side of the pair
    #[must_use]
    pub fn contains(&self, token: &Token) -> bool {
        &self.token0 == token || &self.token1 == token
    }
}

impl Debug for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Serialize for PairKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses `A/B`
impl FromStr for PairKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::invalid("ARB_POOLS", s, "expected TOKEN_A/TOKEN_B"))?;
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Err(ConfigError::invalid("ARB_POOLS", s, "empty token symbol"));
        }
        Self::new(Token::new(a), Token::new(b))
            .ok_or_else(|| ConfigError::invalid("ARB_POOLS", s, "pool tokens must differ"))
    }
}

/// A constant-product pool as last read from the DEX
#[derive(Clone, PartialEq, Eq)]
pub struct Pool {
    /// The pool's token pair
    pub pair: PairKey,
    /// Reserve of `pair.token0`, in the chain's smallest denomination
    pub reserve0: U256,
    /// Reserve of `pair.token1`, in the chain's smallest denomination
    pub reserve1: U256,
    /// Fee in basis points, `0 <= fee_bps < 10000`
    pub fee_bps: u16,
    /// When the reserves were read
    pub refreshed_at: Instant,
}

impl Pool {
    /// Creates a pool refreshed now
    #[must_use]
    pub fn new(pair: PairKey, reserve0: U256, reserve1: U256, fee_bps: u16) -> Self {
        Self {
            pair,
            reserve0,
            reserve1,
            fee_bps,
            refreshed_at: Instant::now(),
        }
    }

    /// First token of the pool
    #[must_use]
    pub const fn token0(&self) -> &Token {
        &self.pair.token0
    }

    /// Second token of the pool
    #[must_use]
    pub const fn token1(&self) -> &Token {
        &self.pair.token1
    }

    /// Both reserves strictly exceed `min_liquidity`
    #[must_use]
    pub fn is_liquid(&self, min_liquidity: U256) -> bool {
        self.reserve0 > min_liquidity && self.reserve1 > min_liquidity
    }

    /// The reserves are no older than `ttl` at `now`
    #[must_use]
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.refreshed_at) <= ttl
    }
}

impl Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pool(GALA/GUSDC, 50000 / 100000 @ 30bps)
        write!(
            f,
            "Pool({}, {} / {} @ {}bps)",
            self.pair, self.reserve0, self.reserve1, self.fee_bps
        )
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {} {} (fee {} bps)",
            self.reserve0, self.pair.token0, self.reserve1, self.pair.token1, self.fee_bps
        )
    }
}
