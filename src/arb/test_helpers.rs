#![allow(clippy::unwrap_used)]
use alloy::primitives::U256;

use super::cycle::Cycle;
use super::graph::PoolGraph;
use super::swap::{Direction, Swap};
use super::types::{PairKey, Pool, Token};

#[allow(dead_code)]
pub fn token(symbol: &str) -> Token {
    Token::new(symbol)
}

#[allow(dead_code)]
pub fn pair(a: &str, b: &str) -> PairKey {
    PairKey::new(token(a), token(b)).unwrap()
}

/// Pool with reserves given in the order of the tokens passed, whatever the
/// canonical ordering of the pair is
#[allow(dead_code)]
pub fn pool(a: &str, b: &str, reserve_a: u64, reserve_b: u64, fee_bps: u16) -> Pool {
    let pair = pair(a, b);
    let (reserve0, reserve1) = if pair.token0 == token(a) {
        (reserve_a, reserve_b)
    } else {
        (reserve_b, reserve_a)
    };
    Pool::new(pair, U256::from(reserve0), U256::from(reserve1), fee_bps)
}

/// Swap selling `token_in` for `token_out`
#[allow(dead_code)]
pub fn swap(token_in: &str, token_out: &str, reserve_in: u64, reserve_out: u64, fee_bps: u16) -> Swap {
    let pool = pool(token_in, token_out, reserve_in, reserve_out, fee_bps);
    let direction = Direction::selling(&pool.pair, &token(token_in)).unwrap();
    Swap::from_pool(&pool, direction)
}

/// Cycle from `(token_in, token_out, reserve_in, reserve_out, fee_bps)` hops
#[allow(dead_code)]
pub fn cycle(swaps: &[(&str, &str, u64, u64, u16)]) -> Cycle {
    let swaps = swaps
        .iter()
        .map(|(token_in, token_out, reserve_in, reserve_out, fee_bps)| {
            swap(token_in, token_out, *reserve_in, *reserve_out, *fee_bps)
        })
        .collect();
    Cycle::new(swaps).unwrap()
}

#[allow(dead_code)]
pub fn graph(pools: &[(&str, &str, u64, u64, u16)]) -> PoolGraph {
    PoolGraph::build(
        pools
            .iter()
            .map(|(a, b, reserve_a, reserve_b, fee_bps)| pool(a, b, *reserve_a, *reserve_b, *fee_bps)),
    )
}

/// Token path of a cycle, e.g. `GUSDC->GALA->GWETH->GUSDC`
#[allow(dead_code)]
pub fn path(cycle: &Cycle) -> String {
    cycle.to_string()
}
