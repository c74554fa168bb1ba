//! Token graph over one pool snapshot and the triangle finder.
//!
//! Tokens are nodes and pools are edges, each pool traversable in both
//! directions. The graph is rebuilt for every scan and never mutated.

use std::collections::BTreeMap;

use log::debug;

use super::cycle::Cycle;
use super::swap::{Direction, Swap};
use super::types::{PairKey, Pool, Token};

/// One traversable side of a pool
#[derive(Debug, Clone)]
struct Edge {
    /// Index into `PoolGraph::pools`
    pool: usize,
    /// Direction the pool is traversed in
    direction: Direction,
    /// Token reached by following the edge
    to: Token,
}

/// Read-only adjacency view over a set of pools
#[derive(Debug, Default)]
pub struct PoolGraph {
    /// Pools sorted by pair, one per pair
    pools: Vec<Pool>,
    /// Outgoing edges per token, sorted by destination token
    adjacency: BTreeMap<Token, Vec<Edge>>,
}

impl PoolGraph {
    /// Builds the graph. When the same pair shows up more than once the first
    /// pool wins.
    pub fn build(pools: impl IntoIterator<Item = Pool>) -> Self {
        let mut by_pair: BTreeMap<PairKey, Pool> = BTreeMap::new();
        for pool in pools {
            if by_pair.contains_key(&pool.pair) {
                debug!("graph: ignoring duplicate pool {}", pool.pair);
                continue;
            }
            by_pair.insert(pool.pair.clone(), pool);
        }

        let pools: Vec<Pool> = by_pair.into_values().collect();
        let mut adjacency: BTreeMap<Token, Vec<Edge>> = BTreeMap::new();
        for (index, pool) in pools.iter().enumerate() {
            adjacency.entry(pool.token0().clone()).or_default().push(Edge {
                pool: index,
                direction: Direction::ZeroForOne,
                to: pool.token1().clone(),
            });
            adjacency.entry(pool.token1().clone()).or_default().push(Edge {
                pool: index,
                direction: Direction::OneForZero,
                to: pool.token0().clone(),
            });
        }
        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| a.to.cmp(&b.to));
        }

        Self { pools, adjacency }
    }

    /// Number of pools (edges)
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Number of tokens (nodes)
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.adjacency.len()
    }

    /// The pools of the graph, sorted by pair
    #[must_use]
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    fn edges_from<'a>(&'a self, token: &Token) -> impl Iterator<Item = &'a Edge> + 'a {
        self.adjacency.get(token).into_iter().flatten()
    }

    fn swap(&self, edge: &Edge) -> Swap {
        Swap::from_pool(&self.pools[edge.pool], edge.direction)
    }

    /// Lazily enumerates every cycle `start -> X -> Y -> start` over three distinct
    /// pools and three distinct tokens.
    ///
    /// Both orientations of a triangle are produced since they trade differently.
    /// The sequence is finite and deterministic for a given graph but carries no
    /// ranking.
    pub fn find_triangles<'a>(&'a self, start: &'a Token) -> impl Iterator<Item = Cycle> + 'a {
        self.edges_from(start).flat_map(move |first| {
            self.edges_from(&first.to)
                .filter(move |second| {
                    second.to != *start && second.to != first.to && second.pool != first.pool
                })
                .filter_map(move |second| {
                    let third = self.edges_from(&second.to).find(|third| {
                        third.to == *start && third.pool != first.pool && third.pool != second.pool
                    })?;
                    match Cycle::new(vec![self.swap(first), self.swap(second), self.swap(third)]) {
                        Ok(cycle) => Some(cycle),
                        Err(e) => {
                            debug!("graph: discarding malformed cycle: {e}");
                            None
                        }
                    }
                })
        })
    }
}
