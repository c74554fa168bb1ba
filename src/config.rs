//! Settings read from the environment.
//!
//! Every option has a default, so an empty environment yields a dry-run bot
//! scanning the GalaSwap stablecoin triangles.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::U256;

use crate::arb::evaluator::Evaluator;
use crate::arb::types::{PairKey, Token};
use crate::dex::WalletCredentials;
use crate::error::ConfigError;
use crate::execution::ExecutionMode;
use crate::sync::PoolCacheSettings;
use crate::utils::constants::BPS_DENOMINATOR;

const DEFAULT_POOLS: &str = "GUSDC/GALA,GUSDT/GALA,GALA/GWETH,GWETH/GUSDC";

/// Bot configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `ARB_START_TOKEN`: token every cycle starts and ends with
    pub start_token: Token,
    /// `ARB_START_AMOUNT`: amount sold on the first hop, smallest unit
    pub start_amount: U256,
    /// `ARB_POOLS`: pools to track, as `A/B` pairs separated by commas
    pub pools: Vec<PairKey>,
    /// `ARB_MIN_LIQUIDITY`: both reserves must exceed this for a pool to be used
    pub min_liquidity: U256,
    /// `ARB_POOL_CACHE_TTL_SECONDS`
    pub pool_cache_ttl: Duration,
    /// `ARB_MIN_PROFIT_BPS`
    pub min_profit_bps: u32,
    /// `ARB_PROFIT_BUFFER_BPS`: added to the minimum profit
    pub profit_buffer_bps: u32,
    /// `ARB_DRY_RUN`
    pub dry_run: bool,
    /// `ARB_SCAN_INTERVAL_SECONDS`
    pub scan_interval: Duration,
    /// `ARB_SLIPPAGE_TOLERANCE_BPS`: how far below the quote a hop may settle
    pub slippage_tolerance_bps: u32,
    /// `ARB_MAX_CYCLES_PER_SCAN`: candidate cycles simulated per scan
    pub max_cycles_per_scan: usize,
    /// `ARB_REQUEST_TIMEOUT_SECONDS`: bound on every DEX call
    pub request_timeout: Duration,
    /// `ARB_REFRESH_CONCURRENCY`: parallel reserve requests
    pub refresh_concurrency: usize,
    /// `GALA_USER_ADDR`: trading wallet, required for live trading
    pub user_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_token: Token::new("GUSDC"),
            start_amount: U256::from(100),
            pools: parse_pools(DEFAULT_POOLS).unwrap_or_default(),
            min_liquidity: U256::ZERO,
            pool_cache_ttl: Duration::from_secs(150),
            min_profit_bps: 20,
            profit_buffer_bps: 10,
            dry_run: true,
            scan_interval: Duration::from_secs(15),
            slippage_tolerance_bps: 40,
            max_cycles_per_scan: 12,
            request_timeout: Duration::from_secs(15),
            refresh_concurrency: 4,
            user_address: None,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one
    ///
    /// # Errors
    /// If a variable cannot be parsed or the settings are inconsistent
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for absent or
    /// blank variables
    ///
    /// # Errors
    /// If a variable cannot be parsed or the settings are inconsistent
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let defaults = Self::default();

        let config = Self {
            start_token: get("ARB_START_TOKEN").map_or(defaults.start_token, |symbol| Token::new(&symbol)),
            start_amount: parse(&get, "ARB_START_AMOUNT", defaults.start_amount)?,
            pools: get("ARB_POOLS").map_or(Ok(defaults.pools), |pools| parse_pools(&pools))?,
            min_liquidity: parse(&get, "ARB_MIN_LIQUIDITY", defaults.min_liquidity)?,
            pool_cache_ttl: seconds(&get, "ARB_POOL_CACHE_TTL_SECONDS", defaults.pool_cache_ttl)?,
            min_profit_bps: parse(&get, "ARB_MIN_PROFIT_BPS", defaults.min_profit_bps)?,
            profit_buffer_bps: parse(&get, "ARB_PROFIT_BUFFER_BPS", defaults.profit_buffer_bps)?,
            dry_run: get("ARB_DRY_RUN").map_or(Ok(defaults.dry_run), |value| parse_bool("ARB_DRY_RUN", &value))?,
            scan_interval: seconds(&get, "ARB_SCAN_INTERVAL_SECONDS", defaults.scan_interval)?,
            slippage_tolerance_bps: parse(&get, "ARB_SLIPPAGE_TOLERANCE_BPS", defaults.slippage_tolerance_bps)?,
            max_cycles_per_scan: parse(&get, "ARB_MAX_CYCLES_PER_SCAN", defaults.max_cycles_per_scan)?,
            request_timeout: seconds(&get, "ARB_REQUEST_TIMEOUT_SECONDS", defaults.request_timeout)?,
            refresh_concurrency: parse(&get, "ARB_REFRESH_CONCURRENCY", defaults.refresh_concurrency)?,
            user_address: get("GALA_USER_ADDR"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are consistent
    ///
    /// # Errors
    /// The first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pools.is_empty() {
            return Err(ConfigError::invalid("ARB_POOLS", "", "at least one pool is required"));
        }
        let mut seen = HashSet::new();
        for pair in &self.pools {
            if !seen.insert(pair) {
                return Err(ConfigError::invalid("ARB_POOLS", pair, "pool listed twice"));
            }
        }
        if !self.pools.iter().any(|pair| pair.contains(&self.start_token)) {
            return Err(ConfigError::invalid(
                "ARB_START_TOKEN",
                &self.start_token,
                "no configured pool holds the start token",
            ));
        }
        if self.start_amount.is_zero() {
            return Err(ConfigError::invalid("ARB_START_AMOUNT", self.start_amount, "must be positive"));
        }
        for (key, bps) in [
            ("ARB_MIN_PROFIT_BPS", self.min_profit_bps),
            ("ARB_PROFIT_BUFFER_BPS", self.profit_buffer_bps),
            ("ARB_SLIPPAGE_TOLERANCE_BPS", self.slippage_tolerance_bps),
        ] {
            if u64::from(bps) >= BPS_DENOMINATOR {
                return Err(ConfigError::invalid(key, bps, "must be below 10000 bps"));
            }
        }
        for (key, duration) in [
            ("ARB_POOL_CACHE_TTL_SECONDS", self.pool_cache_ttl),
            ("ARB_SCAN_INTERVAL_SECONDS", self.scan_interval),
            ("ARB_REQUEST_TIMEOUT_SECONDS", self.request_timeout),
        ] {
            if duration.is_zero() {
                return Err(ConfigError::invalid(key, 0, "must be positive"));
            }
        }
        if self.max_cycles_per_scan == 0 {
            return Err(ConfigError::invalid("ARB_MAX_CYCLES_PER_SCAN", 0, "must be positive"));
        }
        if self.refresh_concurrency == 0 {
            return Err(ConfigError::invalid("ARB_REFRESH_CONCURRENCY", 0, "must be positive"));
        }
        if !self.dry_run && self.user_address.is_none() {
            return Err(ConfigError::Missing("GALA_USER_ADDR"));
        }
        Ok(())
    }

    /// Pool cache tuning
    #[must_use]
    pub const fn pool_cache_settings(&self) -> PoolCacheSettings {
        PoolCacheSettings {
            ttl: self.pool_cache_ttl,
            min_liquidity: self.min_liquidity,
            concurrency: self.refresh_concurrency,
            request_timeout: self.request_timeout,
        }
    }

    /// Profit thresholds
    #[must_use]
    pub const fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.min_profit_bps, self.profit_buffer_bps)
    }

    /// Dry run, or live from the configured wallet
    #[must_use]
    pub fn execution_mode(&self) -> ExecutionMode {
        match (&self.user_address, self.dry_run) {
            (Some(user_address), false) => ExecutionMode::Live(WalletCredentials {
                user_address: user_address.clone(),
            }),
            _ => ExecutionMode::DryRun,
        }
    }
}

fn parse<T: FromStr>(get: impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &value, e.to_string())),
        None => Ok(default),
    }
}

fn seconds(
    get: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse(get, key, default.as_secs()).map(Duration::from_secs)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected true or false")),
    }
}

fn parse_pools(pools: &str) -> Result<Vec<PairKey>, ConfigError> {
    pools
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(PairKey::from_str)
        .collect()
}
