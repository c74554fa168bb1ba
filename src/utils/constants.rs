/// Denominator of a basis point: 10,000 bps = 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Every triangular cycle has exactly this many hops
pub const CYCLE_HOPS: usize = 3;

/// Default Slack channel for scan and attempt reports
pub const SLACK_CHANNEL: &str = "#galaswap-arb";

/// Slack channel for failed live attempts
pub const SLACK_ERROR_CHANNEL: &str = "#galaswap-arb-errors";
