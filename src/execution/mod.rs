//! # Execution Module
//!
//! Carries out the cycle selected by a scan, hop by hop, and reports where the
//! funds ended up.

/// Runs attempts against the DEX
pub mod coordinator;
/// Attempt state machine and reports
pub mod state;

pub use coordinator::{ExecutionCoordinator, ExecutionMode};
pub use state::{AttemptReport, AttemptState, ExecutionAttempt, HopRecord};
