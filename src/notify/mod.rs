//! # Notify Module
//!
//! Reporting surface of the bot: a summary after every scan and a report after
//! every execution attempt.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::ScanSummary;
use crate::execution::AttemptReport;

/// Slack notifications
pub mod slack;

pub use slack::SlackNotifier;

/// Receives what the bot did. Implementations must not fail the scan: delivery
/// errors are theirs to log.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Called once per scan, after any execution finished
    async fn scan_completed(&self, summary: &ScanSummary);

    /// Called once per execution attempt, dry or live, once it is terminal
    async fn attempt_finished(&self, report: &AttemptReport);
}

/// Writes reports to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn scan_completed(&self, summary: &ScanSummary) {
        log::info!("bot: {summary}");
    }

    async fn attempt_finished(&self, report: &AttemptReport) {
        match serde_json::to_string(report) {
            Ok(json) => log::debug!("bot: attempt report {json}"),
            Err(e) => log::warn!("bot: cannot serialize attempt report: {e}"),
        }
    }
}

/// Forwards every report to several reporters, in order
#[derive(Default, Clone)]
pub struct Reporters(Vec<Arc<dyn Reporter>>);

impl Reporters {
    /// No reporter at all
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reporter
    #[must_use]
    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.0.push(reporter);
        self
    }

    /// Number of reporters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there is no reporter
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
impl Reporter for Reporters {
    async fn scan_completed(&self, summary: &ScanSummary) {
        for reporter in &self.0 {
            reporter.scan_completed(summary).await;
        }
    }

    async fn attempt_finished(&self, report: &AttemptReport) {
        for reporter in &self.0 {
            reporter.attempt_finished(report).await;
        }
    }
}

/// Keeps every report, for tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingReporter {
    pub scans: std::sync::Mutex<Vec<ScanSummary>>,
    pub attempts: std::sync::Mutex<Vec<AttemptReport>>,
}

#[cfg(test)]
#[async_trait]
impl Reporter for RecordingReporter {
    async fn scan_completed(&self, summary: &ScanSummary) {
        if let Ok(mut scans) = self.scans.lock() {
            scans.push(summary.clone());
        }
    }

    async fn attempt_finished(&self, report: &AttemptReport) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(report.clone());
        }
    }
}
