use async_trait::async_trait;
use eyre::Result;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::Reporter;
use crate::bot::ScanSummary;
use crate::execution::{AttemptReport, AttemptState};
use crate::utils::constants::{SLACK_CHANNEL, SLACK_ERROR_CHANNEL};

/// Slack notifier
#[derive(Debug)]
pub struct SlackNotifier {
    /// The Slack OAuth token
    token: String,
    /// The HTTP client
    client: Client,
}

impl SlackNotifier {
    /// Create a new Slack notifier from `SLACK_OAUTH_TOKEN`
    ///
    /// # Errors
    /// If the token is not set or the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let token = std::env::var("SLACK_OAUTH_TOKEN")
            .map_err(|_| eyre::eyre!("SLACK_OAUTH_TOKEN not set"))?;

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self { token, client })
    }

    /// Send a message to a specific channel
    ///
    /// # Errors
    /// If the request fails or Slack answers with an error
    pub async fn send_to(&self, msg: &str, channel: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": msg,
            "username": "GalaSwap Arb",
            "icon_emoji": ":triangular_ruler:"
        });

        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(eyre::eyre!(
                "Slack API error: {}",
                response["error"].as_str().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }

    /// Send a message to the default channel
    ///
    /// # Errors
    /// See [`SlackNotifier::send_to`]
    pub async fn send(&self, msg: &str) -> Result<()> {
        self.send_to(msg, SLACK_CHANNEL).await
    }

    /// Send an error message to the error channel
    ///
    /// # Errors
    /// See [`SlackNotifier::send_to`]
    pub async fn send_error(&self, error: &str) -> Result<()> {
        self.send_to(&format!(":warning: Error: {error}"), SLACK_ERROR_CHANNEL)
            .await
    }
}

/// Slack text for an attempt report. Failed live attempts lead with the held
/// position.
fn attempt_message(report: &AttemptReport) -> String {
    match &report.state {
        AttemptState::Failed { hop, reason } if !report.dry_run => format!(
            "*HOLDING {} {}* after {} failed at hop {hop} ({reason}). No reversal was attempted.",
            report.held_amount, report.held_token, report.cycle
        ),
        _ => report.to_string(),
    }
}

#[async_trait]
impl Reporter for SlackNotifier {
    async fn scan_completed(&self, _summary: &ScanSummary) {}

    async fn attempt_finished(&self, report: &AttemptReport) {
        let message = attempt_message(report);
        let sent = if matches!(report.state, AttemptState::Failed { .. }) && !report.dry_run {
            self.send_error(&message).await
        } else {
            self.send(&message).await
        };
        if let Err(e) = sent {
            log::error!("notify::slack: failed to post attempt report: {e}");
        }
    }
}
