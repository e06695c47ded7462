//! Console reporting
//!
//! Step banners, success/error lines, quote dumps and explorer links, all
//! emitted through `tracing`. Progress events from the bridge client are
//! consumed by [`Reporter::run`], a single loop over the progress channel.

use alloy::primitives::TxHash;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bridge::{BridgeQuote, ProgressEvent, ProgressStep, TxStatus};
use crate::config::ChainInfo;

/// `{explorer}/tx/{hash}`
pub fn explorer_tx_url(chain: &ChainInfo, tx_hash: TxHash) -> String {
    format!("{}/tx/{}", chain.explorer_url, tx_hash)
}

/// Formats and logs run output
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    origin: ChainInfo,
    destination: ChainInfo,
}

impl Reporter {
    pub fn new(origin: ChainInfo, destination: ChainInfo) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Chain a progress step's transaction lives on
    fn chain_for(&self, step: ProgressStep) -> &ChainInfo {
        match step {
            ProgressStep::Approve | ProgressStep::Deposit => &self.origin,
            ProgressStep::Fill => &self.destination,
        }
    }

    pub fn step(&self, number: u32, title: &str) {
        info!("");
        info!("=== Step {}: {} ===", number, title);
    }

    pub fn success(&self, message: &str) {
        info!("✓ {}", message);
    }

    pub fn error(&self, message: &str) {
        error!("✗ {}", message);
    }

    pub fn quote(&self, quote: &BridgeQuote) {
        match serde_json::to_string_pretty(quote) {
            Ok(json) => info!("Bridge quote:\n{}", json),
            Err(e) => warn!(error = %e, "Failed to serialize bridge quote"),
        }
    }

    /// One human-readable line for a progress event
    pub fn describe(&self, event: &ProgressEvent) -> String {
        let step = event.step();
        let chain = self.chain_for(step);

        let status = event.status();
        let link = status.tx_hash().map(|hash| explorer_tx_url(chain, hash));

        let mut line = match (status, link) {
            (TxStatus::Pending { .. }, Some(link)) => {
                format!("{} transaction pending: {}", step, link)
            }
            (TxStatus::Success { .. }, Some(link)) => {
                format!("{} transaction confirmed: {}", step, link)
            }
            (TxStatus::Error { message, .. }, Some(link)) => {
                format!("{} failed: {} ({})", step, message, link)
            }
            (TxStatus::Error { message, .. }, None) => format!("{} failed: {}", step, message),
            (_, None) => format!("{} {:?}", step, status),
        };

        match event {
            ProgressEvent::Deposit {
                deposit_id: Some(id),
                ..
            } => line.push_str(&format!(" [deposit id {}]", id)),
            ProgressEvent::Fill {
                action_success: Some(true),
                ..
            } => line.push_str(" [approve + swap executed]"),
            ProgressEvent::Fill {
                action_success: Some(false),
                ..
            } => line.push_str(" [destination actions failed, tokens sent to fallback recipient]"),
            _ => {}
        }

        line
    }

    pub fn progress(&self, event: &ProgressEvent) {
        let line = self.describe(event);
        match event.status() {
            TxStatus::Pending { .. } => info!("… {}", line),
            TxStatus::Success { .. } => self.success(&line),
            TxStatus::Error { .. } => self.error(&line),
        }
    }

    /// Log progress events until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<ProgressEvent>) {
        while let Some(event) = events.recv().await {
            self.progress(&event);
        }
    }
}
