//! Bridge client interface
//!
//! The flow consumes a bridge through two operations:
//!
//! 1. `get_quote` - price the route for an input amount and a cross-chain
//!    message, fix the output amount, and return a deposit ready to submit
//! 2. `execute_quote` - submit that deposit and report each stage on the
//!    progress channel until the destination fill is observed
//!
//! # Progress
//!
//! ```text
//! Approve  (skipped when the allowance already covers the input)
//!    ↓
//! Deposit  → deposit id
//!    ↓
//! Fill     → whether the embedded actions succeeded
//! ```

pub mod across;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use eyre::Result;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::Route;
use crate::evm::wallet::EvmWallet;
use crate::message::CrossChainMessage;

pub use across::AcrossClient;

/// Capacity of the progress channel between bridge client and reporter
pub const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// Input to `get_quote`
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub route: Route,
    pub input_amount: U256,
    pub depositor: Address,
    /// Destination contract that receives the output and runs the message
    pub recipient: Address,
    pub message: CrossChainMessage,
}

/// Everything needed to submit a SpokePool deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub depositor: Address,
    /// MulticallHandler that receives the output and runs the message
    pub recipient: Address,
    pub input_token: Address,
    pub output_token: Address,
    pub input_amount: U256,
    pub output_amount: U256,
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub exclusive_relayer: Address,
    pub quote_timestamp: u32,
    pub fill_deadline: u32,
    pub exclusivity_deadline: u32,
    pub message: Bytes,
    pub spoke_pool_address: Address,
}

/// Fees the bridge charges for this deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFees {
    pub total_relay_fee: U256,
    pub lp_fee: U256,
}

/// Result of `get_quote`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeQuote {
    pub deposit: Deposit,
    pub fees: QuoteFees,
    pub estimated_fill_time_sec: Option<u64>,
}

/// Transaction state within one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending { tx_hash: TxHash },
    Success { tx_hash: TxHash },
    Error {
        tx_hash: Option<TxHash>,
        message: String,
    },
}

impl TxStatus {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxStatus::Pending { tx_hash } | TxStatus::Success { tx_hash } => Some(*tx_hash),
            TxStatus::Error { tx_hash, .. } => *tx_hash,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Success { .. })
    }
}

/// Progress stage reported by `execute_quote`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Origin-chain token approval for the SpokePool
    Approve { status: TxStatus },
    /// Origin-chain deposit; the id is set once the deposit is mined
    Deposit {
        status: TxStatus,
        deposit_id: Option<U256>,
    },
    /// Destination-chain fill; `action_success` is set once the fill is mined
    Fill {
        status: TxStatus,
        action_success: Option<bool>,
    },
}

impl ProgressEvent {
    pub fn step(&self) -> ProgressStep {
        match self {
            ProgressEvent::Approve { .. } => ProgressStep::Approve,
            ProgressEvent::Deposit { .. } => ProgressStep::Deposit,
            ProgressEvent::Fill { .. } => ProgressStep::Fill,
        }
    }

    pub fn status(&self) -> &TxStatus {
        match self {
            ProgressEvent::Approve { status }
            | ProgressEvent::Deposit { status, .. }
            | ProgressEvent::Fill { status, .. } => status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    Approve,
    Deposit,
    Fill,
}

impl std::fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStep::Approve => write!(f, "approve"),
            ProgressStep::Deposit => write!(f, "deposit"),
            ProgressStep::Fill => write!(f, "fill"),
        }
    }
}

/// Cross-chain bridge client
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Price the route and resolve the message for the bridged output amount
    async fn get_quote(&self, request: QuoteRequest) -> Result<BridgeQuote>;

    /// Submit the deposit and report progress until the fill is observed.
    ///
    /// A closed progress channel does not abort execution.
    async fn execute_quote(
        &self,
        wallet: &EvmWallet,
        deposit: &Deposit,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_accessors() {
        let hash = TxHash::repeat_byte(0x11);
        let event = ProgressEvent::Deposit {
            status: TxStatus::Success { tx_hash: hash },
            deposit_id: Some(U256::from(7u64)),
        };

        assert_eq!(event.step(), ProgressStep::Deposit);
        assert!(event.status().is_success());
        assert_eq!(event.status().tx_hash(), Some(hash));
        assert_eq!(event.step().to_string(), "deposit");

        let error = TxStatus::Error {
            tx_hash: None,
            message: "reverted".to_string(),
        };
        assert!(!error.is_success());
        assert_eq!(error.tx_hash(), None);
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let quote = BridgeQuote {
            deposit: Deposit {
                depositor: Address::ZERO,
                recipient: Address::ZERO,
                input_token: Address::ZERO,
                output_token: Address::ZERO,
                input_amount: U256::from(100u64),
                output_amount: U256::from(99u64),
                origin_chain_id: 42161,
                destination_chain_id: 8453,
                exclusive_relayer: Address::ZERO,
                quote_timestamp: 1,
                fill_deadline: 2,
                exclusivity_deadline: 0,
                message: Bytes::new(),
                spoke_pool_address: Address::ZERO,
            },
            fees: QuoteFees {
                total_relay_fee: U256::from(1u64),
                lp_fee: U256::ZERO,
            },
            estimated_fill_time_sec: Some(2),
        };

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["deposit"]["originChainId"], 42161);
        assert_eq!(json["deposit"]["fillDeadline"], 2);
        assert_eq!(json["estimatedFillTimeSec"], 2);
        assert!(json["fees"]["totalRelayFee"].is_string());
    }
}
