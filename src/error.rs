//! Classified failures of a bridge-and-swap run
//!
//! Anything not listed here (RPC transport, signer, HTTP plumbing) travels as a
//! plain `eyre::Report` with context attached at the call site. Callers that need
//! to branch on a failure kind use `report.downcast_ref::<BridgeSwapError>()`.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

/// Errors with a known cause
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeSwapError {
    #[error("Missing required configuration: {name}")]
    MissingConfiguration { name: String },

    #[error("Invalid configuration {name}: {reason}")]
    InvalidConfiguration { name: String, reason: String },

    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: U256, required: U256 },

    #[error("Swap quote error: {message}")]
    RemoteQuote { message: String },

    #[error("Swap contract changed between quotes: expected {expected}, got {actual}")]
    ContractMismatch { expected: Address, actual: Address },

    #[error("Bridge quote rejected: {reason}")]
    BridgeQuote { reason: String },

    #[error("{step} transaction {tx_hash} reverted")]
    TransactionReverted { step: String, tx_hash: TxHash },

    #[error("Deposit {deposit_id} expired before it was filled")]
    DepositExpired { deposit_id: U256 },
}

impl BridgeSwapError {
    pub fn missing(name: &str) -> Self {
        Self::MissingConfiguration {
            name: name.to_string(),
        }
    }

    pub fn invalid(name: &str, reason: impl ToString) -> Self {
        Self::InvalidConfiguration {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
