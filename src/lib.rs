//! Bridge and swap - Library interface
//!
//! Bridges WETH from Arbitrum to Base through Across and swaps it to USDC on
//! arrival. The swap runs inside the Across MulticallHandler as an
//! approve + swap message whose calldata is re-quoted once the bridge fixes the
//! delivered amount.

pub mod bridge;
pub mod calldata;
pub mod config;
pub mod error;
pub mod evm;
pub mod flow;
pub mod message;
pub mod reporter;
pub mod swap;

pub use config::Config;
pub use error::BridgeSwapError;
pub use flow::{BridgeSwapFlow, FlowOutcome};
