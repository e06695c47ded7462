//! EVM Chain Support Module
//!
//! ## Submodules
//!
//! - `contracts` - ERC20, SpokePool and MulticallHandler bindings using alloy sol! macro
//! - `tokens` - ERC20 balance reads and unit formatting
//! - `wallet` - Origin-chain signing wallet

pub mod contracts;
pub mod tokens;
pub mod wallet;

pub use contracts::{Call, Instructions, MulticallHandler, SpokePool, ERC20};
pub use tokens::{BalanceReader, Erc20Reader};
pub use wallet::EvmWallet;
