//! ERC20 Token Helpers
//!
//! Balance reads plus unit formatting. The balance gate of the
//! flow goes through [`BalanceReader`] so it can run against a mock.

use alloy::{
    primitives::{utils::format_units, Address, U256},
    providers::{ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::debug;

use crate::evm::contracts::ERC20;

/// Reads ERC20 balances for an account
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256>;
}

/// Read-only ERC20 client over HTTP JSON-RPC
pub struct Erc20Reader {
    provider: RootProvider<Http<Client>>,
}

impl Erc20Reader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        Ok(Self { provider })
    }
}

#[async_trait]
impl BalanceReader for Erc20Reader {
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let contract = ERC20::new(token, &self.provider);
        let balance = contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance: {}", e))?;

        debug!(token = %token, account = %account, balance = %balance._0, "Token balance");
        Ok(balance._0)
    }
}

/// Convert raw token units to a human-readable amount, trimming trailing zeros
pub fn format_token_amount(raw: U256, decimals: u8) -> String {
    let formatted = match format_units(raw, decimals) {
        Ok(s) => s,
        Err(_) => return raw.to_string(),
    };

    if !formatted.contains('.') {
        return formatted;
    }

    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
