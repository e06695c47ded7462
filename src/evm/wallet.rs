//! Origin-chain signing wallet
//!
//! Holds the parsed signer and the RPC endpoint it is bound to. Providers are
//! built per operation with `ProviderBuilder::with_recommended_fillers()` so
//! nonce, gas limit and fees are filled automatically.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use eyre::{Result, WrapErr};
use tracing::info;

use crate::config::Config;

/// Signing client bound to one chain
#[derive(Clone)]
pub struct EvmWallet {
    rpc_url: String,
    chain_id: u64,
    signer: PrivateKeySigner,
}

impl EvmWallet {
    /// Create a wallet from a private key (hex, with or without 0x)
    pub fn new(rpc_url: &str, chain_id: u64, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .wrap_err("Invalid private key")?;

        url::Url::parse(rpc_url).wrap_err("Invalid RPC URL")?;

        info!(
            address = %signer.address(),
            chain_id = chain_id,
            "EVM wallet initialized"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            signer,
        })
    }

    /// Wallet for the origin chain of the configured route
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.origin_rpc_url,
            config.route.origin_chain_id,
            &config.private_key,
        )
    }

    /// Account address of the signer
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Wallet wrapper for alloy providers
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("address", &self.address())
            .finish()
    }
}
