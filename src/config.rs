//! Run configuration
//!
//! Everything the flow needs is resolved here once, up front. `PRIVATE_KEY` and
//! `RPC_URL` are required; the rest fall back to the Arbitrum → Base WETH route
//! and the public Across/Bebop endpoints.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{address, Address, U256};
use eyre::Result;
use std::env;
use std::fmt;

use crate::error::BridgeSwapError;

/// Public metadata for a chain the route touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    /// Native EVM chain ID
    pub chain_id: u64,
    /// Network name as the swap API spells it
    pub name: &'static str,
    /// Block explorer base URL (no trailing slash)
    pub explorer_url: &'static str,
}

pub const ARBITRUM: ChainInfo = ChainInfo {
    chain_id: 42161,
    name: "arbitrum",
    explorer_url: "https://arbiscan.io",
};

pub const BASE: ChainInfo = ChainInfo {
    chain_id: 8453,
    name: "base",
    explorer_url: "https://basescan.org",
};

pub const ARBITRUM_WETH: Address = address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1");
pub const BASE_WETH: Address = address!("4200000000000000000000000000000000000006");
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// Across MulticallHandler, deployed at the same address on every supported chain
pub const DEFAULT_MULTICALL_HANDLER: Address =
    address!("924a9f036260DdD5808007E1AA95f08eD08aA569");

pub const DEFAULT_DESTINATION_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_ACROSS_API_URL: &str = "https://app.across.to/api";
pub const DEFAULT_BEBOP_API_URL: &str = "https://api.bebop.xyz/pmm";
pub const DEFAULT_INPUT_AMOUNT: &str = "0.003";
pub const DEFAULT_FILL_POLL_INTERVAL_MS: u64 = 5000;

/// WETH decimals on both ends of the route
pub const INPUT_TOKEN_DECIMALS: u8 = 18;

/// Bridge route: which token leaves which chain and what arrives where
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub origin_chain_id: u64,
    pub destination_chain_id: u64,
    pub input_token: Address,
    pub output_token: Address,
}

/// Swap executed on the destination chain after the fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapLeg {
    /// Token the bridge delivers (sold)
    pub sell_token: Address,
    /// Token the user ends up with (bought)
    pub buy_token: Address,
    /// Destination chain name for the quoting API
    pub chain_name: &'static str,
}

/// Bridge-and-swap configuration
#[derive(Clone)]
pub struct Config {
    /// Origin-chain signing key (hex, with or without 0x)
    pub private_key: String,
    /// Origin-chain RPC URL
    pub origin_rpc_url: String,
    /// Destination-chain RPC URL (read-only, used to inspect the fill)
    pub destination_rpc_url: String,

    pub origin: ChainInfo,
    pub destination: ChainInfo,
    pub route: Route,
    pub swap: SwapLeg,

    /// Amount of the input token to bridge, in raw units
    pub input_amount: U256,

    /// Across API base URL
    pub across_api_url: String,
    /// Bebop PMM API base URL
    pub bebop_api_url: String,
    /// Destination-chain contract that executes the embedded actions
    pub multicall_handler: Address,

    /// Poll interval for the fill status in milliseconds
    pub fill_poll_interval_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("private_key", &"<redacted>")
            .field("origin_rpc_url", &self.origin_rpc_url)
            .field("destination_rpc_url", &self.destination_rpc_url)
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("route", &self.route)
            .field("swap", &self.swap)
            .field("input_amount", &self.input_amount)
            .field("across_api_url", &self.across_api_url)
            .field("bebop_api_url", &self.bebop_api_url)
            .field("multicall_handler", &self.multicall_handler)
            .field("fill_poll_interval_ms", &self.fill_poll_interval_ms)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        Self::from_env()
    }

    /// Build configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| var(name).ok_or_else(|| BridgeSwapError::missing(name));

        let private_key = required("PRIVATE_KEY")?;
        let origin_rpc_url = parse_url("RPC_URL", required("RPC_URL")?)?;

        let destination_rpc_url = parse_url(
            "DESTINATION_RPC_URL",
            var("DESTINATION_RPC_URL")
                .unwrap_or_else(|| DEFAULT_DESTINATION_RPC_URL.to_string()),
        )?;
        let across_api_url = parse_url(
            "ACROSS_API_URL",
            var("ACROSS_API_URL").unwrap_or_else(|| DEFAULT_ACROSS_API_URL.to_string()),
        )?;
        let bebop_api_url = parse_url(
            "BEBOP_API_URL",
            var("BEBOP_API_URL").unwrap_or_else(|| DEFAULT_BEBOP_API_URL.to_string()),
        )?;

        let input_amount = parse_input_amount(
            &var("INPUT_AMOUNT").unwrap_or_else(|| DEFAULT_INPUT_AMOUNT.to_string()),
        )?;

        let multicall_handler = match var("MULTICALL_HANDLER_ADDRESS") {
            Some(raw) => raw
                .parse::<Address>()
                .map_err(|e| BridgeSwapError::invalid("MULTICALL_HANDLER_ADDRESS", e))?,
            None => DEFAULT_MULTICALL_HANDLER,
        };

        let fill_poll_interval_ms = match var("FILL_POLL_INTERVAL_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| BridgeSwapError::invalid("FILL_POLL_INTERVAL_MS", e))?,
            None => DEFAULT_FILL_POLL_INTERVAL_MS,
        };

        Ok(Self {
            private_key,
            origin_rpc_url,
            destination_rpc_url,
            origin: ARBITRUM,
            destination: BASE,
            route: Route {
                origin_chain_id: ARBITRUM.chain_id,
                destination_chain_id: BASE.chain_id,
                input_token: ARBITRUM_WETH,
                output_token: BASE_WETH,
            },
            swap: SwapLeg {
                sell_token: BASE_WETH,
                buy_token: BASE_USDC,
                chain_name: BASE.name,
            },
            input_amount,
            across_api_url,
            bebop_api_url,
            multicall_handler,
            fill_poll_interval_ms,
        })
    }

    /// Input amount formatted in whole tokens (e.g. "0.003")
    pub fn input_amount_display(&self) -> String {
        format_units(self.input_amount, INPUT_TOKEN_DECIMALS)
            .unwrap_or_else(|_| self.input_amount.to_string())
    }
}

/// Validate a URL and return it without a trailing slash
fn parse_url(name: &str, raw: String) -> Result<String> {
    url::Url::parse(&raw).map_err(|e| BridgeSwapError::invalid(name, e))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Parse a decimal token amount ("0.003") into raw units
fn parse_input_amount(raw: &str) -> Result<U256> {
    let amount = parse_units(raw, INPUT_TOKEN_DECIMALS)
        .map_err(|e| BridgeSwapError::invalid("INPUT_AMOUNT", e))?
        .get_absolute();

    if amount.is_zero() {
        return Err(BridgeSwapError::invalid("INPUT_AMOUNT", "must be greater than zero").into());
    }

    Ok(amount)
}
