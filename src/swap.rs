//! Swap calldata from the Bebop PMM quote API
//!
//! The swap runs on the destination chain inside the MulticallHandler, so the
//! handler is the taker and the user is the receiver of the bought token.
//!
//! ```text
//! GET {base}/{chain}/v3/quote?buy_tokens=..&sell_tokens=..&sell_amounts=..
//!     &taker_address=..&receiver_address=..&approval_type=Standard
//!     &gasless=false&skip_validation=true
//! ```

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::BridgeSwapError;

/// Parameters for one swap quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    /// Receives the bought token
    pub receiver: Address,
    /// Sell amount in raw units
    pub amount: U256,
    pub sell_token: Address,
    pub buy_token: Address,
    /// Executes the swap transaction
    pub taker: Address,
    /// Network name in the API path (e.g. "base")
    pub chain: String,
}

impl SwapRequest {
    /// Same request for a different sell amount
    pub fn with_amount(&self, amount: U256) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

/// Target and calldata of a quoted swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub to: Address,
    pub data: Bytes,
}

/// Source of swap calldata
#[async_trait]
pub trait SwapQuoter: Send + Sync {
    async fn swap_calldata(&self, request: &SwapRequest) -> Result<SwapCall>;
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    tx: Option<QuoteTx>,
}

#[derive(Debug, Deserialize)]
struct QuoteTx {
    to: Address,
    data: Bytes,
}

/// Extract a human-readable message from Bebop's `error` field.
///
/// The API returns either a bare string or `{ "errorCode": .., "message": .. }`.
fn error_message(error: &serde_json::Value) -> Option<String> {
    match error {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => match map.get("message").and_then(|m| m.as_str()) {
            Some(msg) if !msg.trim().is_empty() => Some(msg.to_string()),
            _ => Some(error.to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Bebop PMM v3 quote client
#[derive(Debug, Clone)]
pub struct BebopClient {
    client: Client,
    base_url: String,
}

impl BebopClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("bridge-swap/0.1")
            .build()
            .wrap_err("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn quote_url(&self, chain: &str) -> String {
        format!("{}/{}/v3/quote", self.base_url, chain)
    }
}

#[async_trait]
impl SwapQuoter for BebopClient {
    async fn swap_calldata(&self, request: &SwapRequest) -> Result<SwapCall> {
        let url = self.quote_url(&request.chain);

        debug!(
            url = %url,
            sell_token = %request.sell_token,
            buy_token = %request.buy_token,
            amount = %request.amount,
            "Requesting swap quote"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("buy_tokens", request.buy_token.to_string()),
                ("sell_tokens", request.sell_token.to_string()),
                ("sell_amounts", request.amount.to_string()),
                ("taker_address", request.taker.to_string()),
                ("receiver_address", request.receiver.to_string()),
                ("approval_type", "Standard".to_string()),
                ("gasless", "false".to_string()),
                ("skip_validation", "true".to_string()),
            ])
            .send()
            .await
            .wrap_err("Swap quote request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .wrap_err("Failed to read swap quote response")?;

        let parsed: Option<QuoteResponse> = serde_json::from_str(&body).ok();

        if let Some(message) = parsed
            .as_ref()
            .and_then(|q| q.error.as_ref())
            .and_then(error_message)
        {
            return Err(BridgeSwapError::RemoteQuote { message }.into());
        }

        if !status.is_success() {
            return Err(BridgeSwapError::RemoteQuote {
                message: format!("quote endpoint returned status {}", status),
            }
            .into());
        }

        let tx = parsed
            .and_then(|q| q.tx)
            .ok_or_else(|| eyre!("Swap quote response has no tx field: {}", body))?;

        debug!(to = %tx.to, calldata_len = tx.data.len(), "Received swap quote");

        Ok(SwapCall {
            to: tx.to,
            data: tx.data,
        })
    }
}
