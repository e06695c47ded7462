//! Across bridge client
//!
//! Quotes through the public Across API and deposits through the origin-chain
//! SpokePool. The fill itself is done by Across relayers; this client only
//! watches for it.
//!
//! # Quote
//!
//! `GET {api}/suggested-fees` is called with the MulticallHandler as recipient
//! and the initial message, so the relay fee accounts for the destination
//! actions. The output amount is `outputAmount` when the API returns one,
//! otherwise `amount - totalRelayFee.total`. The message is then resolved for
//! that output amount.
//!
//! # Execution
//!
//! Uses Alloy's `ProviderBuilder::with_recommended_fillers()` so nonce, gas and
//! fees are filled automatically. After the deposit is mined the client polls
//! `GET {api}/deposit/status` until the deposit is filled, then reads the fill
//! receipt on the destination chain to see whether the handler reported
//! `CallsFailed`.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::Log;
use alloy::transports::http::{Client as RpcClient, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    BridgeClient, BridgeQuote, Deposit, ProgressEvent, QuoteFees, QuoteRequest, TxStatus,
};
use crate::config::Config;
use crate::error::BridgeSwapError;
use crate::evm::contracts::{MulticallHandler, SpokePool, ERC20};
use crate::evm::wallet::EvmWallet;

// ================================
// ACROSS API MODELS
// ================================

/// Across fee breakdown
#[derive(Debug, Clone, Deserialize)]
struct FeeBand {
    total: String,
}

/// Across suggested fees response (fields this client uses)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedFees {
    total_relay_fee: FeeBand,
    #[serde(default)]
    lp_fee: Option<FeeBand>,
    #[serde(deserialize_with = "de_u64")]
    timestamp: u64,
    #[serde(deserialize_with = "de_u64")]
    fill_deadline: u64,
    exclusive_relayer: Address,
    #[serde(deserialize_with = "de_u64")]
    exclusivity_deadline: u64,
    spoke_pool_address: Address,
    #[serde(default)]
    output_amount: Option<String>,
    #[serde(default)]
    is_amount_too_low: bool,
    #[serde(default)]
    estimated_fill_time_sec: Option<u64>,
    #[serde(default)]
    limits: Option<Limits>,
}

/// Across deposit limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Limits {
    min_deposit: String,
}

/// Across deposit status response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositStatusResponse {
    status: String,
    #[serde(default)]
    fill_tx: Option<String>,
}

/// Across error body
#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    message: String,
}

/// Where a deposit stands according to the Across API
#[derive(Debug, Clone, PartialEq, Eq)]
enum FillStatus {
    Pending,
    Filled { fill_tx: TxHash },
    Expired,
}

/// Across numbers arrive either as JSON numbers or as decimal strings
fn de_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn parse_amount(field: &str, raw: &str) -> Result<U256> {
    U256::from_str_radix(raw.trim(), 10).map_err(|e| {
        BridgeSwapError::BridgeQuote {
            reason: format!("invalid {} '{}': {}", field, raw, e),
        }
        .into()
    })
}

fn to_u32(field: &str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        BridgeSwapError::BridgeQuote {
            reason: format!("{} {} does not fit in uint32", field, value),
        }
        .into()
    })
}

/// Output amount the relayer will deliver for `input_amount`
fn output_amount(fees: &SuggestedFees, input_amount: U256) -> Result<U256> {
    if let Some(raw) = &fees.output_amount {
        return parse_amount("outputAmount", raw);
    }

    let total_fee = parse_amount("totalRelayFee.total", &fees.total_relay_fee.total)?;
    input_amount.checked_sub(total_fee).ok_or_else(|| {
        BridgeSwapError::BridgeQuote {
            reason: format!(
                "relay fee {} exceeds input amount {}",
                total_fee, input_amount
            ),
        }
        .into()
    })
}

/// Extract the deposit id from a SpokePool deposit receipt
pub fn deposit_id_from_logs(logs: &[Log], spoke_pool: Address) -> Option<U256> {
    logs.iter()
        .filter(|log| log.address() == spoke_pool)
        .find_map(|log| {
            if let Ok(decoded) = log.log_decode::<SpokePool::FundsDeposited>() {
                return Some(decoded.inner.data.depositId);
            }
            log.log_decode::<SpokePool::V3FundsDeposited>()
                .ok()
                .map(|decoded| U256::from(decoded.inner.data.depositId))
        })
}

/// Whether the handler ran every embedded call (no `CallsFailed` log)
pub fn actions_succeeded(logs: &[Log], handler: Address) -> bool {
    !logs
        .iter()
        .filter(|log| log.address() == handler)
        .any(|log| log.log_decode::<MulticallHandler::CallsFailed>().is_ok())
}

async fn notify(progress: &mpsc::Sender<ProgressEvent>, event: ProgressEvent) {
    if progress.send(event).await.is_err() {
        debug!("Progress receiver closed");
    }
}

/// Across bridge client
pub struct AcrossClient {
    http: Client,
    api_url: String,
    destination: RootProvider<Http<RpcClient>>,
    poll_interval: Duration,
}

impl AcrossClient {
    pub fn new(api_url: &str, destination_rpc_url: &str, poll_interval: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent("bridge-swap/0.1")
            .build()
            .wrap_err("Failed to build HTTP client")?;

        let destination = ProviderBuilder::new().on_http(
            destination_rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid destination RPC URL: {}", e))?,
        );

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            destination,
            poll_interval,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.across_api_url,
            &config.destination_rpc_url,
            Duration::from_millis(config.fill_poll_interval_ms),
        )
    }

    async fn suggested_fees(
        &self,
        request: &QuoteRequest,
        message: &Bytes,
    ) -> Result<SuggestedFees> {
        let url = format!("{}/suggested-fees", self.api_url);

        debug!(
            url = %url,
            origin = request.route.origin_chain_id,
            destination = request.route.destination_chain_id,
            amount = %request.input_amount,
            "Fetching Across quote"
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("inputToken", request.route.input_token.to_string()),
                ("outputToken", request.route.output_token.to_string()),
                ("originChainId", request.route.origin_chain_id.to_string()),
                (
                    "destinationChainId",
                    request.route.destination_chain_id.to_string(),
                ),
                ("amount", request.input_amount.to_string()),
                ("depositor", request.depositor.to_string()),
                ("recipient", request.recipient.to_string()),
                ("message", message.to_string()),
            ])
            .send()
            .await
            .wrap_err("Across quote request failed")?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ApiError>().await {
                Ok(body) => body.message,
                Err(_) => format!("Across quote endpoint returned status {}", status),
            };
            return Err(BridgeSwapError::BridgeQuote { reason }.into());
        }

        response.json().await.map_err(|e| {
            BridgeSwapError::BridgeQuote {
                reason: format!("Failed to parse Across quote response: {}", e),
            }
            .into()
        })
    }

    async fn fill_status(&self, origin_chain_id: u64, deposit_id: U256) -> Result<FillStatus> {
        let url = format!("{}/deposit/status", self.api_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("originChainId", origin_chain_id.to_string()),
                ("depositId", deposit_id.to_string()),
            ])
            .send()
            .await
            .wrap_err("Across deposit status request failed")?;

        // The indexer lags the chain; an unknown deposit is not yet indexed
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FillStatus::Pending);
        }

        let body: DepositStatusResponse = response
            .error_for_status()
            .wrap_err("Across deposit status endpoint failed")?
            .json()
            .await
            .wrap_err("Failed to parse Across deposit status")?;

        match body.status.as_str() {
            "filled" => {
                let raw = body
                    .fill_tx
                    .ok_or_else(|| eyre!("Deposit {} filled without fillTx", deposit_id))?;
                let fill_tx = TxHash::from_str(&raw)
                    .map_err(|e| eyre!("Invalid fillTx '{}': {}", raw, e))?;
                Ok(FillStatus::Filled { fill_tx })
            }
            "expired" | "refunded" => Ok(FillStatus::Expired),
            _ => Ok(FillStatus::Pending),
        }
    }

    /// Poll until the deposit is filled. There is no upper bound on the wait.
    async fn wait_for_fill(&self, origin_chain_id: u64, deposit_id: U256) -> Result<TxHash> {
        let mut polls: u64 = 0;

        loop {
            match self.fill_status(origin_chain_id, deposit_id).await? {
                FillStatus::Filled { fill_tx } => return Ok(fill_tx),
                FillStatus::Expired => {
                    return Err(BridgeSwapError::DepositExpired { deposit_id }.into())
                }
                FillStatus::Pending => {
                    polls += 1;
                    if polls % 12 == 0 {
                        info!(deposit_id = %deposit_id, polls = polls, "Still waiting for fill");
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Inspect the fill receipt on the destination chain
    async fn fill_outcome(&self, fill_tx: TxHash, handler: Address) -> Result<Option<bool>> {
        let receipt = self
            .destination
            .get_transaction_receipt(fill_tx)
            .await
            .map_err(|e| eyre!("Failed to get fill receipt: {}", e))?;

        match receipt {
            Some(receipt) => Ok(Some(actions_succeeded(receipt.inner.logs(), handler))),
            None => {
                warn!(fill_tx = %fill_tx, "Fill receipt not available on destination RPC");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl BridgeClient for AcrossClient {
    async fn get_quote(&self, request: QuoteRequest) -> Result<BridgeQuote> {
        let initial_message = request.message.encode();
        let fees = self.suggested_fees(&request, &initial_message).await?;

        if fees.is_amount_too_low {
            let min = fees
                .limits
                .as_ref()
                .map(|l| l.min_deposit.clone())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(BridgeSwapError::BridgeQuote {
                reason: format!(
                    "amount {} is below minimum deposit of {}",
                    request.input_amount, min
                ),
            }
            .into());
        }

        let output_amount = output_amount(&fees, request.input_amount)?;
        let resolved = request.message.resolve(output_amount).await?;

        info!(
            input_amount = %request.input_amount,
            output_amount = %output_amount,
            relay_fee = %fees.total_relay_fee.total,
            "Across quote received"
        );

        let lp_fee = match &fees.lp_fee {
            Some(band) => parse_amount("lpFee.total", &band.total)?,
            None => U256::ZERO,
        };

        Ok(BridgeQuote {
            deposit: Deposit {
                depositor: request.depositor,
                recipient: request.recipient,
                input_token: request.route.input_token,
                output_token: request.route.output_token,
                input_amount: request.input_amount,
                output_amount,
                origin_chain_id: request.route.origin_chain_id,
                destination_chain_id: request.route.destination_chain_id,
                exclusive_relayer: fees.exclusive_relayer,
                quote_timestamp: to_u32("timestamp", fees.timestamp)?,
                fill_deadline: to_u32("fillDeadline", fees.fill_deadline)?,
                exclusivity_deadline: to_u32("exclusivityDeadline", fees.exclusivity_deadline)?,
                message: resolved.encode(),
                spoke_pool_address: fees.spoke_pool_address,
            },
            fees: QuoteFees {
                total_relay_fee: parse_amount("totalRelayFee.total", &fees.total_relay_fee.total)?,
                lp_fee,
            },
            estimated_fill_time_sec: fees.estimated_fill_time_sec,
        })
    }

    async fn execute_quote(
        &self,
        wallet: &EvmWallet,
        deposit: &Deposit,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<()> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet.ethereum_wallet())
            .on_http(wallet.rpc_url().parse().wrap_err("Invalid RPC URL")?);

        // Step 1: Approve the SpokePool if the allowance is short
        let erc20 = ERC20::new(deposit.input_token, &provider);
        let allowance = erc20
            .allowance(wallet.address(), deposit.spoke_pool_address)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get allowance: {}", e))?
            ._0;

        if allowance < deposit.input_amount {
            let pending = erc20
                .approve(deposit.spoke_pool_address, deposit.input_amount)
                .send()
                .await
                .map_err(|e| eyre!("Failed to send approve: {}", e))?;
            let tx_hash = *pending.tx_hash();
            notify(
                &progress,
                ProgressEvent::Approve {
                    status: TxStatus::Pending { tx_hash },
                },
            )
            .await;

            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| eyre!("Failed to get approve receipt: {}", e))?;

            if !receipt.status() {
                notify(
                    &progress,
                    ProgressEvent::Approve {
                        status: TxStatus::Error {
                            tx_hash: Some(tx_hash),
                            message: "approve reverted".to_string(),
                        },
                    },
                )
                .await;
                return Err(BridgeSwapError::TransactionReverted {
                    step: "approve".to_string(),
                    tx_hash,
                }
                .into());
            }

            notify(
                &progress,
                ProgressEvent::Approve {
                    status: TxStatus::Success { tx_hash },
                },
            )
            .await;
        } else {
            debug!(allowance = %allowance, "Allowance covers input amount, skipping approve");
        }

        // Step 2: Deposit
        let spoke_pool = SpokePool::new(deposit.spoke_pool_address, &provider);
        let pending = spoke_pool
            .depositV3(
                deposit.depositor,
                deposit.recipient,
                deposit.input_token,
                deposit.output_token,
                deposit.input_amount,
                deposit.output_amount,
                U256::from(deposit.destination_chain_id),
                deposit.exclusive_relayer,
                deposit.quote_timestamp,
                deposit.fill_deadline,
                deposit.exclusivity_deadline,
                deposit.message.clone(),
            )
            .send()
            .await
            .map_err(|e| eyre!("Failed to send depositV3: {}", e))?;
        let tx_hash = *pending.tx_hash();
        notify(
            &progress,
            ProgressEvent::Deposit {
                status: TxStatus::Pending { tx_hash },
                deposit_id: None,
            },
        )
        .await;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| eyre!("Failed to get deposit receipt: {}", e))?;

        if !receipt.status() {
            notify(
                &progress,
                ProgressEvent::Deposit {
                    status: TxStatus::Error {
                        tx_hash: Some(tx_hash),
                        message: "depositV3 reverted".to_string(),
                    },
                    deposit_id: None,
                },
            )
            .await;
            return Err(BridgeSwapError::TransactionReverted {
                step: "deposit".to_string(),
                tx_hash,
            }
            .into());
        }

        let deposit_id = deposit_id_from_logs(receipt.inner.logs(), deposit.spoke_pool_address)
            .ok_or_else(|| eyre!("Deposit receipt {} has no FundsDeposited event", tx_hash))?;

        notify(
            &progress,
            ProgressEvent::Deposit {
                status: TxStatus::Success { tx_hash },
                deposit_id: Some(deposit_id),
            },
        )
        .await;

        // Step 3: Wait for the relayer fill on the destination chain
        let fill_tx = match self.wait_for_fill(deposit.origin_chain_id, deposit_id).await {
            Ok(fill_tx) => fill_tx,
            Err(e) => {
                notify(
                    &progress,
                    ProgressEvent::Fill {
                        status: TxStatus::Error {
                            tx_hash: None,
                            message: e.to_string(),
                        },
                        action_success: None,
                    },
                )
                .await;
                return Err(e);
            }
        };

        let action_success = self.fill_outcome(fill_tx, deposit.recipient).await?;

        notify(
            &progress,
            ProgressEvent::Fill {
                status: TxStatus::Success { tx_hash: fill_tx },
                action_success,
            },
        )
        .await;

        Ok(())
    }
}
