//! Bridge-and-swap orchestration
//!
//! ```text
//! 1. balance gate    input token balance on the origin chain >= input amount
//! 2. message         approve + swap actions from an initial swap quote
//! 3. bridge quote    output amount fixed, actions re-quoted for it
//! 4. execute         approve → deposit → fill, streamed as progress events
//! ```
//!
//! Nothing is quoted or sent when the balance gate fails.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bridge::{BridgeClient, BridgeQuote, ProgressEvent, QuoteRequest};
use crate::config::{Config, Route, SwapLeg, INPUT_TOKEN_DECIMALS};
use crate::error::BridgeSwapError;
use crate::evm::tokens::{format_token_amount, BalanceReader};
use crate::evm::wallet::EvmWallet;
use crate::message::build_swap_message;
use crate::reporter::Reporter;
use crate::swap::SwapQuoter;

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub quote: BridgeQuote,
}

/// One bridge-and-swap run over injected collaborators
pub struct BridgeSwapFlow {
    route: Route,
    swap: SwapLeg,
    input_amount: U256,
    multicall_handler: Address,
    balances: Arc<dyn BalanceReader>,
    quoter: Arc<dyn SwapQuoter>,
    bridge: Arc<dyn BridgeClient>,
    reporter: Reporter,
}

impl BridgeSwapFlow {
    pub fn new(
        config: &Config,
        balances: Arc<dyn BalanceReader>,
        quoter: Arc<dyn SwapQuoter>,
        bridge: Arc<dyn BridgeClient>,
    ) -> Self {
        Self {
            route: config.route,
            swap: config.swap,
            input_amount: config.input_amount,
            multicall_handler: config.multicall_handler,
            balances,
            quoter,
            bridge,
            reporter: Reporter::new(config.origin, config.destination),
        }
    }

    /// Fail with `InsufficientBalance` unless `account` holds the input amount
    pub async fn check_balance(&self, account: Address) -> Result<U256> {
        let balance = self
            .balances
            .token_balance(self.route.input_token, account)
            .await
            .wrap_err("Failed to read input token balance")?;

        info!(
            account = %account,
            balance = %format_token_amount(balance, INPUT_TOKEN_DECIMALS),
            required = %format_token_amount(self.input_amount, INPUT_TOKEN_DECIMALS),
            "Input token balance"
        );

        if balance < self.input_amount {
            return Err(BridgeSwapError::InsufficientBalance {
                balance,
                required: self.input_amount,
            }
            .into());
        }

        Ok(balance)
    }

    /// Run the whole flow. Progress events go to `progress`, which is dropped on return.
    pub async fn run(
        &self,
        wallet: &EvmWallet,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<FlowOutcome> {
        let user = wallet.address();

        if wallet.chain_id() != self.route.origin_chain_id {
            return Err(BridgeSwapError::invalid(
                "RPC_URL",
                format!(
                    "wallet is bound to chain {}, route starts on chain {}",
                    wallet.chain_id(),
                    self.route.origin_chain_id
                ),
            )
            .into());
        }

        // Failures propagate to the caller, which logs them once
        self.reporter.step(1, "Check balance");
        self.check_balance(user).await?;
        self.reporter.success("Balance covers the input amount");

        self.reporter.step(2, "Build cross-chain message");
        let message = build_swap_message(
            self.quoter.clone(),
            &self.swap,
            self.input_amount,
            user,
            self.multicall_handler,
        )
        .await
        .wrap_err("Failed to build swap message")?;
        self.reporter.success(&format!(
            "{} destination actions, fallback recipient {}",
            message.actions.len(),
            message.fallback_recipient
        ));

        self.reporter.step(3, "Quote bridge");
        let quote = self
            .bridge
            .get_quote(QuoteRequest {
                route: self.route,
                input_amount: self.input_amount,
                depositor: user,
                recipient: self.multicall_handler,
                message,
            })
            .await
            .wrap_err("Failed to get bridge quote")?;
        self.reporter.quote(&quote);

        if quote.deposit.output_amount >= quote.deposit.input_amount {
            warn!(
                input = %quote.deposit.input_amount,
                output = %quote.deposit.output_amount,
                "Quote output is not below input"
            );
        }

        self.reporter.step(4, "Execute bridge");
        self.bridge
            .execute_quote(wallet, &quote.deposit, progress)
            .await
            .wrap_err("Failed to execute bridge deposit")?;

        self.reporter.success("Bridge and swap complete");

        Ok(FlowOutcome { quote })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Deposit;
    use crate::config::ARBITRUM;
    use crate::swap::{SwapCall, SwapRequest};
    use async_trait::async_trait;
    use eyre::eyre;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    struct FixedBalance(U256);

    #[async_trait]
    impl BalanceReader for FixedBalance {
        async fn token_balance(&self, _token: Address, _account: Address) -> Result<U256> {
            Ok(self.0)
        }
    }

    struct NoQuotes;

    #[async_trait]
    impl SwapQuoter for NoQuotes {
        async fn swap_calldata(&self, _request: &SwapRequest) -> Result<SwapCall> {
            Err(eyre!("swap quoter must not be called"))
        }
    }

    struct NoBridge;

    #[async_trait]
    impl BridgeClient for NoBridge {
        async fn get_quote(&self, _request: QuoteRequest) -> Result<BridgeQuote> {
            Err(eyre!("bridge must not be called"))
        }

        async fn execute_quote(
            &self,
            _wallet: &EvmWallet,
            _deposit: &Deposit,
            _progress: mpsc::Sender<ProgressEvent>,
        ) -> Result<()> {
            Err(eyre!("bridge must not be called"))
        }
    }

    fn config() -> Config {
        let vars: HashMap<&str, &str> =
            [("PRIVATE_KEY", TEST_KEY), ("RPC_URL", "http://localhost:8545")]
                .into_iter()
                .collect();
        Config::from_lookup(|name: &str| vars.get(name).map(|v| v.to_string())).unwrap()
    }

    fn flow(balance: U256) -> BridgeSwapFlow {
        BridgeSwapFlow::new(
            &config(),
            Arc::new(FixedBalance(balance)),
            Arc::new(NoQuotes),
            Arc::new(NoBridge),
        )
    }

    #[tokio::test]
    #[traced_test]
    async fn test_balance_failure_is_returned_not_logged() {
        let config = config();
        let wallet = EvmWallet::from_config(&config).unwrap();
        let (tx, _rx) = mpsc::channel(4);

        let err = flow(U256::from(1u64)).run(&wallet, tx).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BridgeSwapError>(),
            Some(BridgeSwapError::InsufficientBalance { .. })
        ));
        assert!(logs_contain("Input token balance"));
        assert!(!logs_contain("Insufficient balance"));
    }

    #[tokio::test]
    async fn test_wallet_on_wrong_chain() {
        let wallet = EvmWallet::new("http://localhost:8545", 8453, TEST_KEY).unwrap();
        let (tx, _rx) = mpsc::channel(4);

        let err = flow(U256::MAX).run(&wallet, tx).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BridgeSwapError>(),
            Some(BridgeSwapError::InvalidConfiguration { name, .. }) if name == "RPC_URL"
        ));
    }

    #[tokio::test]
    async fn test_wallet_on_origin_chain_passes_gate() {
        let wallet = EvmWallet::new("http://localhost:8545", ARBITRUM.chain_id, TEST_KEY).unwrap();
        let (tx, _rx) = mpsc::channel(4);

        // Gate passes, then the quoter refuses
        let err = flow(U256::MAX).run(&wallet, tx).await.unwrap_err();
        assert!(err.downcast_ref::<BridgeSwapError>().is_none());
        assert!(format!("{:#}", err).contains("swap quoter must not be called"));
    }
}
