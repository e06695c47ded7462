//! Cross-chain message: the actions the MulticallHandler runs after the fill
//!
//! Calldata that depends on the bridged amount cannot be final until the bridge
//! quote fixes the output amount. Each action therefore carries its initial
//! payload (used for fee estimation) and an optional [`CalldataUpdate`] that
//! recomputes the payload once the amount is known. [`CrossChainMessage::resolve`]
//! applies every update and yields a message with static calldata only.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info};

use crate::calldata::approve_calldata;
use crate::config::SwapLeg;
use crate::error::BridgeSwapError;
use crate::evm::contracts::{Call, Instructions};
use crate::swap::{SwapQuoter, SwapRequest};

/// Second phase of an action: regenerate calldata for the actual output amount
#[async_trait]
pub trait CalldataUpdate: Send + Sync {
    async fn recompute(&self, output_amount: U256) -> Result<Bytes>;
}

/// One call executed on the destination chain after the fill
#[derive(Clone)]
pub struct CrossChainAction {
    pub target: Address,
    pub call_data: Bytes,
    pub value: U256,
    pub update: Option<Arc<dyn CalldataUpdate>>,
}

impl fmt::Debug for CrossChainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossChainAction")
            .field("target", &self.target)
            .field("call_data", &self.call_data)
            .field("value", &self.value)
            .field("update", &self.update.is_some())
            .finish()
    }
}

impl CrossChainAction {
    /// Action whose calldata never changes
    pub fn fixed(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            call_data,
            value: U256::ZERO,
            update: None,
        }
    }

    /// Action whose calldata is recomputed once the output amount is known
    pub fn updatable(target: Address, call_data: Bytes, update: Arc<dyn CalldataUpdate>) -> Self {
        Self {
            target,
            call_data,
            value: U256::ZERO,
            update: Some(update),
        }
    }
}

/// Ordered actions plus the address that receives the bridged tokens if any action fails
#[derive(Debug, Clone)]
pub struct CrossChainMessage {
    pub actions: Vec<CrossChainAction>,
    pub fallback_recipient: Address,
}

impl CrossChainMessage {
    /// ABI-encode for the Across MulticallHandler
    pub fn encode(&self) -> Bytes {
        let instructions = Instructions {
            calls: self
                .actions
                .iter()
                .map(|action| Call {
                    target: action.target,
                    callData: action.call_data.clone(),
                    value: action.value,
                })
                .collect(),
            fallbackRecipient: self.fallback_recipient,
        };

        instructions.abi_encode().into()
    }

    /// Apply every action's update for `output_amount`, in order.
    ///
    /// The first failing update aborts the whole message. Resolved actions have
    /// no update left.
    pub async fn resolve(&self, output_amount: U256) -> Result<CrossChainMessage> {
        let mut actions = Vec::with_capacity(self.actions.len());

        for (index, action) in self.actions.iter().enumerate() {
            let call_data = match &action.update {
                Some(update) => update
                    .recompute(output_amount)
                    .await
                    .wrap_err_with(|| format!("Failed to update action {}", index))?,
                None => action.call_data.clone(),
            };

            debug!(
                index = index,
                target = %action.target,
                changed = call_data != action.call_data,
                "Resolved cross-chain action"
            );

            actions.push(CrossChainAction {
                target: action.target,
                call_data,
                value: action.value,
                update: None,
            });
        }

        Ok(CrossChainMessage {
            actions,
            fallback_recipient: self.fallback_recipient,
        })
    }
}

/// Decode a MulticallHandler payload into `(target, calldata, value)` triples and the fallback
pub fn decode_message(data: &[u8]) -> Result<(Vec<(Address, Bytes, U256)>, Address)> {
    let instructions = Instructions::abi_decode(data, true)
        .map_err(|e| eyre!("Invalid multicall message: {}", e))?;

    let calls = instructions
        .calls
        .into_iter()
        .map(|c| (c.target, c.callData, c.value))
        .collect();

    Ok((calls, instructions.fallbackRecipient))
}

/// Re-approves the swap contract for the actual output amount
pub struct ApproveUpdate {
    pub spender: Address,
}

#[async_trait]
impl CalldataUpdate for ApproveUpdate {
    async fn recompute(&self, output_amount: U256) -> Result<Bytes> {
        Ok(approve_calldata(self.spender, output_amount))
    }
}

/// Re-quotes the swap for the actual output amount.
///
/// The new quote must target the same swap contract the approve action was
/// built for; anything else fails with [`BridgeSwapError::ContractMismatch`].
pub struct SwapUpdate {
    pub quoter: Arc<dyn SwapQuoter>,
    pub request: SwapRequest,
    pub expected_contract: Address,
}

#[async_trait]
impl CalldataUpdate for SwapUpdate {
    async fn recompute(&self, output_amount: U256) -> Result<Bytes> {
        let call = self
            .quoter
            .swap_calldata(&self.request.with_amount(output_amount))
            .await?;

        if call.to != self.expected_contract {
            return Err(BridgeSwapError::ContractMismatch {
                expected: self.expected_contract,
                actual: call.to,
            }
            .into());
        }

        Ok(call.data)
    }
}

/// Build the approve + swap message for the destination leg.
///
/// Quotes the swap once for `input_amount` to learn the swap contract and a
/// representative calldata. The bridge fee is not known yet, so both actions
/// carry updates that are applied when the bridge quote resolves the message.
pub async fn build_swap_message(
    quoter: Arc<dyn SwapQuoter>,
    leg: &SwapLeg,
    input_amount: U256,
    user: Address,
    handler: Address,
) -> Result<CrossChainMessage> {
    let request = SwapRequest {
        receiver: user,
        amount: input_amount,
        sell_token: leg.sell_token,
        buy_token: leg.buy_token,
        taker: handler,
        chain: leg.chain_name.to_string(),
    };

    let initial = quoter.swap_calldata(&request).await?;

    info!(
        swap_contract = %initial.to,
        chain = %leg.chain_name,
        "Swap contract discovered"
    );

    let approve = CrossChainAction::updatable(
        leg.sell_token,
        approve_calldata(initial.to, input_amount),
        Arc::new(ApproveUpdate {
            spender: initial.to,
        }),
    );

    let swap = CrossChainAction::updatable(
        initial.to,
        initial.data,
        Arc::new(SwapUpdate {
            quoter,
            request,
            expected_contract: initial.to,
        }),
    );

    Ok(CrossChainMessage {
        actions: vec![approve, swap],
        fallback_recipient: user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calldata::decode_approve_calldata;
    use crate::swap::SwapCall;
    use alloy::primitives::address;
    use std::sync::Mutex;

    const USER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const HANDLER: Address = address!("924a9f036260DdD5808007E1AA95f08eD08aA569");
    const SWAP_A: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const SWAP_B: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn leg() -> SwapLeg {
        SwapLeg {
            sell_token: address!("4200000000000000000000000000000000000006"),
            buy_token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            chain_name: "base",
        }
    }

    /// Returns queued responses in order and records requested amounts
    struct ScriptedQuoter {
        responses: Mutex<Vec<SwapCall>>,
        amounts: Mutex<Vec<U256>>,
    }

    impl ScriptedQuoter {
        fn new(responses: Vec<SwapCall>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                amounts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SwapQuoter for ScriptedQuoter {
        async fn swap_calldata(&self, request: &SwapRequest) -> Result<SwapCall> {
            self.amounts.lock().unwrap().push(request.amount);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(eyre!("no scripted response"));
            }
            Ok(responses.remove(0))
        }
    }

    fn call(to: Address, data: &[u8]) -> SwapCall {
        SwapCall {
            to,
            data: Bytes::copy_from_slice(data),
        }
    }

    #[tokio::test]
    async fn test_build_swap_message() {
        let quoter = ScriptedQuoter::new(vec![call(SWAP_A, &[0x01])]);
        let input = U256::from(3_000_000_000_000_000u64);

        let message = build_swap_message(quoter.clone(), &leg(), input, USER, HANDLER)
            .await
            .unwrap();

        assert_eq!(message.actions.len(), 2);
        assert_eq!(message.fallback_recipient, USER);

        let approve = &message.actions[0];
        assert_eq!(approve.target, leg().sell_token);
        assert_eq!(
            decode_approve_calldata(&approve.call_data).unwrap(),
            (SWAP_A, input)
        );

        let swap = &message.actions[1];
        assert_eq!(swap.target, SWAP_A);
        assert_eq!(swap.call_data, Bytes::from(vec![0x01]));
        assert!(swap.update.is_some());

        assert_eq!(*quoter.amounts.lock().unwrap(), vec![input]);
    }

    #[tokio::test]
    async fn test_resolve_applies_updates() {
        let quoter = ScriptedQuoter::new(vec![call(SWAP_A, &[0x01]), call(SWAP_A, &[0x02])]);
        let input = U256::from(3_000_000_000_000_000u64);
        let output = U256::from(2_990_000_000_000_000u64);

        let message = build_swap_message(quoter.clone(), &leg(), input, USER, HANDLER)
            .await
            .unwrap();
        let resolved = message.resolve(output).await.unwrap();

        assert_eq!(
            decode_approve_calldata(&resolved.actions[0].call_data).unwrap(),
            (SWAP_A, output)
        );
        assert_eq!(resolved.actions[1].call_data, Bytes::from(vec![0x02]));
        assert!(resolved.actions.iter().all(|a| a.update.is_none()));
        assert_eq!(*quoter.amounts.lock().unwrap(), vec![input, output]);
    }

    #[tokio::test]
    async fn test_contract_mismatch() {
        let quoter = ScriptedQuoter::new(vec![call(SWAP_A, &[0x01]), call(SWAP_B, &[0x02])]);

        let message = build_swap_message(
            quoter,
            &leg(),
            U256::from(1_000u64),
            USER,
            HANDLER,
        )
        .await
        .unwrap();

        let update = message.actions[1].update.clone().unwrap();
        let err = update.recompute(U256::from(900u64)).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<BridgeSwapError>(),
            Some(&BridgeSwapError::ContractMismatch {
                expected: SWAP_A,
                actual: SWAP_B,
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_propagates_update_failure() {
        let quoter = ScriptedQuoter::new(vec![call(SWAP_A, &[0x01]), call(SWAP_B, &[0x02])]);

        let message = build_swap_message(quoter, &leg(), U256::from(1_000u64), USER, HANDLER)
            .await
            .unwrap();

        let err = message.resolve(U256::from(900u64)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeSwapError>(),
            Some(BridgeSwapError::ContractMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_initial_quote_failure() {
        let quoter = ScriptedQuoter::new(vec![]);
        let result = build_swap_message(quoter, &leg(), U256::from(1u64), USER, HANDLER).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_decode_message() {
        let message = CrossChainMessage {
            actions: vec![
                CrossChainAction::fixed(SWAP_A, approve_calldata(SWAP_B, U256::from(5u64))),
                CrossChainAction::fixed(SWAP_B, Bytes::from(vec![0xde, 0xad])),
            ],
            fallback_recipient: USER,
        };

        let (calls, fallback) = decode_message(&message.encode()).unwrap();
        assert_eq!(fallback, USER);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, SWAP_A);
        assert_eq!(calls[1], (SWAP_B, Bytes::from(vec![0xde, 0xad]), U256::ZERO));
    }

    #[test]
    fn test_encoding_has_tuple_offset() {
        let message = CrossChainMessage {
            actions: vec![],
            fallback_recipient: USER,
        };
        let encoded = message.encode();

        // Single dynamic tuple parameter: first word is the offset to it
        assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(32u64));
    }
}
