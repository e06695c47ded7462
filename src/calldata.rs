//! ERC20 approve calldata

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use eyre::{eyre, Result};

use crate::evm::contracts::ERC20;

/// ABI-encode `approve(spender, amount)`
pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    ERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Decode calldata produced by [`approve_calldata`] back into `(spender, amount)`
pub fn decode_approve_calldata(data: &[u8]) -> Result<(Address, U256)> {
    let call = ERC20::approveCall::abi_decode(data, true)
        .map_err(|e| eyre!("Not an approve call: {}", e))?;
    Ok((call.spender, call.amount))
}
