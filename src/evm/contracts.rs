//! Contract ABI definitions
//!
//! Uses alloy's sol! macro to generate bindings for the token, the Across
//! SpokePool on the origin chain, and the MulticallHandler that runs the
//! embedded actions on the destination chain.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// One call executed by the MulticallHandler after a fill
    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address target;
        bytes callData;
        uint256 value;
    }

    /// MulticallHandler message payload
    ///
    /// If any call reverts, the bridged tokens go to `fallbackRecipient`.
    #[derive(Debug, PartialEq, Eq)]
    struct Instructions {
        Call[] calls;
        address fallbackRecipient;
    }

    /// Standard ERC20 interface (subset)
    #[sol(rpc)]
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Across SpokePool (deposit side)
    #[sol(rpc)]
    contract SpokePool {
        /// Deposit with an explicit output amount and destination message
        function depositV3(
            address depositor,
            address recipient,
            address inputToken,
            address outputToken,
            uint256 inputAmount,
            uint256 outputAmount,
            uint256 destinationChainId,
            address exclusiveRelayer,
            uint32 quoteTimestamp,
            uint32 fillDeadline,
            uint32 exclusivityDeadline,
            bytes calldata message
        ) external payable;

        /// Emitted by current SpokePool deployments (bytes32 addresses, uint256 deposit id)
        event FundsDeposited(
            bytes32 inputToken,
            bytes32 outputToken,
            uint256 inputAmount,
            uint256 outputAmount,
            uint256 indexed destinationChainId,
            uint256 indexed depositId,
            uint32 quoteTimestamp,
            uint32 fillDeadline,
            uint32 exclusivityDeadline,
            bytes32 indexed depositor,
            bytes32 recipient,
            bytes32 exclusiveRelayer,
            bytes message
        );

        /// Emitted by pre-upgrade deployments
        event V3FundsDeposited(
            address inputToken,
            address outputToken,
            uint256 inputAmount,
            uint256 outputAmount,
            uint256 indexed destinationChainId,
            uint32 indexed depositId,
            uint32 quoteTimestamp,
            uint32 fillDeadline,
            uint32 exclusivityDeadline,
            address indexed depositor,
            address recipient,
            address exclusiveRelayer,
            bytes message
        );
    }

    /// Across MulticallHandler (destination side)
    #[sol(rpc)]
    contract MulticallHandler {
        event CallsFailed(Call[] calls, address indexed fallbackRecipient);
    }
}
