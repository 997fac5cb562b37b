//! Aggregated error type for the wallet engine and its RPC conversion.

use alloy_primitives::ChainId;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;
use warden_core::{caveat::CaveatError, request::ChainParamsError};
use warden_rpc::{error::RpcError, response::ResponseResult};

pub(crate) type Result<T> = std::result::Result<T, WalletError>;

/// Errors produced while handling a wallet RPC request.
///
/// Every variant maps onto a caller-visible JSON-RPC error; the `Display`
/// output is the message the caller sees.
#[derive(thiserror::Error, Debug)]
pub enum WalletError {
    /// Malformed `wallet_addEthereumChain` / `wallet_switchEthereumChain`
    /// parameters.
    #[error(transparent)]
    ChainParams(#[from] ChainParamsError),
    /// Params failed structural validation; the offending request is echoed
    /// back in the error data.
    #[error("Invalid method parameter(s).")]
    InvalidParamsWithRequest(Value),
    /// A network with this chain id already exists under a different ticker.
    #[error("nativeCurrency.symbol does not match currency symbol for a network the user already has added with the same chainId. Received:\n{0}")]
    TickerMismatch(String),
    /// A second `eth_requestAccounts` arrived while one is in flight for the
    /// same origin.
    #[error("Already processing eth_requestAccounts. Please wait.")]
    RequestAlreadyPending,
    /// `wallet_switchEthereumChain` named a chain the wallet has no network
    /// configuration for.
    #[error("Unrecognized chain ID \"0x{0:x}\". Try adding the chain using wallet_addEthereumChain first.")]
    UnrecognizedChain(ChainId),
    /// A legacy switch/add tried to extend a permission created over the
    /// multichain flow.
    #[error("Cannot switch to or add permissions for chainId '0x{0:x}' because permissions were granted over the Multichain API.")]
    MultichainOriginLockout(ChainId),
    /// The user declined the approval prompt.
    #[error("User rejected the request.")]
    UserRejected,
    /// A legacy grant tried to overwrite a permission created over the
    /// multichain flow.
    #[error("cannot modify permission granted from multichain flow")]
    PermissionConflict,
    /// `wallet_createSession` required scopes the wallet cannot serve.
    #[error("Requested scopes are not supported")]
    UnsupportedRequiredScopes,
    /// Session properties appeared outside the top-level
    /// `sessionProperties` object.
    #[error("Session Properties can only be optional and global")]
    SessionPropertiesPlacement,
    /// `sessionProperties` was present but empty.
    #[error("Invalid sessionProperties requested")]
    InvalidSessionProperties,
    /// A persisted CAIP-25 caveat failed revalidation.
    #[error(transparent)]
    Caveat(#[from] CaveatError),
    /// A pre-shaped RPC error, passed through untouched.
    #[error("Rpc error {0:?}")]
    Rpc(RpcError),
    /// A hook failed in a way the engine cannot interpret.
    #[error("Internal error: {0:?}")]
    Internal(String),
}

impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        Self::Rpc(err)
    }
}

/// Helper trait to easily convert results to rpc results.
pub(crate) trait ToRpcResponseResult {
    fn to_rpc_result(self) -> ResponseResult;
}

/// Converts a serializable value into a [`ResponseResult`].
pub fn to_rpc_result<T: Serialize>(val: T) -> ResponseResult {
    match serde_json::to_value(val) {
        Ok(success) => ResponseResult::Success(success),
        Err(err) => {
            error!(%err, "failed to serialize rpc response");
            ResponseResult::error(RpcError::internal_error())
        }
    }
}

impl<T: Serialize> ToRpcResponseResult for Result<T> {
    fn to_rpc_result(self) -> ResponseResult {
        match self {
            Ok(val) => to_rpc_result(val),
            Err(err) => match err {
                err @ WalletError::ChainParams(_) => RpcError::invalid_params(err.to_string()),
                WalletError::InvalidParamsWithRequest(request) => {
                    RpcError::invalid_params("Invalid method parameter(s).")
                        .with_data(json!({ "request": request }))
                }
                err @ WalletError::TickerMismatch(_) => RpcError::invalid_params(err.to_string()),
                err @ WalletError::RequestAlreadyPending => {
                    RpcError::resource_unavailable(err.to_string())
                }
                err @ WalletError::UnrecognizedChain(_) => {
                    RpcError::unrecognized_chain_id(err.to_string())
                }
                err @ WalletError::MultichainOriginLockout(_) => {
                    RpcError::unauthorized(err.to_string())
                }
                err @ WalletError::UserRejected => RpcError::user_rejected(err.to_string()),
                err @ WalletError::PermissionConflict => {
                    RpcError::internal_error_with(err.to_string())
                }
                err @ WalletError::UnsupportedRequiredScopes => {
                    RpcError::custom(5100, err.to_string())
                }
                err @ WalletError::SessionPropertiesPlacement => {
                    RpcError::custom(5301, err.to_string())
                }
                err @ WalletError::InvalidSessionProperties => {
                    RpcError::custom(5302, err.to_string())
                }
                err @ WalletError::Caveat(_) => RpcError::internal_error_with(err.to_string()),
                WalletError::Rpc(err) => err,
                WalletError::Internal(err) => {
                    error!(%err, "hook failure");
                    RpcError::internal_error_with(err)
                }
            }
            .into(),
        }
    }
}
