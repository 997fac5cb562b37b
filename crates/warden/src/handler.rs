//! Raw JSON-RPC entry point.
//!
//! Hosts that receive wire-level method calls feed them through
//! [`handle_request`]; hosts with their own dispatch call
//! [`WalletApi::execute`] directly.

use crate::api::WalletApi;
use serde_json::{Value, json};
use tracing::{error, trace};
use warden_core::request::WalletRequest;
use warden_rpc::{
    error::RpcError,
    request::RpcMethodCall,
    response::{ResponseResult, RpcResponse},
};

/// Handles a JSON-RPC method call for `origin`, echoing the call's id in
/// the response.
pub async fn handle_request(api: &WalletApi, origin: &str, call: RpcMethodCall) -> RpcResponse {
    let id = call.id();
    let result = execute_method_call(api, origin, call).await;
    RpcResponse::new(id, result)
}

/// Parses the call into a [`WalletRequest`] and executes it.
///
/// A method name outside the wallet surface is `MethodNotFound`; a known
/// method with malformed params is `InvalidParams`.
async fn execute_method_call(
    api: &WalletApi,
    origin: &str,
    call: RpcMethodCall,
) -> ResponseResult {
    trace!(target: "rpc", method = %call.method, %origin, "received method call");
    let RpcMethodCall { method, params, .. } = call;
    let params: Value = params.into();
    let call = json!({ "method": method, "params": params });

    match serde_json::from_value::<WalletRequest>(call) {
        Ok(request) => api.execute(origin, request).await,
        Err(err) => {
            let err = err.to_string();
            if err.contains("unknown variant") {
                error!(target: "rpc", ?method, "failed to deserialize method due to unknown variant");
                RpcError::method_not_found()
            } else {
                error!(target: "rpc", ?method, ?err, "failed to deserialize method");
                RpcError::invalid_params(err)
            }
            .into()
        }
    }
}
