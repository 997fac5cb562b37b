//! Scope support decisions and approval seeding for `wallet_createSession`.

use crate::{
    error::Result,
    hooks::{NetworkHooks, PermissionApprovalRequest},
};
use alloy_primitives::Address;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use warden_core::{
    adapters,
    caip::{EIP155_NAMESPACE, ScopeString, WALLET_NAMESPACE},
    caveat::Caip25CaveatValue,
    scope::ScopesMap,
};

/// Requested scopes split by whether this wallet can serve them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct BucketedScopes {
    pub(crate) supported: ScopesMap,
    pub(crate) unsupported: Vec<ScopeString>,
}

/// Splits normalized scopes into supported and unsupported buckets.
///
/// EVM chain scopes are supported only when the wallet has a network
/// configuration for the chain; order within each bucket follows the
/// request.
pub(crate) async fn bucket_scopes(
    network: &dyn NetworkHooks,
    scopes: ScopesMap,
) -> Result<BucketedScopes> {
    let mut buckets = BucketedScopes::default();
    for (scope, object) in scopes {
        if is_supported_scope(network, &scope).await? {
            buckets.supported.insert(scope, object);
        } else {
            buckets.unsupported.push(scope);
        }
    }
    Ok(buckets)
}

async fn is_supported_scope(network: &dyn NetworkHooks, scope: &ScopeString) -> Result<bool> {
    Ok(match scope {
        ScopeString::Namespace(namespace) => {
            namespace == WALLET_NAMESPACE || namespace == EIP155_NAMESPACE
        }
        ScopeString::Chain(chain) if chain.namespace() == WALLET_NAMESPACE => {
            scope.is_wallet_eip155()
        }
        ScopeString::Chain(chain) => match chain.eth_chain_id() {
            Some(chain_id) => network.network_configuration_by_chain_id(chain_id).await?.is_some(),
            None => false,
        },
    })
}

/// Seeds the connection prompt for a session request: the EVM accounts named
/// by the supported scopes that actually exist in the wallet, and the EVM
/// chains the supported scopes cover.
pub(crate) fn session_approval_request(
    origin: &str,
    supported_required: &ScopesMap,
    supported_optional: &ScopesMap,
    wallet_accounts: &[Address],
) -> PermissionApprovalRequest {
    let value = Caip25CaveatValue {
        required_scopes: supported_required.clone(),
        optional_scopes: supported_optional.clone(),
        is_multichain_origin: true,
    };
    let requested_accounts = adapters::get_eth_accounts(&value)
        .into_iter()
        .filter(|account| wallet_accounts.contains(account))
        .collect();
    let requested_chain_ids = adapters::get_permitted_eth_chain_ids(&value);
    PermissionApprovalRequest {
        origin: origin.to_string(),
        requested_accounts,
        requested_chain_ids,
    }
}

/// Result of `wallet_createSession` and `wallet_getSession`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// The granted scopes, required and optional merged into one view.
    pub session_scopes: ScopesMap,
    /// Echo of the requested session properties, on creation only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_properties: Option<IndexMap<String, Value>>,
}
