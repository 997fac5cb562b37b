//! The CAIP-25 caveat, the single per-origin permission record.
//!
//! One permission (`endowment:caip25`) with one caveat (`authorizedScopes`)
//! replaces the legacy `eth_accounts` and `endowment:permitted-chains`
//! permissions. The caveat value stores the origin's required and optional
//! scopes plus a flag recording which flow granted it; everything the legacy
//! surface reports is derived from this record through the adapters.

use crate::{
    caip::ScopeString,
    scope::{ScopesMap, merge_scopes},
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the CAIP-25 permission.
pub const CAIP25_PERMISSION_NAME: &str = "endowment:caip25";

/// Type of the caveat holding the authorized scopes.
pub const CAIP25_CAVEAT_TYPE: &str = "authorizedScopes";

/// Name of the legacy accounts permission the wallet still reports.
pub const ETH_ACCOUNTS_PERMISSION: &str = "eth_accounts";

/// Name of the legacy permitted-chains permission the wallet still reports.
pub const PERMITTED_CHAINS_PERMISSION: &str = "endowment:permitted-chains";

/// Caveat type restricting the accounts returned for `eth_accounts`.
pub const RESTRICT_ACCOUNTS_CAVEAT: &str = "restrictReturnedAccounts";

/// Caveat type restricting the chains an origin may switch to.
pub const RESTRICT_CHAINS_CAVEAT: &str = "restrictNetworkSwitching";

/// Value of the CAIP-25 caveat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Caip25CaveatValue {
    /// Scopes the caller declared it cannot work without.
    pub required_scopes: ScopesMap,
    /// Scopes the caller can work with but does not require.
    pub optional_scopes: ScopesMap,
    /// Whether the grant came from the multichain authorization flow.
    ///
    /// Set once at grant time. A `true` value forbids the legacy
    /// single-chain affordances from growing the grant later.
    pub is_multichain_origin: bool,
}

impl Caip25CaveatValue {
    /// The merged view over required and optional scopes, required first.
    pub fn session_scopes(&self) -> ScopesMap {
        merge_scopes(&self.required_scopes, &self.optional_scopes)
    }

    /// Whether the caveat grants nothing at all.
    pub fn is_empty(&self) -> bool {
        self.required_scopes.is_empty() && self.optional_scopes.is_empty()
    }
}

/// Error produced when a stored caveat value fails validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
    "endowment:caip25 error: received invalid value for caveat of type \"authorizedScopes\": {reason}"
)]
pub struct CaveatError {
    reason: String,
}

/// Validates a raw caveat value as stored by a host's permission layer.
///
/// The value must carry exactly `requiredScopes`, `optionalScopes`, and
/// `isMultichainOrigin`, with every scope entry well-formed.
pub fn validate_caveat_value(value: &Value) -> Result<Caip25CaveatValue, CaveatError> {
    serde_json::from_value(value.clone()).map_err(|err| CaveatError { reason: err.to_string() })
}

/// How the host's permission layer should apply a caveat mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaveatMutation {
    /// Replace the caveat with this value.
    UpdateValue(Caip25CaveatValue),
    /// The change empties the grant; revoke the whole permission.
    RevokePermission,
    /// Nothing referenced the removed item.
    Noop,
}

/// Reconciles the caveat with the removal of a network from the wallet.
///
/// Losing a required scope invalidates the grant as a whole; losing an
/// optional scope merely shrinks it.
pub fn remove_scope(value: &Caip25CaveatValue, scope: &ScopeString) -> CaveatMutation {
    if value.required_scopes.contains_key(scope) {
        return CaveatMutation::RevokePermission;
    }
    if value.optional_scopes.contains_key(scope) {
        let mut updated = value.clone();
        updated.optional_scopes.shift_remove(scope);
        return CaveatMutation::UpdateValue(updated);
    }
    CaveatMutation::Noop
}

/// Reconciles the caveat with the removal of an account from the wallet.
///
/// Strips the address from every `eip155:*` and `wallet:eip155` scope it
/// appears in; scopes of other namespaces are untouched.
pub fn remove_account(value: &Caip25CaveatValue, address: Address) -> CaveatMutation {
    let mut updated = value.clone();
    let mut changed = false;
    for scopes in [&mut updated.required_scopes, &mut updated.optional_scopes] {
        for object in scopes.values_mut() {
            let before = object.accounts.len();
            object.accounts.retain(|account| account.eth_address() != Some(address));
            changed |= object.accounts.len() != before;
        }
    }
    if changed { CaveatMutation::UpdateValue(updated) } else { CaveatMutation::Noop }
}
