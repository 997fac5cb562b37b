//! Legacy views over the CAIP-25 caveat.
//!
//! The wallet still speaks the pre-multichain permission surface: a flat
//! list of permitted EVM accounts and a flat list of permitted chain ids.
//! These adapters translate both directions between that surface and the
//! caveat's scope maps. They are pure value transformations; persisting the
//! results is the engine's job.

use crate::{
    caip::{CaipAccountId, CaipChainId, EIP155_NAMESPACE, ScopeString},
    caveat::Caip25CaveatValue,
    scope::{ScopeObject, ScopesMap, default_eth_scope},
};
use alloy_primitives::{Address, ChainId};
use itertools::Itertools;

/// The unique EVM addresses across the merged session scopes, first-seen
/// order.
///
/// This answers "does the origin have any accounts" and which ones; the
/// order accounts are *reported* to dapps is the host's `getAccounts`
/// ordering, not this one.
pub fn get_eth_accounts(value: &Caip25CaveatValue) -> Vec<Address> {
    let scopes = value.session_scopes();
    scopes
        .values()
        .flat_map(|object| &object.accounts)
        .filter_map(CaipAccountId::eth_address)
        .unique()
        .collect()
}

/// Overwrites the EVM account list of every `eip155:*` and `wallet:eip155`
/// scope with `accounts`, each rescoped to its chain.
///
/// The `wallet:eip155` anchor scope is ensured at the front of the optional
/// scopes so an accounts-only grant survives with no chains permitted. No
/// new chain scopes are created.
pub fn set_eth_accounts(value: &Caip25CaveatValue, accounts: &[Address]) -> Caip25CaveatValue {
    let anchor = ScopeString::Chain(CaipChainId::wallet_eip155());
    let mut optional_scopes = ScopesMap::new();
    optional_scopes
        .insert(anchor.clone(), value.optional_scopes.get(&anchor).cloned().unwrap_or_default());
    for (key, object) in &value.optional_scopes {
        if *key != anchor {
            optional_scopes.insert(key.clone(), object.clone());
        }
    }

    Caip25CaveatValue {
        required_scopes: set_accounts_in_scopes(&value.required_scopes, accounts),
        optional_scopes: set_accounts_in_scopes(&optional_scopes, accounts),
        is_multichain_origin: value.is_multichain_origin,
    }
}

fn set_accounts_in_scopes(scopes: &ScopesMap, accounts: &[Address]) -> ScopesMap {
    scopes
        .iter()
        .map(|(key, object)| {
            let object = match key.as_chain() {
                Some(chain) if chain.is_eip155() || chain.is_wallet_eip155() => {
                    let accounts = accounts
                        .iter()
                        .map(|address| CaipAccountId::new(chain.clone(), *address))
                        .collect();
                    ScopeObject { accounts, ..object.clone() }
                }
                _ => object.clone(),
            };
            (key.clone(), object)
        })
        .collect()
}

/// The chain ids permitted through `eip155:*` scopes, required scopes
/// first, first-seen duplicates dropped.
pub fn get_permitted_eth_chain_ids(value: &Caip25CaveatValue) -> Vec<ChainId> {
    value
        .required_scopes
        .keys()
        .chain(value.optional_scopes.keys())
        .filter_map(ScopeString::eth_chain_id)
        .unique()
        .collect()
}

/// Adds one EVM chain to the optional scopes with the default method and
/// notification lists and no accounts.
///
/// Idempotent: a chain already covered by any scope, required or optional,
/// is left untouched. Required scopes are never modified.
pub fn add_permitted_eth_chain_id(value: &Caip25CaveatValue, chain_id: ChainId) -> Caip25CaveatValue {
    let key = ScopeString::Chain(CaipChainId::eip155(chain_id));
    if value.required_scopes.contains_key(&key) || value.optional_scopes.contains_key(&key) {
        return value.clone();
    }
    let mut updated = value.clone();
    updated.optional_scopes.insert(key, default_eth_scope());
    updated
}

/// Rebuilds the optional scopes so the EVM chains they cover are exactly
/// `chain_ids`.
///
/// Retained chains keep their existing scope objects; new chains get the
/// defaults. Chains already present in the required scopes are not
/// duplicated. Non-EVM optional scopes and the `wallet:eip155` anchor are
/// carried through; bare `eip155` namespace entries are dropped.
pub fn set_permitted_eth_chain_ids(
    value: &Caip25CaveatValue,
    chain_ids: &[ChainId],
) -> Caip25CaveatValue {
    let mut updated = Caip25CaveatValue {
        required_scopes: value.required_scopes.clone(),
        optional_scopes: ScopesMap::new(),
        is_multichain_origin: value.is_multichain_origin,
    };
    for (key, object) in &value.optional_scopes {
        let keep = match key {
            ScopeString::Chain(chain) if chain.is_eip155() => {
                chain.eth_chain_id().is_some_and(|id| chain_ids.contains(&id))
            }
            ScopeString::Namespace(namespace) => namespace != EIP155_NAMESPACE,
            ScopeString::Chain(_) => true,
        };
        if keep {
            updated.optional_scopes.insert(key.clone(), object.clone());
        }
    }
    for chain_id in chain_ids {
        updated = add_permitted_eth_chain_id(&updated, *chain_id);
    }
    updated
}
