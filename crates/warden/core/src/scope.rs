//! CAIP-25 scope validation, flattening, and merging.
//!
//! A `wallet_createSession` authorization arrives as two JSON maps of scope
//! string to scope object. Validation is fail-closed: an entry is either
//! fully well-formed per the CAIP-25 grammar or it is dropped whole, so a
//! malformed or unexpected key from a dapp can never reach a persisted
//! permission. Valid namespace-keyed entries that enumerate member chains
//! are then flattened into per-chain entries, and colliding keys merge by
//! per-field set union.

use crate::caip::{CaipAccountId, CaipChainId, ScopeString};
use indexmap::{IndexMap, map::Entry};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::Hash;
use tracing::debug;

/// RPC methods every permitted `eip155:*` scope is granted by default.
pub const KNOWN_ETH_RPC_METHODS: &[&str] = &[
    "personal_sign",
    "eth_signTypedData_v4",
    "wallet_watchAsset",
    "eth_sendTransaction",
    "eth_decrypt",
    "eth_getEncryptionPublicKey",
    "web3_clientVersion",
    "eth_subscribe",
    "eth_unsubscribe",
    "eth_blockNumber",
    "eth_call",
    "eth_chainId",
    "eth_estimateGas",
    "eth_feeHistory",
    "eth_gasPrice",
    "eth_getBalance",
    "eth_getBlockByHash",
    "eth_getBlockByNumber",
    "eth_getBlockTransactionCountByHash",
    "eth_getBlockTransactionCountByNumber",
    "eth_getCode",
    "eth_getFilterChanges",
    "eth_getFilterLogs",
    "eth_getLogs",
    "eth_getProof",
    "eth_getStorageAt",
    "eth_getTransactionByBlockHashAndIndex",
    "eth_getTransactionByBlockNumberAndIndex",
    "eth_getTransactionByHash",
    "eth_getTransactionCount",
    "eth_getTransactionReceipt",
    "eth_getUncleCountByBlockHash",
    "eth_getUncleCountByBlockNumber",
    "eth_newBlockFilter",
    "eth_newFilter",
    "eth_newPendingTransactionFilter",
    "eth_sendRawTransaction",
    "eth_syncing",
    "eth_uninstallFilter",
    "net_listening",
    "net_peerCount",
    "net_version",
];

/// Notifications every permitted `eip155:*` scope is granted by default.
pub const KNOWN_ETH_NOTIFICATIONS: &[&str] =
    &["accountsChanged", "chainChanged", "eth_subscription"];

/// Keys a scope object may carry. Anything else invalidates the whole entry.
const ALLOWED_SCOPE_KEYS: &[&str] =
    &["scopes", "methods", "notifications", "accounts", "rpcDocuments", "rpcEndpoints"];

/// The capabilities granted for one scope, as stored in the caveat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScopeObject {
    /// RPC methods callable under this scope.
    pub methods: Vec<String>,
    /// Notifications deliverable under this scope.
    pub notifications: Vec<String>,
    /// CAIP-10 accounts exposed under this scope.
    #[serde(default)]
    pub accounts: Vec<CaipAccountId>,
    /// RPC documents describing extra methods, carried through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc_documents: Vec<String>,
    /// RPC endpoints serving this scope, carried through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc_endpoints: Vec<String>,
}

/// Insertion-ordered map of scope string to scope object.
pub type ScopesMap = IndexMap<ScopeString, ScopeObject>;

/// A single validated authorization entry, before namespace flattening.
///
/// Only namespace-keyed entries may enumerate member chains; the variant
/// split makes a chain-keyed entry with a `scopes` list unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidatedScope {
    /// Keyed by a bare namespace, optionally naming member chains.
    Namespace {
        /// The namespace, e.g. `eip155` or `wallet`.
        namespace: String,
        /// Member chains to expand this entry into. All share `namespace`.
        scopes: Vec<CaipChainId>,
        /// The granted capabilities.
        object: ScopeObject,
    },
    /// Keyed by a single chain id.
    Chain {
        /// The chain.
        chain: CaipChainId,
        /// The granted capabilities.
        object: ScopeObject,
    },
}

/// Whether a raw `scopeString -> scopeObject` entry is well-formed.
///
/// Pure and total: returns `false` on every malformed input rather than
/// erroring.
pub fn is_valid_scope(scope_string: &str, scope_object: &Value) -> bool {
    parse_scope(scope_string, scope_object).is_some()
}

/// Parses one raw authorization entry into its validated form.
///
/// Enforces the strict allow-list on scope object keys, requires `methods`
/// and `notifications` to be arrays of non-empty strings, accounts to be
/// CAIP-10 ids, and a `scopes` list to appear only under a namespace key
/// with every member in that namespace. Returns `None` when any part is
/// malformed.
pub fn parse_scope(scope_string: &str, scope_object: &Value) -> Option<ValidatedScope> {
    let key: ScopeString = scope_string.parse().ok()?;
    let object = scope_object.as_object()?;
    if object.keys().any(|k| !ALLOWED_SCOPE_KEYS.contains(&k.as_str())) {
        return None;
    }

    let mut scopes = Vec::new();
    if let Some(value) = object.get("scopes") {
        // A scopes list belongs under a bare-namespace key only; on a
        // chain-scoped key it invalidates the entry even when empty.
        let ScopeString::Namespace(namespace) = &key else { return None };
        for entry in value.as_array()? {
            let chain: CaipChainId = entry.as_str()?.parse().ok()?;
            if chain.namespace() != namespace {
                return None;
            }
            scopes.push(chain);
        }
    }

    let methods = string_list(object.get("methods")?)?;
    let notifications = string_list(object.get("notifications")?)?;
    let rpc_documents = match object.get("rpcDocuments") {
        Some(value) => string_list(value)?,
        None => Vec::new(),
    };
    let rpc_endpoints = match object.get("rpcEndpoints") {
        Some(value) => string_list(value)?,
        None => Vec::new(),
    };

    let mut accounts = Vec::new();
    if let Some(value) = object.get("accounts") {
        for entry in value.as_array()? {
            accounts.push(entry.as_str()?.parse::<CaipAccountId>().ok()?);
        }
    }

    let object = ScopeObject { methods, notifications, accounts, rpc_documents, rpc_endpoints };
    Some(match key {
        ScopeString::Namespace(namespace) => ValidatedScope::Namespace { namespace, scopes, object },
        ScopeString::Chain(chain) => ValidatedScope::Chain { chain, object },
    })
}

/// `None` when the value is not an array of non-empty strings.
fn string_list(value: &Value) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for entry in value.as_array()? {
        let s = entry.as_str()?;
        if s.is_empty() {
            return None;
        }
        out.push(s.to_string());
    }
    Some(out)
}

/// Validates every entry of a raw scope map, dropping invalid entries.
///
/// Entries keep their request order.
pub fn validate_scopes(scopes: &IndexMap<String, Value>) -> Vec<ValidatedScope> {
    scopes
        .iter()
        .filter_map(|(scope_string, scope_object)| {
            let parsed = parse_scope(scope_string, scope_object);
            if parsed.is_none() {
                debug!(target: "warden::scope", %scope_string, "dropping invalid scope");
            }
            parsed
        })
        .collect()
}

/// Expands namespace entries that enumerate member chains into per-chain
/// entries and normalizes everything into one `ScopesMap`.
///
/// Keys keep first-seen order; a key produced twice merges by set union.
pub fn normalize_scopes(scopes: Vec<ValidatedScope>) -> ScopesMap {
    let mut normalized = ScopesMap::new();
    for scope in scopes {
        match scope {
            ValidatedScope::Chain { chain, object } => {
                insert_merged(&mut normalized, ScopeString::Chain(chain), object);
            }
            ValidatedScope::Namespace { namespace, scopes, object } => {
                if scopes.is_empty() {
                    insert_merged(&mut normalized, ScopeString::Namespace(namespace), object);
                } else {
                    for chain in scopes {
                        insert_merged(&mut normalized, ScopeString::Chain(chain), object.clone());
                    }
                }
            }
        }
    }
    normalized
}

fn insert_merged(map: &mut ScopesMap, key: ScopeString, object: ScopeObject) {
    match map.entry(key) {
        Entry::Occupied(mut entry) => {
            let merged = merge_scope_object(entry.get(), &object);
            entry.insert(merged);
        }
        Entry::Vacant(entry) => {
            entry.insert(object);
        }
    }
}

/// Unions two scope objects field by field.
///
/// Each field keeps `a`'s order followed by `b`'s novel entries. Set union,
/// not concatenation: an account listed by both sides appears once.
pub fn merge_scope_object(a: &ScopeObject, b: &ScopeObject) -> ScopeObject {
    ScopeObject {
        methods: union(&a.methods, &b.methods),
        notifications: union(&a.notifications, &b.notifications),
        accounts: union(&a.accounts, &b.accounts),
        rpc_documents: union(&a.rpc_documents, &b.rpc_documents),
        rpc_endpoints: union(&a.rpc_endpoints, &b.rpc_endpoints),
    }
}

fn union<T: Clone + Eq + Hash>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().chain(b).unique().cloned().collect()
}

/// Unions two scope maps into one view.
///
/// Keys keep `a`'s insertion order followed by `b`'s novel keys; a key
/// present in both merges via [`merge_scope_object`].
pub fn merge_scopes(a: &ScopesMap, b: &ScopesMap) -> ScopesMap {
    let mut merged = a.clone();
    for (key, object) in b {
        insert_merged(&mut merged, key.clone(), object.clone());
    }
    merged
}

/// The scope object granted to a newly permitted EVM chain: the default
/// method and notification lists with no accounts.
pub fn default_eth_scope() -> ScopeObject {
    ScopeObject {
        methods: KNOWN_ETH_RPC_METHODS.iter().map(ToString::to_string).collect(),
        notifications: KNOWN_ETH_NOTIFICATIONS.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}
