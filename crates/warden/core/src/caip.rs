//! CAIP-2 chain identifiers, CAIP-10 account identifiers, and the scope
//! strings built from them.
//!
//! Everything here validates on construction. Scope maps received from dapps
//! are adversarial input, so the grammar checks are strict: an identifier
//! that does not match the CAIP character sets does not parse, and a value
//! that does not parse never enters a stored permission.

use alloy_primitives::{Address, ChainId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Namespace of the chain-agnostic `wallet:*` scopes.
pub const WALLET_NAMESPACE: &str = "wallet";

/// Namespace of EVM chains.
pub const EIP155_NAMESPACE: &str = "eip155";

/// Errors when parsing CAIP identifiers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaipError {
    /// Not a valid CAIP-2 `namespace:reference` chain id.
    #[error("invalid CAIP-2 chain id: {0:?}")]
    InvalidChainId(String),
    /// Not a valid CAIP-2 namespace.
    #[error("invalid CAIP-2 namespace: {0:?}")]
    InvalidNamespace(String),
    /// Not a valid CAIP-10 `chain:address` account id.
    #[error("invalid CAIP-10 account id: {0:?}")]
    InvalidAccountId(String),
}

/// `[-a-z0-9]{3,8}`
fn is_valid_namespace(s: &str) -> bool {
    (3..=8).contains(&s.len())
        && s.bytes().all(|b| matches!(b, b'-' | b'a'..=b'z' | b'0'..=b'9'))
}

/// `[-_a-zA-Z0-9]{1,32}`
fn is_valid_reference(s: &str) -> bool {
    (1..=32).contains(&s.len())
        && s.bytes().all(|b| matches!(b, b'-' | b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9'))
}

/// `[-.%a-zA-Z0-9]{1,128}`
fn is_valid_account_address(s: &str) -> bool {
    (1..=128).contains(&s.len())
        && s.bytes()
            .all(|b| matches!(b, b'-' | b'.' | b'%' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9'))
}

/// A CAIP-2 chain id: `namespace:reference`, e.g. `eip155:1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaipChainId {
    namespace: String,
    reference: String,
}

impl CaipChainId {
    /// The `eip155:<id>` chain id for an EVM chain.
    pub fn eip155(chain_id: ChainId) -> Self {
        Self { namespace: EIP155_NAMESPACE.to_string(), reference: chain_id.to_string() }
    }

    /// The `wallet:eip155` scope carrying chain-agnostic EVM capabilities.
    pub fn wallet_eip155() -> Self {
        Self { namespace: WALLET_NAMESPACE.to_string(), reference: EIP155_NAMESPACE.to_string() }
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The reference part.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Whether this chain id is in the `eip155` namespace.
    pub fn is_eip155(&self) -> bool {
        self.namespace == EIP155_NAMESPACE
    }

    /// Whether this is the `wallet:eip155` scope.
    pub fn is_wallet_eip155(&self) -> bool {
        self.namespace == WALLET_NAMESPACE && self.reference == EIP155_NAMESPACE
    }

    /// The numeric chain id when this is an `eip155:*` chain id.
    pub fn eth_chain_id(&self) -> Option<ChainId> {
        if !self.is_eip155() {
            return None;
        }
        self.reference.parse().ok()
    }
}

impl FromStr for CaipChainId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((namespace, reference)) = s.split_once(':') else {
            return Err(CaipError::InvalidChainId(s.to_string()));
        };
        if !is_valid_namespace(namespace) || !is_valid_reference(reference) {
            return Err(CaipError::InvalidChainId(s.to_string()));
        }
        Ok(Self { namespace: namespace.to_string(), reference: reference.to_string() })
    }
}

impl fmt::Display for CaipChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl Serialize for CaipChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CaipChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A CAIP-10 account id: `namespace:reference:address`, e.g.
/// `eip155:1:0xAb58...`.
///
/// EVM addresses are stored in their EIP-55 checksummed rendering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaipAccountId {
    chain: CaipChainId,
    address: String,
}

impl CaipAccountId {
    /// Scopes an EVM address to a chain.
    pub fn new(chain: CaipChainId, address: Address) -> Self {
        Self { chain, address: address.to_checksum(None) }
    }

    /// The chain this account is scoped to.
    pub fn chain(&self) -> &CaipChainId {
        &self.chain
    }

    /// The raw address part.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The EVM address when the account lives in an `eip155:*` scope or the
    /// `wallet:eip155` scope.
    pub fn eth_address(&self) -> Option<Address> {
        if !self.chain.is_eip155() && !self.chain.is_wallet_eip155() {
            return None;
        }
        Address::from_str(&self.address).ok()
    }
}

impl FromStr for CaipAccountId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((chain, address)) = s.rsplit_once(':') else {
            return Err(CaipError::InvalidAccountId(s.to_string()));
        };
        if !is_valid_account_address(address) {
            return Err(CaipError::InvalidAccountId(s.to_string()));
        }
        let chain =
            chain.parse().map_err(|_| CaipError::InvalidAccountId(s.to_string()))?;
        Ok(Self { chain, address: address.to_string() })
    }
}

impl fmt::Display for CaipAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.address)
    }
}

impl Serialize for CaipAccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CaipAccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Key of a scope map entry: either a whole CAIP-2 namespace (`eip155`) or a
/// single chain id (`eip155:1`).
///
/// Keeping the two shapes as distinct variants makes the namespace-only
/// operations (flattening, `scopes` expansion) impossible to apply to a
/// chain-scoped entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeString {
    /// A bare namespace, e.g. `eip155` or `wallet`.
    Namespace(String),
    /// A chain id, e.g. `eip155:1` or `wallet:eip155`.
    Chain(CaipChainId),
}

impl ScopeString {
    /// The namespace of the key, for both variants.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Namespace(namespace) => namespace,
            Self::Chain(chain) => chain.namespace(),
        }
    }

    /// The chain id when this key is chain-scoped.
    pub fn as_chain(&self) -> Option<&CaipChainId> {
        match self {
            Self::Namespace(_) => None,
            Self::Chain(chain) => Some(chain),
        }
    }

    /// The numeric chain id for `eip155:*` keys.
    pub fn eth_chain_id(&self) -> Option<ChainId> {
        self.as_chain().and_then(CaipChainId::eth_chain_id)
    }

    /// Whether this key is the `wallet:eip155` scope.
    pub fn is_wallet_eip155(&self) -> bool {
        self.as_chain().is_some_and(CaipChainId::is_wallet_eip155)
    }
}

impl From<CaipChainId> for ScopeString {
    fn from(chain: CaipChainId) -> Self {
        Self::Chain(chain)
    }
}

impl FromStr for ScopeString {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            return s.parse().map(Self::Chain);
        }
        if is_valid_namespace(s) {
            Ok(Self::Namespace(s.to_string()))
        } else {
            Err(CaipError::InvalidNamespace(s.to_string()))
        }
    }
}

impl fmt::Display for ScopeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace(namespace) => f.write_str(namespace),
            Self::Chain(chain) => chain.fmt(f),
        }
    }
}

impl Serialize for ScopeString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
