//! Typed wallet RPC requests and their parameter validators.
//!
//! The parameter shapes mirror the wire: loosely typed where the legacy
//! surface demands echoing the received value back in an error message,
//! strictly typed once validation has run. All validation failures are
//! invalid-params errors whose message quotes the offending input, never an
//! internal error.

use crate::serde_helpers::*;
use alloy_primitives::ChainId;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Chain ids above this value are rejected.
///
/// Guards against chain ids colliding with the transaction signature `v`
/// encoding, matching long-standing wallet convention.
pub const MAX_SAFE_CHAIN_ID: ChainId = 4503599627370476;

/// Ticker recorded for a network added without a `nativeCurrency`.
pub const UNKNOWN_TICKER_SYMBOL: &str = "ETH";

/// Longest `chainName` stored verbatim; longer names are truncated.
pub const MAX_CHAIN_NAME_LENGTH: usize = 100;

/// A wallet RPC request parsed from a JSON-RPC method call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum WalletRequest {
    /// `wallet_addEthereumChain`
    #[serde(rename = "wallet_addEthereumChain", with = "sequence")]
    AddEthereumChain(AddEthereumChainParameter),

    /// `wallet_switchEthereumChain`
    #[serde(rename = "wallet_switchEthereumChain", with = "sequence")]
    SwitchEthereumChain(SwitchEthereumChainParameter),

    /// `eth_requestAccounts`
    #[serde(rename = "eth_requestAccounts", with = "empty_params")]
    RequestAccounts(()),

    /// `eth_accounts`
    #[serde(rename = "eth_accounts", with = "empty_params")]
    Accounts(()),

    /// `wallet_requestPermissions`
    #[serde(rename = "wallet_requestPermissions", with = "sequence")]
    RequestPermissions(PermissionsRequest),

    /// `wallet_revokePermissions`
    #[serde(rename = "wallet_revokePermissions", with = "sequence")]
    RevokePermissions(PermissionsRequest),

    /// `wallet_getPermissions`
    #[serde(rename = "wallet_getPermissions", with = "empty_params")]
    GetPermissions(()),

    /// `wallet_createSession`
    #[serde(rename = "wallet_createSession")]
    CreateSession(AuthorizationRequest),

    /// `wallet_getSession`
    #[serde(rename = "wallet_getSession", with = "empty_params")]
    GetSession(()),

    /// `wallet_revokeSession`
    #[serde(rename = "wallet_revokeSession", with = "empty_params")]
    RevokeSession(()),
}

/// Params object of `wallet_requestPermissions` and
/// `wallet_revokePermissions`: requested permission name to descriptor.
pub type PermissionsRequest = IndexMap<String, Value>;

/// The single params object of `wallet_addEthereumChain`.
///
/// Fields are raw JSON so validation can echo exactly what was received;
/// [`validate_add_ethereum_chain`] produces the canonical form. Absent
/// fields read as `Null`. Unrecognized keys are collected and rejected.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    /// Requested chain id, expected to be 0x-prefixed hex.
    #[serde(default)]
    pub chain_id: Value,
    /// Human-readable chain name.
    #[serde(default)]
    pub chain_name: Value,
    /// Candidate block explorer URLs.
    #[serde(default)]
    pub block_explorer_urls: Value,
    /// Chain icons, accepted and ignored.
    #[serde(default)]
    pub icon_urls: Value,
    /// Native currency descriptor.
    #[serde(default)]
    pub native_currency: Value,
    /// Candidate RPC endpoints.
    #[serde(default)]
    pub rpc_urls: Value,
    /// Anything else the caller sent.
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// The single params object of `wallet_switchEthereumChain`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEthereumChainParameter {
    /// Requested chain id, expected to be 0x-prefixed hex.
    #[serde(default)]
    pub chain_id: Value,
    /// Anything else the caller sent.
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// Params of `wallet_createSession`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    /// Scopes the caller requires.
    #[serde(default)]
    pub required_scopes: IndexMap<String, Value>,
    /// Scopes the caller would like.
    #[serde(default)]
    pub optional_scopes: IndexMap<String, Value>,
    /// Free-form session metadata, echoed back on success.
    #[serde(default)]
    pub session_properties: Option<IndexMap<String, Value>>,
    /// Anything else the caller sent; rejected by the handler.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// A validated, canonical `wallet_addEthereumChain` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddChainRequest {
    /// The chain to add.
    pub chain_id: ChainId,
    /// Display name, truncated to [`MAX_CHAIN_NAME_LENGTH`].
    pub chain_name: String,
    /// The first secure RPC endpoint from the request.
    pub rpc_url: Url,
    /// The first secure block explorer from the request, if any were given.
    pub block_explorer_url: Option<Url>,
    /// Native currency ticker, or [`UNKNOWN_TICKER_SYMBOL`].
    pub ticker: String,
}

/// Invalid-params failures from the chain parameter validators.
///
/// The `Display` output is the user-facing error message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainParamsError {
    /// Parameter object carried keys outside the accepted set.
    #[error("Received unexpected keys on object parameter. Unknown keys: {0}")]
    UnexpectedKeys(String),
    /// `chainId` is not 0x-prefixed unpadded non-zero hex.
    #[error("Expected 0x-prefixed, unpadded, non-zero hexadecimal string 'chainId'. Received:\n{0}")]
    MalformedChainId(String),
    /// `chainId` parses but exceeds the safe bound.
    #[error("Invalid chain ID \"{hex}\": numerical value greater than max safe value. Received:\n{received}")]
    UnsafeChainId {
        /// The lowercased hex string that parsed.
        hex: String,
        /// The value as received.
        received: String,
    },
    /// `rpcUrls` contained no usable endpoint.
    #[error("Expected an array with at least one valid string HTTPS url 'rpcUrls'. Received:\n{0}")]
    MissingRpcUrl(String),
    /// `blockExplorerUrls` was given but contained no usable URL.
    #[error("Expected null or array with at least one valid string HTTPS URL 'blockExplorerUrl'. Received: {0}")]
    MalformedBlockExplorerUrls(String),
    /// `chainName` missing or empty.
    #[error("Expected non-empty string 'chainName'. Received:\n{0}")]
    MalformedChainName(String),
    /// `nativeCurrency` was neither null nor an object.
    #[error("Expected null or object 'nativeCurrency'. Received:\n{0}")]
    MalformedNativeCurrency(String),
    /// `nativeCurrency.decimals` was not exactly 18.
    #[error("Expected the number 18 for 'nativeCurrency.decimals' when 'nativeCurrency' is provided. Received: {0}")]
    WrongDecimals(String),
    /// `nativeCurrency.symbol` missing or not a string.
    #[error("Expected a string 'nativeCurrency.symbol'. Received: {0}")]
    MalformedSymbol(String),
    /// Ticker outside the 1-6 character bound.
    #[error("Expected 1-6 character string 'nativeCurrency.symbol'. Received:\n{0}")]
    TickerLength(String),
}

/// Renders a received JSON value for an error message: strings bare,
/// everything else as JSON.
fn received(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `0x`-prefixed, unpadded, non-zero hex. Expects lowercased input.
fn is_prefixed_hex(s: &str) -> bool {
    s.strip_prefix("0x").is_some_and(|digits| {
        !digits.is_empty()
            && !digits.starts_with('0')
            && digits.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

/// Validates a raw `chainId` value into a numeric chain id.
pub fn validate_chain_id(chain_id: &Value) -> Result<ChainId, ChainParamsError> {
    let normalized = chain_id.as_str().map(str::to_lowercase);
    let Some(hex) = normalized.filter(|s| is_prefixed_hex(s)) else {
        return Err(ChainParamsError::MalformedChainId(received(chain_id)));
    };
    match u64::from_str_radix(&hex[2..], 16) {
        Ok(id) if id <= MAX_SAFE_CHAIN_ID => Ok(id),
        // Overflowing u64 is far past the safe bound as well.
        _ => Err(ChainParamsError::UnsafeChainId { hex, received: received(chain_id) }),
    }
}

/// Whether a URL is acceptable as an RPC or explorer endpoint: `https`, or
/// plain `http` to localhost.
fn is_localhost_or_https(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => matches!(url.host_str(), Some("localhost" | "127.0.0.1")),
        _ => false,
    }
}

/// First entry of a URL array that parses and is secure, in request order.
fn first_valid_url(value: &Value) -> Option<Url> {
    value.as_array()?.iter().filter_map(Value::as_str).find_map(|s| {
        let url = Url::parse(s).ok()?;
        is_localhost_or_https(&url).then_some(url)
    })
}

/// Validates `wallet_addEthereumChain` params into their canonical form.
pub fn validate_add_ethereum_chain(
    params: &AddEthereumChainParameter,
) -> Result<AddChainRequest, ChainParamsError> {
    if !params.other.is_empty() {
        let keys = params.other.keys().cloned().collect::<Vec<_>>().join(",");
        return Err(ChainParamsError::UnexpectedKeys(keys));
    }

    let chain_id = validate_chain_id(&params.chain_id)?;

    let rpc_url = first_valid_url(&params.rpc_urls)
        .ok_or_else(|| ChainParamsError::MissingRpcUrl(received(&params.rpc_urls)))?;

    let block_explorer_url = match &params.block_explorer_urls {
        Value::Null => None,
        value => Some(first_valid_url(value).ok_or_else(|| {
            ChainParamsError::MalformedBlockExplorerUrls(received(value))
        })?),
    };

    let Some(chain_name) = params.chain_name.as_str().filter(|s| !s.is_empty()) else {
        return Err(ChainParamsError::MalformedChainName(received(&params.chain_name)));
    };
    let chain_name: String = chain_name.chars().take(MAX_CHAIN_NAME_LENGTH).collect();

    let ticker = match &params.native_currency {
        Value::Null => UNKNOWN_TICKER_SYMBOL.to_string(),
        Value::Object(currency) => {
            let decimals = currency.get("decimals").unwrap_or(&Value::Null);
            if decimals.as_f64() != Some(18.0) {
                return Err(ChainParamsError::WrongDecimals(received(decimals)));
            }
            let symbol = currency.get("symbol").unwrap_or(&Value::Null);
            let Some(symbol) = symbol.as_str().filter(|s| !s.is_empty()) else {
                return Err(ChainParamsError::MalformedSymbol(received(symbol)));
            };
            if symbol != UNKNOWN_TICKER_SYMBOL && symbol.chars().count() > 6 {
                return Err(ChainParamsError::TickerLength(symbol.to_string()));
            }
            symbol.to_string()
        }
        value => return Err(ChainParamsError::MalformedNativeCurrency(received(value))),
    };

    Ok(AddChainRequest { chain_id, chain_name, rpc_url, block_explorer_url, ticker })
}

/// Validates `wallet_switchEthereumChain` params into a numeric chain id.
pub fn validate_switch_ethereum_chain(
    params: &SwitchEthereumChainParameter,
) -> Result<ChainId, ChainParamsError> {
    if !params.other.is_empty() {
        let keys = params.other.keys().cloned().collect::<Vec<_>>().join(",");
        return Err(ChainParamsError::UnexpectedKeys(keys));
    }
    validate_chain_id(&params.chain_id)
}
