//! JSON-RPC error bindings

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, fmt};

/// List of JSON-RPC error codes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Server received Invalid JSON.
    /// server side error while parsing JSON
    ParseError,
    /// send invalid request object.
    InvalidRequest,
    /// method does not exist or valid
    MethodNotFound,
    /// invalid method parameter.
    InvalidParams,
    /// internal call error
    InternalError,
    /// The requested resource is busy, e.g. a second `eth_requestAccounts`
    /// for an origin that already has one pending
    ResourceUnavailable,
    /// The user rejected an approval prompt (EIP-1193 `4001`)
    UserRejectedRequest,
    /// The requested action is not authorized for the caller (EIP-1193 `4100`)
    Unauthorized,
    /// The wallet has no network configuration for the requested chain
    /// (EIP-3326 `4902`)
    UnrecognizedChainId,
    /// Used for server specific errors.
    ServerError(i64),
}

impl ErrorCode {
    /// Returns the error code as `i64`
    pub fn code(&self) -> i64 {
        match *self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ResourceUnavailable => -32002,
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::UnrecognizedChainId => 4902,
            Self::ServerError(c) => c,
        }
    }

    /// Returns the message associated with the error
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ResourceUnavailable => "Resource unavailable",
            Self::UserRejectedRequest => "User rejected the request",
            Self::Unauthorized => "Unauthorized",
            Self::UnrecognizedChainId => "Unrecognized chain ID",
            Self::ServerError(_) => "Server error",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'a> Deserialize<'a> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        i64::deserialize(deserializer).map(Into::into)
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32002 => Self::ResourceUnavailable,
            4001 => Self::UserRejectedRequest,
            4100 => Self::Unauthorized,
            4902 => Self::UnrecognizedChainId,
            _ => Self::ServerError(code),
        }
    }
}

/// A JSON-RPC 2.0 error object wire type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcError {
    /// The error code
    pub code: ErrorCode,
    /// The error message
    pub message: Cow<'static, str>,
    /// Additional data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// New [`RpcError`] with the given [`ErrorCode`] and its default message
    pub const fn new(code: ErrorCode) -> Self {
        Self { message: Cow::Borrowed(code.message()), code, data: None }
    }

    /// Creates a new `ParseError`
    pub const fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError)
    }

    /// Creates a new `MethodNotFound`
    pub const fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound)
    }

    /// Creates a new `InvalidRequest`
    pub const fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest)
    }

    /// Creates a new `InternalError`
    pub const fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }

    /// Creates a new `InvalidParams` error with the given message
    pub fn invalid_params<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::InvalidParams, message: message.into().into(), data: None }
    }

    /// Creates a new `InternalError` with the given message
    pub fn internal_error_with<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::InternalError, message: message.into().into(), data: None }
    }

    /// Creates a new `ResourceUnavailable` error with the given message
    pub fn resource_unavailable<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::ResourceUnavailable, message: message.into().into(), data: None }
    }

    /// Creates a new `UserRejectedRequest` error with the given message
    pub fn user_rejected<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::UserRejectedRequest, message: message.into().into(), data: None }
    }

    /// Creates a new `Unauthorized` error with the given message
    pub fn unauthorized<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::Unauthorized, message: message.into().into(), data: None }
    }

    /// Creates a new `UnrecognizedChainId` error with the given message
    pub fn unrecognized_chain_id<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::UnrecognizedChainId, message: message.into().into(), data: None }
    }

    /// Creates a new error with an arbitrary code, e.g. the CAIP-25 `53xx`
    /// session errors
    pub fn custom<M>(code: i64, message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: code.into(), message: message.into().into(), data: None }
    }

    /// Attaches additional data to the error
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.message(), self.message)
    }
}
