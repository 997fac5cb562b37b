//! JSON-RPC response types

use crate::{
    error::RpcError,
    request::{Id, Version},
};
use serde::{Deserialize, Serialize};

/// Response of a single JSON-RPC call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    jsonrpc: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Id>,
    #[serde(flatten)]
    result: ResponseResult,
}

impl RpcResponse {
    /// Creates a response to the call with the given id
    pub fn new(id: Id, content: impl Into<ResponseResult>) -> Self {
        Self { jsonrpc: Version::V2, id: Some(id), result: content.into() }
    }

    /// The error response for an unparsable request
    pub fn invalid_request(id: Id) -> Self {
        Self::new(id, RpcError::invalid_request())
    }

    /// Returns the payload of the response
    pub fn result(&self) -> &ResponseResult {
        &self.result
    }
}

/// Result of a JSON-RPC call, either a `result` value or an `error` object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseResult {
    /// The call succeeded with this value
    #[serde(rename = "result")]
    Success(serde_json::Value),
    /// The call failed
    #[serde(rename = "error")]
    Error(RpcError),
}

impl ResponseResult {
    /// Creates an error response
    pub fn error(error: RpcError) -> Self {
        Self::Error(error)
    }

    /// The success value, if this is a success response
    pub fn success_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// The error, if this is an error response
    pub fn error_value(&self) -> Option<&RpcError> {
        match self {
            Self::Success(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

impl From<RpcError> for ResponseResult {
    fn from(value: RpcError) -> Self {
        Self::error(value)
    }
}
