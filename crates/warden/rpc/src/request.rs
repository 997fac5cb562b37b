//! Incoming JSON-RPC request types

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;
use std::fmt;

/// A JSON-RPC request id, either a string, a number, or null
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String id
    String(String),
    /// Number id
    Number(i64),
    /// Null id
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => s.fmt(f),
            Self::Number(n) => n.fmt(f),
            Self::Null => f.write_str("null"),
        }
    }
}

/// The JSON-RPC 2.0 protocol version tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    /// Always `"2.0"`
    V2,
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::V2 => serializer.serialize_str("2.0"),
        }
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VersionVisitor;

        impl de::Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("\"2.0\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match value {
                    "2.0" => Ok(Version::V2),
                    _ => Err(de::Error::custom(format!("invalid jsonrpc version: {value}"))),
                }
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

/// The `params` member of a method call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// No parameters provided
    #[default]
    None,
    /// An array of JSON values
    Array(Vec<Value>),
    /// A map of JSON values
    Object(serde_json::Map<String, Value>),
}

impl From<RequestParams> for Value {
    fn from(params: RequestParams) -> Self {
        match params {
            RequestParams::None => Self::Null,
            RequestParams::Array(arr) => arr.into(),
            RequestParams::Object(obj) => obj.into(),
        }
    }
}

/// A complete JSON-RPC method call object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcMethodCall {
    /// The version of the protocol
    pub jsonrpc: Version,
    /// The name of the method to execute
    pub method: String,
    /// Parameters of the method call
    #[serde(default)]
    pub params: RequestParams,
    /// The request identifier, echoed back in the response
    pub id: Id,
}

impl RpcMethodCall {
    /// Returns the id of the call
    pub fn id(&self) -> Id {
        self.id.clone()
    }
}
