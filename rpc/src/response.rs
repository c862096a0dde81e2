use crate::{error::ErrorObject, request::Id};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version marker carried by every response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    #[default]
    #[serde(rename = "2.0")]
    V2,
}

/// Either the `result` or the `error` member of a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseResult {
    Success { result: Value },
    Error { error: ErrorObject },
}

/// A single JSON-RPC 2.0 response envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: Version,
    pub id: Id,
    #[serde(flatten)]
    pub outcome: ResponseResult,
}

impl Response {
    pub fn success(id: Id, result: Value) -> Self {
        Self { jsonrpc: Version::V2, id, outcome: ResponseResult::Success { result } }
    }

    pub fn error(id: Id, error: ErrorObject) -> Self {
        Self { jsonrpc: Version::V2, id, outcome: ResponseResult::Error { error } }
    }
}
