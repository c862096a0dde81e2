use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Request identifier, echoed back verbatim in the response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
    #[default]
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(num) => num.fmt(f),
            Id::String(s) => s.fmt(f),
            Id::Null => f.write_str("null"),
        }
    }
}

/// A single JSON-RPC 2.0 request envelope.
///
/// `params`, when present, is expected to be a positional JSON array;
/// shape validation happens at dispatch time.
#[derive(Clone, Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Id>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}
