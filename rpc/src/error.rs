use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{borrow::Cow, fmt};

/// A JSON-RPC 2.0 error object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub const fn new(code: i64, message: Cow<'static, str>) -> Self {
        Self { code, message, data: None }
    }

    /// `-32600`: the envelope itself could not be parsed.
    pub fn invalid_request() -> Self {
        Self::new(-32600, Cow::Borrowed("invalid json request"))
    }

    /// `-32601`: the namespace or method is not registered.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, Cow::Owned(format!("the method {method} does not exist/is not available")))
    }

    /// `-32602`: the positional params did not decode for the handler.
    pub fn invalid_params(method: &str) -> Self {
        Self::new(-32602, Cow::Owned(format!("invalid arguments to {method}")))
    }

    /// `-32603`: the handler failed. Details are logged server-side and
    /// never leave the process.
    pub fn internal_error() -> Self {
        Self::new(-32603, Cow::Borrowed("internal error"))
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)
    }
}

impl std::error::Error for ErrorObject {}
