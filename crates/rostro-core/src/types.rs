use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uniform outcome of a repository mutation: `{success, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for OperationResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Normalized result of a register/recognize call.
///
/// Fields the server returns beyond `success`/`message`/`cuil` are kept in
/// `extra` so callers can read them without a schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialAuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuil: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FacialAuthResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            cuil: None,
            extra: Map::new(),
        }
    }

    /// Merge a successful JSON body over `{"success": true}`.
    ///
    /// Keys in the body win, so a server answering `{"success": false}`
    /// with a 2xx status still yields a failed response. `message` and
    /// `cuil` are only read when they are strings; other values stay in
    /// `extra`. Non-object bodies are rejected.
    pub fn from_success_body(body: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut extra) = body else {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "expected a JSON object response body",
            ));
        };
        let success = match extra.remove("success") {
            Some(Value::Bool(success)) => success,
            Some(Value::Null) | None => true,
            Some(other) => {
                tracing::debug!(value = %other, "non-boolean success field; treating as success");
                true
            }
        };
        let message = take_string(&mut extra, "message");
        let cuil = take_string(&mut extra, "cuil");
        Ok(Self {
            success,
            message,
            cuil,
            extra,
        })
    }
}

/// Remove `key` from `fields` if it holds a string.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}
