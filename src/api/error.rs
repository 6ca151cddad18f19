use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(status: StatusCode, body: &[u8]) -> Self {
        Self::Status {
            status,
            message: error_message(status, body),
        }
    }
}

/// Human-readable message for a rejected request.
///
/// Uses the body's `detail` field when the body is JSON and carries one,
/// otherwise the status reason phrase.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(describe_detail))
        .unwrap_or_else(|| reason(status))
}

fn describe_detail(detail: &Value) -> Option<String> {
    match detail {
        Value::Null => None,
        Value::String(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        // FastAPI validation errors: [{"loc": [...], "msg": "...", ...}, ...]
        Value::Array(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(map) => map
                        .get("msg")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .or_else(|| Some(entry.to_string())),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Some(parts.join("; ")).filter(|joined| !joined.is_empty())
        }
        other => Some(other.to_string()),
    }
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| status.as_str().to_string())
}
