//! Response envelope interpretation.
//!
//! Every API response is `{"data": ...}` on success or
//! `{"error": {"message": ...}}` on failure.

use serde_json::Value;

use crate::error::{Result, WorkfrontError};
use crate::http::HttpResponse;

/// Extracts the `data` payload from a response, mapping `error` envelopes
/// and unreadable bodies onto [`WorkfrontError`].
///
/// An explicit `"data": null` is a legitimate payload and is returned as
/// `Value::Null`.
pub fn unwrap_envelope(response: &HttpResponse) -> Result<Value> {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let Some(Value::Object(mut body)) = parsed else {
        if !response.is_success() {
            return Err(WorkfrontError::Transport(format!("HTTP {}", response.status)));
        }
        return Err(WorkfrontError::MalformedResponse(
            "response body is not a JSON object".to_string(),
        ));
    };

    match body.remove("error") {
        Some(Value::Null) | None => {}
        Some(error) => {
            let message = match error.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => error.to_string(),
            };
            return Err(WorkfrontError::Api {
                status: response.status,
                message,
            });
        }
    }

    body.remove("data").ok_or_else(|| {
        WorkfrontError::MalformedResponse("response carries neither data nor error".to_string())
    })
}
