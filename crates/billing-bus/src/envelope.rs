//! Wire encoding of remote handler failures: `{"error": {"type", "message",
//! "args"}}`. A handler itself never produces this shape for ordinary
//! business outcomes (those are plain response payloads with an `ok` or
//! `authorized` flag) — this envelope is reserved for the case where the
//! handler task itself panicked or the dispatcher could not route the call
//! at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BusError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub args: Vec<Value>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteErrorEnvelope {
    pub error: RemoteError
}

impl RemoteErrorEnvelope {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: RemoteError { error_type: error_type.into(), message: message.into(), args: Vec::new() }
        }
    }
}

/// Inspects a decoded reply body: `Ok` if it is an ordinary payload, `Err`
/// if it carries the `{"error": ...}` envelope a failed handler invocation
/// produces.
pub fn parse_reply(body: Value) -> Result<Value, BusError> {
    if let Some(error) = body.get("error") {
        let remote: RemoteError = serde_json::from_value(error.clone())
            .unwrap_or_else(|_| RemoteError {
                error_type: "UnknownError".to_string(),
                message: error.to_string(),
                args: Vec::new()
            });
        return Err(BusError::Remote {
            error_type: remote.error_type,
            message: remote.message,
            args: remote.args
        })
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_payload_passes_through() {
        let body = serde_json::json!({ "ok": true });
        assert_eq!(parse_reply(body.clone()).unwrap(), body);
    }

    #[test]
    fn error_envelope_surfaces_as_remote_error() {
        let body = serde_json::to_value(RemoteErrorEnvelope::new("ValueError", "boom")).unwrap();
        let err = parse_reply(body).unwrap_err();
        match err {
            BusError::Remote { error_type, message, .. } => {
                assert_eq!(error_type, "ValueError");
                assert_eq!(message, "boom");
            }
            other => panic!("expected Remote, got {other:?}")
        }
    }
}
