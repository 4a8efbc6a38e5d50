use thiserror::Error;

/// Failures talking to the message bus. A handler returning a normal
/// business-rule failure (e.g. `{ok: false}`) is not a `BusError` — those
/// are ordinary response payloads. This enum is for the transport and
/// protocol layer underneath them.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("amqp transport error: {0}")]
    Transport(#[from] lapin::Error),

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rpc call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("remote handler raised {error_type}: {message}")]
    Remote { error_type: String, message: String, args: Vec<serde_json::Value> }
}
