use serde::{Deserialize, Serialize};

/// Every request a gateway publishes is wrapped as `{"transaction": <body>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope<T> {
    pub transaction: T
}

/// One field-level validation failure, mirroring the `{field, message,
/// error_type}` shape of a pydantic `ValidationError.errors()` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub error_type: String
}

/// Returned in place of a handler's response when envelope decoding fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorEnvelope {
    pub errors: Vec<FieldError>
}

impl ValidationErrorEnvelope {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
                error_type: "value_error".to_string()
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_unwraps_transaction_field() {
        #[derive(Debug, Deserialize)]
        struct Body {
            transaction_tag: String
        }

        let raw = serde_json::json!({ "transaction": { "transaction_tag": "100" } });
        let envelope: RequestEnvelope<Body> = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.transaction.transaction_tag, "100");
    }
}
