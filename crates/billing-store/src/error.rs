use thiserror::Error;

/// Transport- or protocol-level failures talking to the store. Business
/// outcomes (account not found, operation returning no row) are modeled as
/// `Option::None` on the trait methods, not as an error variant here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned malformed GraphQL response: {0}")]
    MalformedResponse(String),
    #[error("store returned GraphQL errors: {0}")]
    GraphQl(String)
}
