//! Client for the remote account/pricelist store, reached over HTTP as a
//! GraphQL endpoint. Mirrors the reference implementation's approach of
//! posting hand-built GraphQL query strings rather than depending on a
//! typed GraphQL client.

pub mod client;
pub mod error;
pub mod query;

use chrono::{DateTime, Utc};
pub use client::{GraphQlStoreClient, StoreClient};
pub use error::StoreError;

pub(crate) fn ts_rfc3339(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
