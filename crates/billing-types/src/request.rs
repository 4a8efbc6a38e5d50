use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{FailedReason, UnauthorizedReason},
    tenant::Tenant
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub destination_account_tag: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub carrier_ip: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_auth: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub authorized: bool,
    #[serde(default)]
    pub authorized_destination: bool,
    #[serde(default)]
    pub unauthorized_account_tag: Option<String>,
    #[serde(default)]
    pub unauthorized_reason: Option<UnauthorizedReason>,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default)]
    pub carriers: Vec<String>,
    #[serde(default)]
    pub max_available_units: Option<i64>
}

impl AuthorizationResponse {
    /// Neither `account_tag` nor `destination_account_tag` was supplied.
    pub fn unspecified() -> Self {
        Self { authorized: false, ..Default::default() }
    }

    pub fn unauthorized(account_tag: impl Into<String>, reason: UnauthorizedReason) -> Self {
        Self {
            authorized: false,
            unauthorized_account_tag: Some(account_tag.into()),
            unauthorized_reason: Some(reason),
            ..Default::default()
        }
    }

    /// `authorized`/`authorized_destination` reflect whether the caller and
    /// callee sides, respectively, were present in the request — either may
    /// be absent (e.g. a destination-only authorization).
    pub fn success(
        authorized: bool,
        authorized_destination: bool,
        balance: i64,
        carriers: Vec<String>,
        max_available_units: i64
    ) -> Self {
        Self {
            authorized,
            authorized_destination,
            balance: Some(balance),
            carriers,
            max_available_units: Some(max_available_units),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationTransactionRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub unauthorized_account_tag: Option<String>,
    #[serde(default)]
    pub unauthorized_reason: Option<UnauthorizedReason>,
    #[serde(default)]
    pub destination_account_tag: Option<String>,
    #[serde(default)]
    pub authorized_destination: bool,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default)]
    pub max_available_units: Option<i64>,
    #[serde(default)]
    pub carriers: Vec<String>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_auth: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OkOrFailedResponse {
    pub ok: bool,
    #[serde(default)]
    pub failed_account_tag: Option<String>,
    #[serde(default)]
    pub failed_reason: Option<FailedReason>
}

impl OkOrFailedResponse {
    pub fn ok() -> Self {
        Self { ok: true, ..Default::default() }
    }

    pub fn failed(account_tag: impl Into<String>, reason: FailedReason) -> Self {
        Self {
            ok: false,
            failed_account_tag: Some(account_tag.into()),
            failed_reason: Some(reason)
        }
    }

    pub fn not_ok() -> Self {
        Self { ok: false, ..Default::default() }
    }
}

pub type AuthorizationTransactionResponse = OkOrFailedResponse;
pub type BeginTransactionResponse = OkOrFailedResponse;
pub type EndTransactionResponse = OkOrFailedResponse;
pub type RecordTransactionResponse = OkOrFailedResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginTransactionRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub destination_account_tag: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub carrier_ip: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_begin: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndTransactionRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub destination_account_tag: Option<String>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_end: Option<DateTime<Utc>>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackTransactionRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub destination_account_tag: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackTransactionResponse {
    pub ok: bool
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTransactionRequest {
    #[serde(default)]
    pub tenant: Tenant,
    pub transaction_tag: String,
    #[serde(default)]
    pub account_tag: Option<String>,
    #[serde(default)]
    pub destination_account_tag: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub carrier_ip: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_auth: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_begin: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_end: Option<DateTime<Utc>>
}

/// One row returned by `get_primary_transactions`, used to restore routing
/// state when a later lifecycle event omits account tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryTransactionRef {
    pub account_tag: String,
    pub inbound: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub carrier_ip: Option<String>
}

/// The verdict snapshot persisted by `authorization_transaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationAuditRecord {
    pub transaction_tag: String,
    pub account_tag: String,
    pub authorized: bool,
    #[serde(default)]
    pub unauthorized_reason: Option<UnauthorizedReason>,
    pub balance: i64,
    pub max_available_units: i64,
    #[serde(default)]
    pub carriers: Vec<String>,
    #[serde(with = "crate::ts_format")]
    pub timestamp_auth: DateTime<Utc>,
    pub inbound: bool,
    pub primary: bool
}
