use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rate::DestinationRate;

/// A per-account row representing a call that has begun (and possibly
/// ended) on this account. The store guarantees `(tenant, account_tag,
/// transaction_tag)` is unique among in-progress transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningTransaction {
    pub transaction_tag: String,
    #[serde(default)]
    pub destination_rate: Option<DestinationRate>,
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
    pub inbound: bool,
    pub primary: bool,
    #[serde(with = "crate::ts_format")]
    pub timestamp_begin: DateTime<Utc>,
    #[serde(default, with = "crate::ts_format::option")]
    pub timestamp_end: Option<DateTime<Utc>>
}

/// The shape the rater consumes: identical to [`RunningTransaction`]. Kept
/// as a distinct name because a `record_transaction` call synthesizes one
/// directly from the request instead of fetching it from the store.
pub type RatedTransaction = RunningTransaction;

/// The final, persisted record: a rated transaction plus its computed
/// duration and fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTransaction {
    pub transaction_tag: String,
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
    pub inbound: bool,
    pub primary: bool,
    #[serde(with = "crate::ts_format")]
    pub timestamp_begin: DateTime<Utc>,
    #[serde(with = "crate::ts_format")]
    pub timestamp_end: DateTime<Utc>,
    pub duration: i64,
    pub fee: i64
}

impl CompletedTransaction {
    pub fn from_rated(tx: &RatedTransaction, duration: i64, fee: i64) -> Self {
        Self {
            transaction_tag: tx.transaction_tag.clone(),
            source: tx.source.clone(),
            source_ip: tx.source_ip.clone(),
            destination: tx.destination.clone(),
            carrier_ip: tx.carrier_ip.clone(),
            tags: tx.tags.clone(),
            inbound: tx.inbound,
            primary: tx.primary,
            timestamp_begin: tx.timestamp_begin,
            timestamp_end: tx.timestamp_end.unwrap_or(tx.timestamp_begin),
            duration,
            fee
        }
    }
}
