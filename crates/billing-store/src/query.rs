//! GraphQL query-string builders. Every interpolated value is rendered
//! through `serde_json::to_string`, which gives safe escaping for free
//! instead of the manual string formatting the query templates started
//! life as.

use chrono::{DateTime, Utc};

use crate::ts_rfc3339;

fn s(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn opt_s(value: Option<&str>) -> String {
    value.map(s).unwrap_or_else(|| "null".to_string())
}

fn ts(value: DateTime<Utc>) -> String {
    s(&ts_rfc3339(value))
}

pub fn get_account(tenant: &str, account_tag: &str, destination: Option<&str>) -> String {
    let rate_fragment = if destination.is_some() {
        format!(
            "destination_rate(destination: {}) {{ carrier_tag pricelist_tag prefix description \
             connect_fee rate rate_increment interval_start }} \
             least_cost_routing(destination: {}) {{ protocol host port }}",
            opt_s(destination),
            opt_s(destination)
        )
    } else {
        String::new()
    };

    format!(
        "query {{ account(tenant: {tenant}, account_tag: {account_tag}) {{ account_tag account_type \
         active balance max_concurrent_transactions tags pricelist_tags carrier_tags {rate_fragment} \
         linked_accounts {{ account_tag account_type active balance max_concurrent_transactions tags \
         pricelist_tags carrier_tags running_transactions {{ transaction_tag destination_rate {{ \
         carrier_tag pricelist_tag prefix description connect_fee rate rate_increment interval_start \
         }} source source_ip destination carrier_ip tags inbound primary timestamp_begin \
         timestamp_end }} }} running_transactions {{ transaction_tag destination_rate {{ carrier_tag \
         pricelist_tag prefix description connect_fee rate rate_increment interval_start }} source \
         source_ip destination carrier_ip tags inbound primary timestamp_begin timestamp_end }} }} }}",
        tenant = s(tenant),
        account_tag = s(account_tag)
    )
}

/// Concatenates a caller-side query (aliased `account`, with rate/LCR when
/// `destination` is given) and a callee-side query (aliased
/// `destination_account`, never rated) into a single round-trip document, the
/// way the reference implementation does.
pub fn get_account_and_destination(
    tenant: &str,
    account_tag: Option<&str>,
    destination_account_tag: Option<&str>,
    destination: Option<&str>
) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(tag) = account_tag {
        parts.push(get_account(tenant, tag, destination));
    }
    if let Some(tag) = destination_account_tag {
        parts.push(get_account(tenant, tag, None).replacen("account(", "destination_account: account(", 1));
    }
    if parts.is_empty() {
        return None
    }
    Some(parts.join(" "))
}

pub fn begin_account_transaction(
    tenant: &str,
    account_tag: &str,
    transaction_tag: &str,
    carrier_tag: Option<&str>,
    source: Option<&str>,
    source_ip: Option<&str>,
    destination: Option<&str>,
    carrier_ip: Option<&str>,
    timestamp_begin: DateTime<Utc>,
    inbound: bool,
    primary: bool
) -> String {
    format!(
        "mutation {{ begin_account_transaction(tenant: {tenant}, account_tag: {account_tag}, \
         transaction_tag: {transaction_tag}, carrier_tag: {carrier_tag}, source: {source}, \
         source_ip: {source_ip}, destination: {destination}, carrier_ip: {carrier_ip}, \
         timestamp_begin: {timestamp_begin}, inbound: {inbound}, primary: {primary}) {{ \
         transaction_tag source source_ip destination carrier_ip tags inbound primary \
         timestamp_begin timestamp_end }} }}",
        tenant = s(tenant),
        account_tag = s(account_tag),
        transaction_tag = s(transaction_tag),
        carrier_tag = opt_s(carrier_tag),
        source = opt_s(source),
        source_ip = opt_s(source_ip),
        destination = opt_s(destination),
        carrier_ip = opt_s(carrier_ip),
        timestamp_begin = ts(timestamp_begin)
    )
}

pub fn rollback_account_transaction(tenant: &str, account_tag: &str, transaction_tag: &str) -> String {
    format!(
        "mutation {{ rollback_account_transaction(tenant: {}, account_tag: {}, transaction_tag: {}) }}",
        s(tenant),
        s(account_tag),
        s(transaction_tag)
    )
}

pub fn end_account_transaction(
    tenant: &str,
    account_tag: &str,
    transaction_tag: &str,
    timestamp_end: DateTime<Utc>
) -> String {
    format!(
        "mutation {{ end_account_transaction(tenant: {}, account_tag: {}, transaction_tag: {}, \
         timestamp_end: {}) {{ transaction_tag destination_rate {{ carrier_tag pricelist_tag prefix \
         description connect_fee rate rate_increment interval_start }} source source_ip destination \
         carrier_ip tags inbound primary timestamp_begin timestamp_end }} }}",
        s(tenant),
        s(account_tag),
        s(transaction_tag),
        ts(timestamp_end)
    )
}

pub fn upsert_transaction(
    tenant: &str,
    account_tag: &str,
    transaction_tag: &str,
    source: Option<&str>,
    source_ip: Option<&str>,
    destination: Option<&str>,
    carrier_ip: Option<&str>,
    tags: &[String],
    inbound: bool,
    primary: bool,
    timestamp_begin: DateTime<Utc>,
    timestamp_end: DateTime<Utc>,
    duration: i64,
    fee: i64
) -> String {
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());
    format!(
        "mutation {{ upsert_transaction(tenant: {tenant}, account_tag: {account_tag}, \
         transaction_tag: {transaction_tag}, source: {source}, source_ip: {source_ip}, \
         destination: {destination}, carrier_ip: {carrier_ip}, tags: {tags_json}, inbound: \
         {inbound}, primary: {primary}, timestamp_begin: {timestamp_begin}, timestamp_end: \
         {timestamp_end}, duration: {duration}, fee: {fee}) }}",
        tenant = s(tenant),
        account_tag = s(account_tag),
        transaction_tag = s(transaction_tag),
        source = opt_s(source),
        source_ip = opt_s(source_ip),
        destination = opt_s(destination),
        carrier_ip = opt_s(carrier_ip),
        timestamp_begin = ts(timestamp_begin),
        timestamp_end = ts(timestamp_end)
    )
}

pub fn commit_account_transaction(
    tenant: &str,
    account_tag: &str,
    transaction_tag: &str,
    fee: i64
) -> String {
    format!(
        "mutation {{ commit_account_transaction(tenant: {}, account_tag: {}, transaction_tag: {}, \
         fee: {}) }}",
        s(tenant),
        s(account_tag),
        s(transaction_tag),
        fee
    )
}

#[allow(clippy::too_many_arguments)]
pub fn upsert_authorization_transaction(
    tenant: &str,
    account_tag: &str,
    transaction_tag: &str,
    authorized: bool,
    unauthorized_reason: Option<&str>,
    balance: i64,
    max_available_units: i64,
    carriers: &[String],
    timestamp_auth: DateTime<Utc>,
    inbound: bool,
    primary: bool
) -> String {
    let carriers_json = serde_json::to_string(carriers).unwrap_or_else(|_| "[]".to_string());
    format!(
        "mutation {{ upsert_authorization_transaction(tenant: {tenant}, account_tag: {account_tag}, \
         transaction_tag: {transaction_tag}, authorized: {authorized}, unauthorized_reason: \
         {unauthorized_reason}, balance: {balance}, max_available_units: {max_available_units}, \
         carriers: {carriers_json}, timestamp_auth: {timestamp_auth}, inbound: {inbound}, \
         primary: {primary}) }}",
        tenant = s(tenant),
        account_tag = s(account_tag),
        transaction_tag = s(transaction_tag),
        unauthorized_reason = opt_s(unauthorized_reason),
        timestamp_auth = ts(timestamp_auth)
    )
}

pub fn get_primary_transactions(tenant: &str, transaction_tag: &str) -> String {
    format!(
        "query {{ primary_transactions_by_tag(tenant: {}, transaction_tag: {}) {{ account_tag \
         inbound source source_ip destination carrier_ip }} }}",
        s(tenant),
        s(transaction_tag)
    )
}
