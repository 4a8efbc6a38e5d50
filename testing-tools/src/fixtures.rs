//! Small builders for the account/rate/transaction fixtures the
//! `billing-engine` and `billing-dispatch` test suites construct over and
//! over. Every builder returns a plain value with sane defaults so tests
//! only set the fields that matter to the scenario.

use billing_types::{
    account::{Account, AccountType},
    rate::{Carrier, DestinationRate},
    transaction::RunningTransaction
};
use chrono::{DateTime, Utc};

pub fn destination_rate(carrier_tag: &str, connect_fee: i64, rate: i64, rate_increment: u32) -> DestinationRate {
    DestinationRate {
        carrier_tag: carrier_tag.to_string(),
        pricelist_tag: "default".to_string(),
        prefix: "39".to_string(),
        description: None,
        connect_fee,
        rate,
        rate_increment,
        interval_start: 0
    }
}

pub fn carrier(host: &str, port: u16) -> Carrier {
    Carrier { protocol: "sip".to_string(), host: host.to_string(), port }
}

pub fn account(account_tag: &str, account_type: AccountType, balance: i64) -> Account {
    Account {
        account_tag: account_tag.to_string(),
        account_type,
        active: true,
        balance,
        max_concurrent_transactions: None,
        tags: vec![],
        pricelist_tags: vec![],
        carrier_tags: vec![],
        linked_accounts: vec![],
        running_transactions: vec![],
        destination_rate: None,
        least_cost_routing: vec![]
    }
}

pub fn running_transaction(transaction_tag: &str, timestamp_begin: DateTime<Utc>) -> RunningTransaction {
    RunningTransaction {
        transaction_tag: transaction_tag.to_string(),
        destination_rate: None,
        source: None,
        source_ip: None,
        destination: None,
        carrier_ip: None,
        tags: vec![],
        inbound: false,
        primary: true,
        timestamp_begin,
        timestamp_end: None
    }
}
