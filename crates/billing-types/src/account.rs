use serde::{Deserialize, Serialize};

use crate::{rate::Carrier, rate::DestinationRate, transaction::RunningTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Prepaid,
    Postpaid
}

/// An account as returned by the store, optionally enriched with a resolved
/// destination rate and least-cost-routing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_tag: String,
    pub account_type: AccountType,
    pub active: bool,
    pub balance: i64,
    #[serde(default)]
    pub max_concurrent_transactions: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pricelist_tags: Vec<String>,
    #[serde(default)]
    pub carrier_tags: Vec<String>,
    #[serde(default)]
    pub linked_accounts: Vec<Account>,
    #[serde(default)]
    pub running_transactions: Vec<RunningTransaction>,
    #[serde(default)]
    pub destination_rate: Option<DestinationRate>,
    #[serde(default)]
    pub least_cost_routing: Vec<Carrier>
}

impl Account {
    /// `[self] + linked_accounts`, the ordering `authorization` and
    /// `begin_transaction` iterate in (the fetched account is primary,
    /// `n == 0`).
    pub fn self_then_linked(&self) -> Vec<&Account> {
        std::iter::once(self)
            .chain(self.linked_accounts.iter())
            .collect()
    }

    /// `linked_accounts + [self]`, the ordering `end_transaction` and
    /// `record_transaction` iterate in.
    pub fn linked_then_self(&self) -> Vec<&Account> {
        self.linked_accounts.iter().chain(std::iter::once(self)).collect()
    }

    /// Sum of the rated fee of every currently running transaction on this
    /// account, used to derive the effective balance during authorization.
    pub fn running_transactions_fee(&self, fee_of: impl Fn(&RunningTransaction) -> i64) -> i64 {
        self.running_transactions.iter().map(fee_of).sum()
    }
}
