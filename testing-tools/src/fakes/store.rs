use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use billing_store::StoreClient;
use billing_types::{
    account::Account,
    rate::DestinationRate,
    request::{AuthorizationAuditRecord, PrimaryTransactionRef},
    transaction::{CompletedTransaction, RatedTransaction, RunningTransaction}
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    accounts: HashMap<(String, String), Account>,
    primary_transactions: HashMap<(String, String), Vec<PrimaryTransactionRef>>,
    authorization_audits: Vec<(String, String, AuthorizationAuditRecord)>,
    completed: Vec<(String, String, CompletedTransaction)>,
    failing: HashSet<String>
}

/// An in-memory [`StoreClient`] seeded with a fixed set of accounts, used by
/// `billing-engine`'s own test suite and by anything that drives an `Engine`
/// end to end without a real GraphQL backend.
///
/// Every mutation resolves an account tag against both the top-level account
/// map and the `linked_accounts` embedded in whichever top-level account
/// carries it — mirroring the one-level-deep nesting the real store returns,
/// without modelling a full relational join.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_account(&self, tenant: &str, account: Account) {
        self.state.lock().accounts.insert((tenant.to_string(), account.account_tag.clone()), account);
    }

    pub fn seed_primary_transactions(&self, tenant: &str, transaction_tag: &str, rows: Vec<PrimaryTransactionRef>) {
        self.state
            .lock()
            .primary_transactions
            .insert((tenant.to_string(), transaction_tag.to_string()), rows);
    }

    /// Makes every store operation touching `account_tag` return the
    /// "operation failed" outcome, to exercise the engine's `InternalError`
    /// paths.
    pub fn fail_account(&self, account_tag: &str) {
        self.state.lock().failing.insert(account_tag.to_string());
    }

    pub fn account(&self, tenant: &str, account_tag: &str) -> Option<Account> {
        self.state.lock().accounts.get(&(tenant.to_string(), account_tag.to_string())).cloned()
    }

    pub fn authorization_audits(&self) -> Vec<(String, String, AuthorizationAuditRecord)> {
        self.state.lock().authorization_audits.clone()
    }

    pub fn completed_transactions(&self) -> Vec<(String, String, CompletedTransaction)> {
        self.state.lock().completed.clone()
    }

    fn with_account_mut<R>(&self, tenant: &str, tag: &str, f: impl FnOnce(&mut Account) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.failing.contains(tag) {
            return None
        }

        if let Some(account) = state.accounts.get_mut(&(tenant.to_string(), tag.to_string())) {
            return Some(f(account))
        }

        for ((account_tenant, _), account) in state.accounts.iter_mut() {
            if account_tenant != tenant {
                continue
            }
            if let Some(linked) = account.linked_accounts.iter_mut().find(|l| l.account_tag == tag) {
                return Some(f(linked))
            }
        }

        None
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn get_account_and_destination(
        &self,
        tenant: &str,
        account_tag: Option<&str>,
        destination_account_tag: Option<&str>,
        _destination: Option<&str>
    ) -> (Option<Account>, Option<Account>) {
        let state = self.state.lock();
        let lookup = |tag: Option<&str>| {
            tag.and_then(|tag| state.accounts.get(&(tenant.to_string(), tag.to_string())).cloned())
        };
        (lookup(account_tag), lookup(destination_account_tag))
    }

    async fn begin_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        destination_rate: Option<&DestinationRate>,
        source: Option<&str>,
        source_ip: Option<&str>,
        destination: Option<&str>,
        carrier_ip: Option<&str>,
        timestamp_begin: DateTime<Utc>,
        inbound: bool,
        primary: bool
    ) -> Option<RunningTransaction> {
        let transaction = RunningTransaction {
            transaction_tag: transaction_tag.to_string(),
            destination_rate: destination_rate.cloned(),
            source: source.map(str::to_string),
            source_ip: source_ip.map(str::to_string),
            destination: destination.map(str::to_string),
            carrier_ip: carrier_ip.map(str::to_string),
            tags: vec![],
            inbound,
            primary,
            timestamp_begin,
            timestamp_end: None
        };

        self.with_account_mut(tenant, account_tag, |account| {
            account.running_transactions.push(transaction.clone());
            transaction
        })
    }

    async fn rollback_account_transaction(&self, tenant: &str, account_tag: &str, transaction_tag: &str) -> Option<bool> {
        self.with_account_mut(tenant, account_tag, |account| {
            let before = account.running_transactions.len();
            account.running_transactions.retain(|tx| tx.transaction_tag != transaction_tag);
            account.running_transactions.len() < before
        })
    }

    async fn end_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        timestamp_end: DateTime<Utc>
    ) -> Option<RunningTransaction> {
        self.with_account_mut(tenant, account_tag, |account| {
            let index = account.running_transactions.iter().position(|tx| tx.transaction_tag == transaction_tag)?;
            let mut transaction = account.running_transactions.remove(index);
            transaction.timestamp_end = Some(timestamp_end);
            Some(transaction)
        })
        .flatten()
    }

    async fn upsert_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction: &RatedTransaction,
        duration: i64,
        fee: i64
    ) -> Option<bool> {
        if self.state.lock().failing.contains(account_tag) {
            return None
        }
        let completed = CompletedTransaction::from_rated(transaction, duration, fee);
        self.state.lock().completed.push((tenant.to_string(), account_tag.to_string(), completed));
        Some(true)
    }

    async fn commit_account_transaction(&self, tenant: &str, account_tag: &str, _transaction_tag: &str, fee: i64) -> Option<bool> {
        self.with_account_mut(tenant, account_tag, |account| {
            account.balance -= fee;
            true
        })
    }

    async fn upsert_authorization_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        record: &AuthorizationAuditRecord
    ) -> Option<bool> {
        if self.state.lock().failing.contains(account_tag) {
            return None
        }
        self.state.lock().authorization_audits.push((tenant.to_string(), account_tag.to_string(), record.clone()));
        Some(true)
    }

    async fn get_primary_transactions(&self, tenant: &str, transaction_tag: &str) -> Vec<PrimaryTransactionRef> {
        self.state
            .lock()
            .primary_transactions
            .get(&(tenant.to_string(), transaction_tag.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}
