use std::sync::Arc;

use billing_engine::Engine;
use billing_rater::{FixedClock, Rater};
use billing_types::{
    account::AccountType,
    error::{FailedReason, UnauthorizedReason},
    request::{
        AuthorizationRequest, AuthorizationTransactionRequest, BeginTransactionRequest, EndTransactionRequest,
        PrimaryTransactionRef, RecordTransactionRequest
    }
};
use chrono::{Duration, Utc};
use testing_tools::{
    fixtures::{account, destination_rate},
    FakeBus, FakeStore
};

fn engine(store: Arc<FakeStore>, bus: Arc<FakeBus>, now: chrono::DateTime<Utc>) -> Engine<FakeStore, FakeBus> {
    Engine::new(store, bus, Rater::utc(Arc::new(FixedClock(now))), Arc::new(FixedClock(now)))
}

// S1
#[tokio::test]
async fn authorization_with_no_accounts_is_unspecified() {
    let engine = engine(Arc::new(FakeStore::new()), Arc::new(FakeBus::new()), Utc::now());

    let response = engine
        .authorization(AuthorizationRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: None,
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: None,
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None
        })
        .await;

    assert!(!response.authorized);
    assert!(response.unauthorized_reason.is_none());
}

// S2
#[tokio::test]
async fn authorization_against_missing_account_is_not_found() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let engine = engine(store.clone(), bus.clone(), Utc::now());

    let response = engine
        .authorization(AuthorizationRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None
        })
        .await;

    assert!(!response.authorized);
    assert_eq!(response.unauthorized_account_tag.as_deref(), Some("1000"));
    assert_eq!(response.unauthorized_reason, Some(UnauthorizedReason::NotFound));
    assert!(bus.published().is_empty());
}

// S3
#[tokio::test]
async fn authorization_with_zero_balance_is_balance_insufficient() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());

    let mut caller = account("1000", AccountType::Prepaid, 0);
    caller.destination_rate = Some(destination_rate("carrier1", 0, 1, 1));
    store.seed_account("default", caller);

    let engine = engine(store.clone(), bus.clone(), Utc::now());
    let response = engine
        .authorization(AuthorizationRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None
        })
        .await;

    assert!(!response.authorized);
    assert_eq!(response.unauthorized_reason, Some(UnauthorizedReason::BalanceInsufficient));

    // gives the audit publish's spawned task a chance to run
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let published = bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "authorization_transaction");
}

// S4
#[tokio::test]
async fn authorization_after_begin_reflects_effective_balance() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let now = Utc::now();

    let mut caller = account("1000", AccountType::Prepaid, 20);
    caller.destination_rate = Some(destination_rate("carrier1", 0, 1, 1));
    caller.least_cost_routing = vec![testing_tools::fixtures::carrier("carrier1.canyan.io", 5060)];
    store.seed_account("default", caller);

    let engine = engine(store.clone(), bus.clone(), now);

    let begin = engine
        .begin_transaction(BeginTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_begin: Some(now - Duration::seconds(15))
        })
        .await;
    assert!(begin.ok);

    let response = engine
        .authorization(AuthorizationRequest {
            tenant: Default::default(),
            transaction_tag: "101".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None
        })
        .await;

    assert!(response.authorized);
    assert_eq!(response.carriers, vec!["sip:carrier1.canyan.io:5060".to_string()]);
    let balance = response.balance.unwrap();
    assert!((3..=4).contains(&balance), "balance was {balance}");
}

// S5
#[tokio::test]
async fn full_lifecycle_rates_both_sides() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let now = Utc::now();

    let mut caller = account("1000", AccountType::Prepaid, 1_000_000);
    caller.destination_rate = Some(destination_rate("carrier1", 0, 1, 1));
    store.seed_account("default", caller);
    store.seed_account("default", account("2000", AccountType::Prepaid, 1_000_000));

    let engine = engine(store.clone(), bus.clone(), now);

    let auth = engine
        .authorization(AuthorizationRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: Some("2000".into()),
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None
        })
        .await;
    assert!(auth.authorized);
    assert!(auth.authorized_destination);

    let begin = engine
        .begin_transaction(BeginTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: Some("2000".into()),
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_begin: Some(now - Duration::seconds(5))
        })
        .await;
    assert!(begin.ok);

    let end = engine
        .end_transaction(EndTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: Some("2000".into()),
            timestamp_end: Some(now)
        })
        .await;
    assert!(end.ok);

    let completed = store.completed_transactions();
    let caller_row = completed.iter().find(|(_, tag, _)| tag == "1000").unwrap();
    assert!(caller_row.2.duration >= 1);
    assert!(caller_row.2.fee >= 1);
    assert!(caller_row.2.primary);
    assert!(!caller_row.2.inbound);

    let callee_row = completed.iter().find(|(_, tag, _)| tag == "2000").unwrap();
    assert!(callee_row.2.inbound);
}

#[tokio::test]
async fn authorization_transaction_only_stamps_reason_on_the_account_that_failed() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let now = Utc::now();

    store.seed_account("default", account("1000", AccountType::Prepaid, 0));
    store.seed_account("default", account("2000", AccountType::Prepaid, 1_000_000));

    let engine = engine(store.clone(), bus.clone(), now);
    let response = engine
        .authorization_transaction(AuthorizationTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            authorized: false,
            unauthorized_account_tag: Some("1000".into()),
            unauthorized_reason: Some(UnauthorizedReason::BalanceInsufficient),
            destination_account_tag: Some("2000".into()),
            authorized_destination: true,
            balance: Some(0),
            max_available_units: Some(0),
            carriers: vec![],
            timestamp_auth: None
        })
        .await;
    assert!(response.ok);

    let audits = store.authorization_audits();
    let caller_audit = &audits.iter().find(|(_, tag, _)| tag == "1000").unwrap().2;
    assert_eq!(caller_audit.unauthorized_reason, Some(UnauthorizedReason::BalanceInsufficient));

    let callee_audit = &audits.iter().find(|(_, tag, _)| tag == "2000").unwrap().2;
    assert_eq!(callee_audit.unauthorized_reason, None);
}

// S6
#[tokio::test]
async fn begin_transaction_restores_account_tag_from_audit_history() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());

    store.seed_account("default", account("1000", AccountType::Prepaid, 1_000_000));
    store.seed_primary_transactions(
        "default",
        "100",
        vec![PrimaryTransactionRef {
            account_tag: "1000".to_string(),
            inbound: false,
            source: None,
            source_ip: None,
            destination: None,
            carrier_ip: None
        }]
    );

    let engine = engine(store.clone(), bus.clone(), Utc::now());
    let begin = engine
        .begin_transaction(BeginTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: None,
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: None,
            carrier_ip: None,
            tags: vec![],
            timestamp_begin: None
        })
        .await;

    assert!(begin.ok);
    let restored = store.account("default", "1000").unwrap();
    assert_eq!(restored.running_transactions.len(), 1);
}

// S7
#[tokio::test]
async fn record_transaction_persists_a_rated_row() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let now = Utc::now();

    let mut caller = account("1000", AccountType::Prepaid, 100);
    caller.tags = vec!["A1".to_string()];
    caller.destination_rate = Some(destination_rate("carrier1", 0, 1, 1));
    store.seed_account("default", caller);

    let engine = engine(store.clone(), bus.clone(), now);
    let response = engine
        .record_transaction(RecordTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec!["T1".to_string()],
            timestamp_auth: None,
            timestamp_begin: Some(now),
            timestamp_end: Some(now + Duration::seconds(1))
        })
        .await;

    assert!(response.ok);
    let completed = store.completed_transactions();
    let row = &completed.iter().find(|(_, tag, _)| tag == "1000").unwrap().2;
    assert_eq!(row.duration, 1);
    assert_eq!(row.fee, 1);
    assert_eq!(row.tags, vec!["T1".to_string(), "A1".to_string()]);
    assert!(!row.inbound);
    assert!(row.primary);
}

// S8
#[tokio::test]
async fn record_transaction_surfaces_store_failure() {
    let store = Arc::new(FakeStore::new());
    let bus = Arc::new(FakeBus::new());
    let now = Utc::now();

    let mut caller = account("1000", AccountType::Prepaid, 100);
    caller.destination_rate = Some(destination_rate("carrier1", 0, 1, 1));
    store.seed_account("default", caller);
    store.fail_account("1000");

    let engine = engine(store.clone(), bus.clone(), now);
    let response = engine
        .record_transaction(RecordTransactionRequest {
            tenant: Default::default(),
            transaction_tag: "100".into(),
            account_tag: Some("1000".into()),
            destination_account_tag: None,
            source: None,
            source_ip: None,
            destination: Some("393291234567".into()),
            carrier_ip: None,
            tags: vec![],
            timestamp_auth: None,
            timestamp_begin: Some(now),
            timestamp_end: Some(now + Duration::seconds(1))
        })
        .await;

    assert!(!response.ok);
    assert_eq!(response.failed_account_tag.as_deref(), Some("1000"));
    assert_eq!(response.failed_reason, Some(FailedReason::InternalError));
}
