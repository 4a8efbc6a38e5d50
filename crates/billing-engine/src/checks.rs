//! Shared account-validation and state-restore helpers used by every
//! handler that takes a `(caller, callee)` pair or needs to recover
//! routing state when a lifecycle event omits account tags.

use billing_store::StoreClient;
use billing_types::{
    account::Account,
    error::FailedReason,
    request::PrimaryTransactionRef
};

/// `NOT_FOUND`/`NOT_ACTIVE` check, reused for handlers whose error taxonomy
/// is `FailedReason` (begin/record) and, via `.into()`, for `authorization`
/// whose taxonomy is `UnauthorizedReason`.
///
/// Returns `Ok(None)` when `tag` itself is `None` (the side was not
/// requested, so there is nothing to check).
pub fn check_found_and_active<'a>(
    tag: Option<&str>,
    account: Option<&'a Account>
) -> Result<Option<&'a Account>, (String, FailedReason)> {
    let Some(tag) = tag else { return Ok(None) };
    match account {
        None => Err((tag.to_string(), FailedReason::NotFound)),
        Some(account) if !account.active => Err((tag.to_string(), FailedReason::NotActive)),
        Some(account) => Ok(Some(account))
    }
}

/// `NOT_FOUND`-only check (`end_transaction` does not re-check `active`).
pub fn check_found<'a>(
    tag: Option<&str>,
    account: Option<&'a Account>
) -> Result<Option<&'a Account>, (String, FailedReason)> {
    let Some(tag) = tag else { return Ok(None) };
    match account {
        None => Err((tag.to_string(), FailedReason::NotFound)),
        Some(account) => Ok(Some(account))
    }
}

/// Routing state recovered from `get_primary_transactions` when a lifecycle
/// event omits both account tags.
#[derive(Debug, Clone, Default)]
pub struct RestoredRouting {
    pub account_tag: Option<String>,
    pub destination_account_tag: Option<String>,
    pub source: Option<String>,
    pub source_ip: Option<String>,
    pub destination: Option<String>,
    pub carrier_ip: Option<String>
}

impl RestoredRouting {
    fn fold(rows: Vec<PrimaryTransactionRef>) -> Option<Self> {
        if rows.is_empty() {
            return None
        }

        let mut restored = RestoredRouting::default();
        for row in rows {
            if row.inbound {
                restored.destination_account_tag.get_or_insert(row.account_tag.clone());
            } else {
                restored.account_tag.get_or_insert(row.account_tag.clone());
            }
            restored.source = restored.source.take().or(row.source);
            restored.source_ip = restored.source_ip.take().or(row.source_ip);
            restored.destination = restored.destination.take().or(row.destination);
            restored.carrier_ip = restored.carrier_ip.take().or(row.carrier_ip);
        }
        Some(restored)
    }
}

pub async fn restore_routing(
    store: &(impl StoreClient + ?Sized),
    tenant: &str,
    transaction_tag: &str
) -> Option<RestoredRouting> {
    let rows = store.get_primary_transactions(tenant, transaction_tag).await;
    RestoredRouting::fold(rows)
}
