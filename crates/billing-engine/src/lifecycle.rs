use billing_store::StoreClient;
use billing_types::{
    error::FailedReason,
    request::{
        BeginTransactionRequest, EndTransactionRequest, OkOrFailedResponse, RecordTransactionRequest,
        RollbackTransactionRequest, RollbackTransactionResponse
    },
    transaction::RatedTransaction
};

use crate::{
    checks::{check_found, check_found_and_active, restore_routing},
    Engine
};

impl<S, B> Engine<S, B>
where
    S: StoreClient,
    B: billing_bus::BusClient + 'static
{
    /// Opens a running-transaction row on every present side (and its linked
    /// accounts), primary-first (`self_then_linked`).
    pub async fn begin_transaction(&self, mut req: BeginTransactionRequest) -> OkOrFailedResponse {
        let timestamp_begin = req.timestamp_begin.unwrap_or_else(|| self.clock.now());
        let tenant = req.tenant.0.clone();

        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            if let Some(restored) = restore_routing(&*self.store, &tenant, &req.transaction_tag).await {
                req.account_tag = req.account_tag.or(restored.account_tag);
                req.destination_account_tag = req.destination_account_tag.or(restored.destination_account_tag);
                req.source = req.source.or(restored.source);
                req.source_ip = req.source_ip.or(restored.source_ip);
                req.destination = req.destination.or(restored.destination);
                req.carrier_ip = req.carrier_ip.or(restored.carrier_ip);
            }
        }
        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            return OkOrFailedResponse::not_ok()
        }

        let (caller, callee) = self
            .store
            .get_account_and_destination(
                &tenant,
                req.account_tag.as_deref(),
                req.destination_account_tag.as_deref(),
                req.destination.as_deref()
            )
            .await;

        let caller = match check_found_and_active(req.account_tag.as_deref(), caller.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };
        let callee = match check_found_and_active(req.destination_account_tag.as_deref(), callee.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };

        for (account, inbound) in [(caller, false), (callee, true)] {
            let Some(account) = account else { continue };
            for (n, item) in account.self_then_linked().into_iter().enumerate() {
                let primary = n == 0;
                let destination_rate = if inbound { None } else { item.destination_rate.as_ref() };

                let result = self
                    .store
                    .begin_account_transaction(
                        &tenant,
                        &item.account_tag,
                        &req.transaction_tag,
                        destination_rate,
                        req.source.as_deref(),
                        req.source_ip.as_deref(),
                        req.destination.as_deref(),
                        req.carrier_ip.as_deref(),
                        timestamp_begin,
                        inbound,
                        primary
                    )
                    .await;

                if result.is_none() {
                    return OkOrFailedResponse::failed(item.account_tag.clone(), FailedReason::InternalError)
                }
            }
        }

        OkOrFailedResponse::ok()
    }

    /// Closes the running-transaction row on every present side, rates it,
    /// and commits the fee. Iterates `linked_then_self`, the reverse of
    /// `begin_transaction`'s order, and only checks `NOT_FOUND` (not
    /// `active`) since an account may be deactivated mid-call.
    pub async fn end_transaction(&self, mut req: EndTransactionRequest) -> OkOrFailedResponse {
        let timestamp_end = req.timestamp_end.unwrap_or_else(|| self.clock.now());
        let tenant = req.tenant.0.clone();

        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            if let Some(restored) = restore_routing(&*self.store, &tenant, &req.transaction_tag).await {
                req.account_tag = req.account_tag.or(restored.account_tag);
                req.destination_account_tag = req.destination_account_tag.or(restored.destination_account_tag);
            }
        }
        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            return OkOrFailedResponse::not_ok()
        }

        let (caller, callee) = self
            .store
            .get_account_and_destination(&tenant, req.account_tag.as_deref(), req.destination_account_tag.as_deref(), None)
            .await;

        let caller = match check_found(req.account_tag.as_deref(), caller.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };
        let callee = match check_found(req.destination_account_tag.as_deref(), callee.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };

        for account in [caller, callee].into_iter().flatten() {
            for item in account.linked_then_self() {
                let Some(mut tx) =
                    self.store.end_account_transaction(&tenant, &item.account_tag, &req.transaction_tag, timestamp_end).await
                else {
                    return OkOrFailedResponse::failed(item.account_tag.clone(), FailedReason::InternalError)
                };
                tx.timestamp_end = Some(timestamp_end);

                let (fee, duration) = self.rater.fee_and_duration(&tx);

                if self.store.upsert_transaction(&tenant, &item.account_tag, &tx, duration, fee).await.is_none() {
                    return OkOrFailedResponse::failed(item.account_tag.clone(), FailedReason::InternalError)
                }
                if self.store.commit_account_transaction(&tenant, &item.account_tag, &req.transaction_tag, fee).await.is_none()
                {
                    return OkOrFailedResponse::failed(item.account_tag.clone(), FailedReason::InternalError)
                }
            }
        }

        OkOrFailedResponse::ok()
    }

    /// Drops the running-transaction row on every present side without
    /// rating or committing anything. `ok` is true only if every present
    /// side's rollback succeeded.
    pub async fn rollback_transaction(&self, mut req: RollbackTransactionRequest) -> RollbackTransactionResponse {
        let tenant = req.tenant.0.clone();

        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            if let Some(restored) = restore_routing(&*self.store, &tenant, &req.transaction_tag).await {
                req.account_tag = req.account_tag.or(restored.account_tag);
                req.destination_account_tag = req.destination_account_tag.or(restored.destination_account_tag);
            }
        }
        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            return RollbackTransactionResponse { ok: false }
        }

        let mut ok = true;
        for tag in [req.account_tag.as_deref(), req.destination_account_tag.as_deref()].into_iter().flatten() {
            let result = self.store.rollback_account_transaction(&tenant, tag, &req.transaction_tag).await;
            ok &= result.unwrap_or(false);
        }

        RollbackTransactionResponse { ok }
    }

    /// Records a completed transaction directly, without ever opening a
    /// running-transaction row for it, and without committing a fee — the
    /// caller is expected to have already adjusted the balance out of band.
    pub async fn record_transaction(&self, mut req: RecordTransactionRequest) -> OkOrFailedResponse {
        let timestamp_begin = req.timestamp_begin.unwrap_or_else(|| self.clock.now());
        let timestamp_end = req.timestamp_end.unwrap_or_else(|| self.clock.now());
        let tenant = req.tenant.0.clone();

        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            if let Some(restored) = restore_routing(&*self.store, &tenant, &req.transaction_tag).await {
                req.account_tag = req.account_tag.or(restored.account_tag);
                req.destination_account_tag = req.destination_account_tag.or(restored.destination_account_tag);
                req.source = req.source.or(restored.source);
                req.source_ip = req.source_ip.or(restored.source_ip);
                req.destination = req.destination.or(restored.destination);
                req.carrier_ip = req.carrier_ip.or(restored.carrier_ip);
            }
        }
        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            return OkOrFailedResponse::not_ok()
        }

        let (caller, callee) = self
            .store
            .get_account_and_destination(
                &tenant,
                req.account_tag.as_deref(),
                req.destination_account_tag.as_deref(),
                req.destination.as_deref()
            )
            .await;

        let caller = match check_found_and_active(req.account_tag.as_deref(), caller.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };
        let callee = match check_found_and_active(req.destination_account_tag.as_deref(), callee.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return OkOrFailedResponse::failed(tag, reason)
        };

        for (account, inbound) in [(caller, false), (callee, true)] {
            let Some(account) = account else { continue };
            let items = account.linked_then_self();
            let last = items.len().saturating_sub(1);

            for (n, item) in items.into_iter().enumerate() {
                let primary = n == last;
                let destination_rate = if inbound { None } else { item.destination_rate.clone() };

                let mut tags = req.tags.clone();
                tags.extend(item.tags.clone());

                let synthesized = RatedTransaction {
                    transaction_tag: req.transaction_tag.clone(),
                    destination_rate,
                    source: req.source.clone(),
                    source_ip: req.source_ip.clone(),
                    destination: req.destination.clone(),
                    carrier_ip: req.carrier_ip.clone(),
                    tags,
                    inbound,
                    primary,
                    timestamp_begin,
                    timestamp_end: Some(timestamp_end)
                };

                let (fee, duration) = self.rater.fee_and_duration(&synthesized);

                if self.store.upsert_transaction(&tenant, &item.account_tag, &synthesized, duration, fee).await.is_none() {
                    return OkOrFailedResponse::failed(item.account_tag.clone(), FailedReason::InternalError)
                }
            }
        }

        OkOrFailedResponse::ok()
    }
}
