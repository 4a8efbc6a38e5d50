use billing_rater::MAX_UNITS;
use billing_store::StoreClient;
use billing_types::{
    account::{Account, AccountType},
    error::{FailedReason, UnauthorizedReason},
    method::Priority,
    rate::Carrier,
    request::{AuthorizationAuditRecord, AuthorizationRequest, AuthorizationResponse, AuthorizationTransactionRequest, OkOrFailedResponse}
};
use tracing::warn;

use crate::Engine;

fn check_side<'a>(
    tag: Option<&str>,
    account: Option<&'a Account>
) -> Result<Option<&'a Account>, (String, UnauthorizedReason)> {
    let Some(tag) = tag else { return Ok(None) };
    match account {
        None => Err((tag.to_string(), UnauthorizedReason::NotFound)),
        Some(account) if !account.active => Err((tag.to_string(), UnauthorizedReason::NotActive)),
        Some(account) => Ok(Some(account))
    }
}

impl<S, B> Engine<S, B>
where
    S: StoreClient,
    B: billing_bus::BusClient + 'static
{
    /// Decides whether a call is authorized, combining live account state,
    /// running-transaction bookkeeping, destination-rate selection, and
    /// concurrency caps. See the module-level design notes for the exact
    /// check ordering this implements.
    pub async fn authorization(&self, req: AuthorizationRequest) -> AuthorizationResponse {
        let timestamp_auth = req.timestamp_auth.unwrap_or_else(|| self.clock.now());

        if req.account_tag.is_none() && req.destination_account_tag.is_none() {
            return AuthorizationResponse::unspecified()
        }

        let tenant = req.tenant.as_ref();
        let (caller, callee) = self
            .store
            .get_account_and_destination(
                tenant,
                req.account_tag.as_deref(),
                req.destination_account_tag.as_deref(),
                req.destination.as_deref()
            )
            .await;

        let caller = match check_side(req.account_tag.as_deref(), caller.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return AuthorizationResponse::unauthorized(tag, reason)
        };
        if let Some(account) = caller {
            if account.destination_rate.is_none() {
                return AuthorizationResponse::unauthorized(
                    account.account_tag.clone(),
                    UnauthorizedReason::UnreachableDestination
                )
            }
        }

        let callee = match check_side(req.destination_account_tag.as_deref(), callee.as_ref()) {
            Ok(side) => side,
            Err((tag, reason)) => return AuthorizationResponse::unauthorized(tag, reason)
        };

        // Every return from this point on entered the per-account loop, so
        // every one of them emits the audit follow-up below.
        let carriers: Vec<String> =
            caller.map(|c| c.least_cost_routing.iter().map(Carrier::to_uri).collect()).unwrap_or_default();

        let mut max_available_units = MAX_UNITS;
        let mut last_balance = 0i64;
        let mut failure: Option<(String, UnauthorizedReason)> = None;

        'sides: for (account, inbound) in [(caller, false), (callee, true)] {
            let Some(account) = account else { continue };
            for item in account.self_then_linked() {
                let effective_balance = item.balance - item.running_transactions_fee(|rt| self.rater.fee(rt));
                last_balance = effective_balance;

                if let Some(cap) = item.max_concurrent_transactions {
                    if item.running_transactions.len() >= cap as usize {
                        failure =
                            Some((item.account_tag.clone(), UnauthorizedReason::TooManyRunningTransactions));
                        break 'sides
                    }
                }

                if !inbound && item.account_type == AccountType::Prepaid {
                    let (authorized, units) =
                        self.rater.max_allowed_units(effective_balance, item.destination_rate.as_ref());
                    max_available_units = max_available_units.min(units);
                    if !authorized {
                        failure = Some((item.account_tag.clone(), UnauthorizedReason::BalanceInsufficient));
                        break 'sides
                    }
                }
            }
        }

        let response = match failure {
            Some((tag, reason)) => {
                let mut response = AuthorizationResponse::unauthorized(tag, reason);
                response.balance = Some(last_balance);
                response.max_available_units = Some(max_available_units);
                response
            }
            None => AuthorizationResponse::success(
                caller.is_some(),
                callee.is_some(),
                last_balance,
                carriers,
                max_available_units
            )
        };

        self.emit_authorization_audit(&req, &response, timestamp_auth);
        response
    }

    /// Fire-and-forget: publish the verdict snapshot as a low-priority
    /// `authorization_transaction` RPC. Spawned rather than awaited so the
    /// caller's `authorization` reply is never blocked on the audit write.
    fn emit_authorization_audit(
        &self,
        req: &AuthorizationRequest,
        response: &AuthorizationResponse,
        timestamp_auth: chrono::DateTime<chrono::Utc>
    ) {
        let audit = AuthorizationTransactionRequest {
            tenant: req.tenant.clone(),
            transaction_tag: req.transaction_tag.clone(),
            account_tag: req.account_tag.clone(),
            authorized: response.authorized,
            unauthorized_account_tag: response.unauthorized_account_tag.clone(),
            unauthorized_reason: response.unauthorized_reason,
            destination_account_tag: req.destination_account_tag.clone(),
            authorized_destination: response.authorized_destination,
            balance: response.balance,
            max_available_units: response.max_available_units,
            carriers: response.carriers.clone(),
            timestamp_auth: Some(timestamp_auth)
        };

        let bus = self.bus.clone();
        tokio::spawn(async move {
            let payload = billing_types::envelope::RequestEnvelope { transaction: audit };
            let Ok(value) = serde_json::to_value(payload) else { return };
            if let Err(err) =
                bus.rpc_publish(billing_types::method::MethodName::AuthorizationTransaction.as_str(), value, Priority::Low)
                    .await
            {
                warn!(error = %err, "failed to publish authorization audit");
            }
        });
    }

    /// Persists one `AuthorizationAuditRecord` per non-null tag carried in
    /// the request. Any store failure short-circuits with the first
    /// affected `account_tag`.
    pub async fn authorization_transaction(&self, req: AuthorizationTransactionRequest) -> OkOrFailedResponse {
        let tenant = req.tenant.as_ref();
        let timestamp_auth = req.timestamp_auth.unwrap_or_else(|| self.clock.now());

        let sides = [
            (req.account_tag.as_ref(), req.authorized, false),
            (req.destination_account_tag.as_ref(), req.authorized_destination, true)
        ];

        for (tag, authorized, inbound) in sides {
            let Some(tag) = tag else { continue };
            let unauthorized_reason =
                (req.unauthorized_account_tag.as_deref() == Some(tag.as_str())).then_some(req.unauthorized_reason).flatten();
            let record = AuthorizationAuditRecord {
                transaction_tag: req.transaction_tag.clone(),
                account_tag: tag.clone(),
                authorized,
                unauthorized_reason,
                balance: req.balance.unwrap_or(0),
                max_available_units: req.max_available_units.unwrap_or(0),
                carriers: req.carriers.clone(),
                timestamp_auth,
                inbound,
                primary: true
            };

            if self.store.upsert_authorization_transaction(tenant, tag, &record).await.is_none() {
                return OkOrFailedResponse::failed(tag.clone(), FailedReason::InternalError)
            }
        }

        OkOrFailedResponse::ok()
    }
}
