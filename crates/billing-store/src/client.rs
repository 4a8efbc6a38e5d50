//! The `StoreClient` trait decouples the engine from the concrete transport,
//! and [`GraphQlStoreClient`] is the production implementation posting the
//! query strings built in [`crate::query`] to a single GraphQL endpoint over
//! HTTP.

use async_trait::async_trait;
use billing_types::{
    account::Account,
    rate::DestinationRate,
    request::{AuthorizationAuditRecord, PrimaryTransactionRef},
    transaction::{RatedTransaction, RunningTransaction}
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::{error::StoreError, query};

/// Operations the engine needs from the account/pricelist/transaction store.
///
/// Every method returns `None` on a business-level "no such row"/"operation
/// failed" outcome; the engine treats `None` as an internal error. Transport
/// or protocol failures (connection refused, malformed JSON, a GraphQL
/// `errors` array) are logged at `warn` and folded into `None` as well — the
/// engine has no use for the distinction, only the store's own logs do.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn get_account_and_destination(
        &self,
        tenant: &str,
        account_tag: Option<&str>,
        destination_account_tag: Option<&str>,
        destination: Option<&str>
    ) -> (Option<Account>, Option<Account>);

    #[allow(clippy::too_many_arguments)]
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
    ) -> Option<RunningTransaction>;

    async fn rollback_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str
    ) -> Option<bool>;

    async fn end_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        timestamp_end: DateTime<Utc>
    ) -> Option<RunningTransaction>;

    async fn upsert_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction: &RatedTransaction,
        duration: i64,
        fee: i64
    ) -> Option<bool>;

    async fn commit_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        fee: i64
    ) -> Option<bool>;

    async fn upsert_authorization_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        record: &AuthorizationAuditRecord
    ) -> Option<bool>;

    async fn get_primary_transactions(
        &self,
        tenant: &str,
        transaction_tag: &str
    ) -> Vec<PrimaryTransactionRef>;
}

/// Production [`StoreClient`] backed by a single GraphQL HTTP endpoint.
///
/// Owns one pooled [`reqwest::Client`], created once per worker process and
/// cloned — `reqwest::Client` is an `Arc`-backed handle, so cloning is cheap
/// and safe to share across concurrently running handler tasks.
#[derive(Debug, Clone)]
pub struct GraphQlStoreClient {
    endpoint: Url,
    client: reqwest::Client,
    credentials: Option<(String, Option<String>)>
}

impl GraphQlStoreClient {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, client: reqwest::Client::new(), credentials: None }
    }

    pub fn with_basic_auth(mut self, username: String, password: Option<String>) -> Self {
        self.credentials = Some((username, password));
        self
    }

    async fn post(&self, query: String) -> Result<Value, StoreError> {
        let mut request =
            self.client.post(self.endpoint.clone()).json(&serde_json::json!({ "query": query }));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, password.as_deref());
        }

        let response = request.send().await?;
        let body: Value = response.json().await?;

        if let Some(errors) = body.get("errors") {
            return Err(StoreError::GraphQl(errors.to_string()))
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| StoreError::MalformedResponse("missing `data` field".to_string()))
    }

    fn extract<T: DeserializeOwned>(data: &Value, field: &str) -> Option<T> {
        data.get(field).filter(|v| !v.is_null()).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    async fn run<T: DeserializeOwned>(&self, query: String, field: &str) -> Option<T> {
        match self.post(query).await {
            Ok(data) => Self::extract(&data, field),
            Err(err) => {
                warn!(error = %err, %field, "store request failed");
                None
            }
        }
    }
}

#[async_trait]
impl StoreClient for GraphQlStoreClient {
    async fn get_account_and_destination(
        &self,
        tenant: &str,
        account_tag: Option<&str>,
        destination_account_tag: Option<&str>,
        destination: Option<&str>
    ) -> (Option<Account>, Option<Account>) {
        let Some(doc) =
            query::get_account_and_destination(tenant, account_tag, destination_account_tag, destination)
        else {
            return (None, None)
        };

        match self.post(doc).await {
            Ok(data) => {
                let account = account_tag.and_then(|_| Self::extract::<Account>(&data, "account"));
                let destination_account = destination_account_tag
                    .and_then(|_| Self::extract::<Account>(&data, "destination_account"));
                (account, destination_account)
            }
            Err(err) => {
                warn!(error = %err, "get_account_and_destination failed");
                (None, None)
            }
        }
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
        let doc = query::begin_account_transaction(
            tenant,
            account_tag,
            transaction_tag,
            destination_rate.map(|dr| dr.carrier_tag.as_str()),
            source,
            source_ip,
            destination,
            carrier_ip,
            timestamp_begin,
            inbound,
            primary
        );
        self.run(doc, "begin_account_transaction").await
    }

    async fn rollback_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str
    ) -> Option<bool> {
        let doc = query::rollback_account_transaction(tenant, account_tag, transaction_tag);
        self.run(doc, "rollback_account_transaction").await
    }

    async fn end_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        timestamp_end: DateTime<Utc>
    ) -> Option<RunningTransaction> {
        let doc = query::end_account_transaction(tenant, account_tag, transaction_tag, timestamp_end);
        self.run(doc, "end_account_transaction").await
    }

    async fn upsert_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction: &RatedTransaction,
        duration: i64,
        fee: i64
    ) -> Option<bool> {
        let doc = query::upsert_transaction(
            tenant,
            account_tag,
            &transaction.transaction_tag,
            transaction.source.as_deref(),
            transaction.source_ip.as_deref(),
            transaction.destination.as_deref(),
            transaction.carrier_ip.as_deref(),
            &transaction.tags,
            transaction.inbound,
            transaction.primary,
            transaction.timestamp_begin,
            transaction.timestamp_end.unwrap_or(transaction.timestamp_begin),
            duration,
            fee
        );
        self.run(doc, "upsert_transaction").await
    }

    async fn commit_account_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        transaction_tag: &str,
        fee: i64
    ) -> Option<bool> {
        let doc = query::commit_account_transaction(tenant, account_tag, transaction_tag, fee);
        self.run(doc, "commit_account_transaction").await
    }

    async fn upsert_authorization_transaction(
        &self,
        tenant: &str,
        account_tag: &str,
        record: &AuthorizationAuditRecord
    ) -> Option<bool> {
        let reason = record.unauthorized_reason.and_then(|r| {
            serde_json::to_value(r).ok().and_then(|v| v.as_str().map(str::to_string))
        });
        let doc = query::upsert_authorization_transaction(
            tenant,
            account_tag,
            &record.transaction_tag,
            record.authorized,
            reason.as_deref(),
            record.balance,
            record.max_available_units,
            &record.carriers,
            record.timestamp_auth,
            record.inbound,
            record.primary
        );
        self.run(doc, "upsert_authorization_transaction").await
    }

    async fn get_primary_transactions(
        &self,
        tenant: &str,
        transaction_tag: &str
    ) -> Vec<PrimaryTransactionRef> {
        let doc = query::get_primary_transactions(tenant, transaction_tag);
        match self.post(doc).await {
            Ok(data) => Self::extract(&data, "primary_transactions_by_tag").unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "get_primary_transactions failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate
    };

    use super::*;

    async fn server() -> (MockServer, GraphQlStoreClient) {
        let server = MockServer::start().await;
        let client = GraphQlStoreClient::new(Url::parse(&server.uri()).unwrap());
        (server, client)
    }

    #[tokio::test]
    async fn commit_account_transaction_true_on_success() {
        let (server, client) = server().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "commit_account_transaction": true }
            })))
            .mount(&server)
            .await;

        let result = client.commit_account_transaction("default", "1000", "100", 42).await;
        assert_eq!(result, Some(true));
    }

    #[tokio::test]
    async fn graphql_errors_array_surfaces_as_none() {
        let (server, client) = server().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{ "message": "account not found" }]
            })))
            .mount(&server)
            .await;

        let result = client.rollback_account_transaction("default", "1000", "100").await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_none() {
        let (server, client) = server().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client.commit_account_transaction("default", "1000", "100", 42).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn basic_auth_credentials_are_attached() {
        let (server, client) = server().await;
        let client = client.with_basic_auth("svc".to_string(), Some("secret".to_string()));
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("Authorization", "Basic c3ZjOnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "commit_account_transaction": true }
            })))
            .mount(&server)
            .await;

        let result = client.commit_account_transaction("default", "1000", "100", 42).await;
        assert_eq!(result, Some(true));
    }

    #[tokio::test]
    async fn get_account_and_destination_extracts_both_aliases() {
        let (server, client) = server().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "account": {
                        "account_tag": "1000",
                        "account_type": "prepaid",
                        "active": true,
                        "balance": 100,
                        "max_concurrent_transactions": null,
                        "tags": [],
                        "pricelist_tags": [],
                        "carrier_tags": [],
                        "linked_accounts": [],
                        "running_transactions": [],
                        "destination_rate": null,
                        "least_cost_routing": []
                    },
                    "destination_account": {
                        "account_tag": "2000",
                        "account_type": "prepaid",
                        "active": true,
                        "balance": 0,
                        "max_concurrent_transactions": null,
                        "tags": [],
                        "pricelist_tags": [],
                        "carrier_tags": [],
                        "linked_accounts": [],
                        "running_transactions": [],
                        "destination_rate": null,
                        "least_cost_routing": []
                    }
                }
            })))
            .mount(&server)
            .await;

        let (account, destination) = client
            .get_account_and_destination("default", Some("1000"), Some("2000"), Some("393291234567"))
            .await;
        assert_eq!(account.unwrap().account_tag, "1000");
        assert_eq!(destination.unwrap().account_tag, "2000");
    }
}
