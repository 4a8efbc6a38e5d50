//! Binds the six bus method names to [`Engine`] handlers: decodes each
//! request envelope, surfaces validation errors in the shape a pydantic
//! `ValidationError.errors()` call would, and logs every request/response
//! pair at `debug`.

use std::{future::Future, pin::Pin, sync::Arc};

use billing_bus::{handler, BusClient, BusError};
use billing_engine::Engine;
use billing_store::StoreClient;
use billing_types::{
    envelope::ValidationErrorEnvelope,
    method::MethodName,
    request::{
        AuthorizationRequest, AuthorizationTransactionRequest, BeginTransactionRequest, EndTransactionRequest,
        RecordTransactionRequest, RollbackTransactionRequest
    }
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// The binding layer between the message bus and the engine. Registers one
/// handler per [`MethodName`] and then returns; the bus client's own
/// consumer tasks keep delivering messages afterwards.
pub struct Dispatcher<S, B> {
    engine: Arc<Engine<S, B>>,
    bus: Arc<B>
}

impl<S, B> Dispatcher<S, B>
where
    S: StoreClient + 'static,
    B: BusClient + 'static
{
    pub fn new(engine: Arc<Engine<S, B>>, bus: Arc<B>) -> Self {
        Self { engine, bus }
    }

    pub async fn run(&self) -> Result<(), BusError> {
        self.register(MethodName::Authorization, |engine, req: AuthorizationRequest| async move {
            engine.authorization(req).await
        })
        .await?;
        self.register(MethodName::AuthorizationTransaction, |engine, req: AuthorizationTransactionRequest| async move {
            engine.authorization_transaction(req).await
        })
        .await?;
        self.register(MethodName::BeginTransaction, |engine, req: BeginTransactionRequest| async move {
            engine.begin_transaction(req).await
        })
        .await?;
        self.register(MethodName::EndTransaction, |engine, req: EndTransactionRequest| async move {
            engine.end_transaction(req).await
        })
        .await?;
        self.register(MethodName::RollbackTransaction, |engine, req: RollbackTransactionRequest| async move {
            engine.rollback_transaction(req).await
        })
        .await?;
        self.register(MethodName::RecordTransaction, |engine, req: RecordTransactionRequest| async move {
            engine.record_transaction(req).await
        })
        .await?;

        info!("dispatcher ready");
        Ok(())
    }

    async fn register<Req, Resp, F, Fut>(&self, method: MethodName, call: F) -> Result<(), BusError>
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Arc<Engine<S, B>>, Req) -> Fut + Send + Sync + Copy + 'static,
        Fut: Future<Output = Resp> + Send + 'static
    {
        let engine = self.engine.clone();
        self.bus
            .rpc_register(
                method.as_str(),
                false,
                handler(move |payload| {
                    let engine = engine.clone();
                    dispatch(payload, method, move |req| {
                        let engine = engine.clone();
                        Box::pin(async move { call(engine, req).await }) as BoxedResponse<Resp>
                    })
                })
            )
            .await
    }
}

type BoxedResponse<Resp> = Pin<Box<dyn Future<Output = Resp> + Send>>;

#[instrument(skip(payload, invoke), fields(method = method.as_str()))]
async fn dispatch<Req, Resp>(
    payload: Value,
    method: MethodName,
    invoke: impl FnOnce(Req) -> BoxedResponse<Resp>
) -> Value
where
    Req: DeserializeOwned,
    Resp: Serialize
{
    let Some(body) = payload.get("transaction").cloned() else {
        warn!("request missing `transaction` field");
        return validation_error("transaction", "field required")
    };

    let request: Req = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "request failed validation");
            return validation_error("transaction", err.to_string())
        }
    };

    debug!("dispatching request");
    let response = invoke(request).await;
    match serde_json::to_value(&response) {
        Ok(value) => {
            debug!("dispatched response");
            value
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize response");
            validation_error("transaction", "failed to serialize response")
        }
    }
}

fn validation_error(field: &str, message: impl Into<String>) -> Value {
    serde_json::to_value(ValidationErrorEnvelope::single(field, message)).unwrap_or(Value::Null)
}
