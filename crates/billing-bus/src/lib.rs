//! Message bus client: register RPC handlers keyed by method name, perform
//! synchronous RPC calls, and fire-and-forget priority-tagged publishes.
//! Mirrors the reference implementation's `aio_pika.patterns.RPC` usage,
//! reimplemented over `lapin` using RabbitMQ's direct-reply-to pseudo-queue.

pub mod client;
pub mod envelope;
pub mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use billing_types::method::Priority;
pub use client::{default_expiration, AmqpBusClient, BusClient};
pub use error::BusError;

/// A registered RPC handler: an async closure from the decoded request
/// payload to the response payload. Boxed so `rpc_register` can accept any
/// `async fn`/closure without the trait itself being generic over it.
pub type Handler = Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Value> + Send>> + Send + Sync>;

/// Wraps an `async fn(Value) -> Value` (or an equivalent closure) as a
/// [`Handler`] suitable for [`BusClient::rpc_register`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Value> + Send + 'static
{
    Arc::new(move |value| Box::pin(f(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_wraps_an_async_closure() {
        let h = handler(|v: Value| async move {
            serde_json::json!({ "echo": v })
        });
        let out = h(serde_json::json!({ "a": 1 })).await;
        assert_eq!(out, serde_json::json!({ "echo": { "a": 1 } }));
    }
}
