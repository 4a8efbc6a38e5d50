use std::time::Duration;

use async_trait::async_trait;
use billing_bus::{BusClient, BusError, Handler, Priority};
use parking_lot::Mutex;
use serde_json::Value;

/// An in-memory [`BusClient`] that never dials a broker. `rpc_publish` and
/// `rpc_call` just record what was sent, so tests can assert on the
/// fire-and-forget audit publishes the engine makes.
#[derive(Default)]
pub struct FakeBus {
    published: Mutex<Vec<(String, Value, Priority)>>
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Value, Priority)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl BusClient for FakeBus {
    async fn rpc_call(&self, method: &str, payload: Value, _expiration: Duration, priority: Priority) -> Result<Value, BusError> {
        self.published.lock().push((method.to_string(), payload, priority));
        Ok(Value::Null)
    }

    async fn rpc_publish(&self, method: &str, payload: Value, priority: Priority) -> Result<(), BusError> {
        self.published.lock().push((method.to_string(), payload, priority));
        Ok(())
    }

    async fn rpc_register(&self, _method: &str, _auto_delete: bool, _handler: Handler) -> Result<(), BusError> {
        Ok(())
    }
}
