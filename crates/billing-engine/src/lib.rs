//! The rating engine: the pure business logic behind the six bus methods,
//! generic over the store and bus transports so it can be driven by fakes in
//! tests and by the real `GraphQlStoreClient`/`AmqpBusClient` in production.

pub mod authorization;
pub mod checks;
pub mod lifecycle;

use std::sync::Arc;

use billing_bus::BusClient;
use billing_rater::{Clock, Rater};
use billing_store::StoreClient;

/// Ties a store, a bus, and a rater together behind the six handler methods
/// implemented in [`authorization`] and [`lifecycle`]. Cheap to clone: every
/// field is reference-counted or `Copy`.
pub struct Engine<S, B> {
    store: Arc<S>,
    bus: Arc<B>,
    rater: Rater,
    clock: Arc<dyn Clock>
}

impl<S, B> Engine<S, B>
where
    S: StoreClient,
    B: BusClient + 'static
{
    pub fn new(store: Arc<S>, bus: Arc<B>, rater: Rater, clock: Arc<dyn Clock>) -> Self {
        Self { store, bus, rater, clock }
    }
}

impl<S, B> Clone for Engine<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            rater: self.rater.clone(),
            clock: self.clock.clone()
        }
    }
}
