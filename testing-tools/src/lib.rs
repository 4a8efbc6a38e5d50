//! In-memory fakes for [`billing_store::StoreClient`] and
//! [`billing_bus::BusClient`], plus small fixture builders, shared by the
//! `billing-engine` and `billing-dispatch` test suites.

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeBus, FakeStore};
