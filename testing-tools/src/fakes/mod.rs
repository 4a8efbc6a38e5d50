mod bus;
mod store;

pub use bus::FakeBus;
pub use store::FakeStore;
