//! Infrastructure layer: persistence adapters behind one store interface.

pub mod store;

pub use store::{InMemoryOrdersStore, OrdersStore, PostgresOrdersStore, StoreError, apply_schema};
