//! Persistence boundary for orders, books and users.
//!
//! Handlers depend only on [`OrdersStore`]; the Postgres adapter is used in
//! production and the in-memory adapter in tests/dev.

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod r#trait;

pub use in_memory::InMemoryOrdersStore;
pub use postgres::PostgresOrdersStore;
pub use schema::apply_schema;
pub use r#trait::{OrdersStore, StoreError};
