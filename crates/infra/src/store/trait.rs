use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use orderdesk_core::{Book, Order, OrderId, User};

/// Persistence operation error.
///
/// These are **infrastructure errors** as opposed to domain errors; the HTTP
/// boundary decides how each one is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or referential constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Connection, query or row-decoding failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Typed persistence boundary for every entity the service owns.
///
/// One interface covers orders (with their line items), books and users so
/// handlers never reach for a second storage pathway.
///
/// ## Semantics
///
/// - `create_order` ignores any ids on the input and returns the stored order
///   with `order_id` and every `line_item_id` assigned.
/// - `save_order` is a full replace keyed by `order_id` and behaves as an
///   upsert; line items are replaced wholesale and get fresh ids.
/// - `delete_order` removes the order's items before the order and reports
///   whether an order row existed.
/// - `insert_user` must reject a duplicate email atomically with
///   [`StoreError::Conflict`], even under concurrent inserts.
#[async_trait]
pub trait OrdersStore: Send + Sync {
    async fn create_order(&self, order: Order) -> Result<Order, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders with their items, ascending by id.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn save_order(&self, order: Order) -> Result<Order, StoreError>;

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError>;

    async fn create_book(&self, book: Book) -> Result<Book, StoreError>;

    /// Look up a user by email; the returned password is the stored hash.
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user whose `password` is already hashed.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> OrdersStore for Arc<S>
where
    S: OrdersStore + ?Sized,
{
    async fn create_order(&self, order: Order) -> Result<Order, StoreError> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders().await
    }

    async fn save_order(&self, order: Order) -> Result<Order, StoreError> {
        (**self).save_order(order).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        (**self).delete_order(id).await
    }

    async fn create_book(&self, book: Book) -> Result<Book, StoreError> {
        (**self).create_book(book).await
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_user(email).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        (**self).insert_user(user).await
    }
}
