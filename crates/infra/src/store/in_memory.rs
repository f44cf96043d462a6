use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use orderdesk_core::{Book, LineItemId, Order, OrderId, User};

use super::r#trait::{OrdersStore, StoreError};

/// In-memory store for tests/dev.
///
/// All tables sit behind a single lock, so multi-step writes (order + items,
/// check-and-insert of a user) are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InMemoryOrdersStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    books: Vec<Book>,
    users: HashMap<String, String>,
    last_order_id: i64,
    last_line_item_id: i64,
}

impl Tables {
    fn next_order_id(&mut self) -> OrderId {
        self.last_order_id += 1;
        OrderId::new(self.last_order_id)
    }

    fn assign_line_ids(&mut self, order: &mut Order) {
        for item in &mut order.items {
            self.last_line_item_id += 1;
            item.line_item_id = LineItemId::new(self.last_line_item_id);
        }
    }
}

impl InMemoryOrdersStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored books (the HTTP surface is create-only).
    pub fn book_count(&self) -> usize {
        self.read().map(|t| t.books.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl OrdersStore for InMemoryOrdersStore {
    async fn create_order(&self, order: Order) -> Result<Order, StoreError> {
        let mut tables = self.write()?;
        let mut order = order.without_ids().stamped(Utc::now());
        order.order_id = tables.next_order_id();
        tables.assign_line_ids(&mut order);
        tables.orders.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.read()?.orders.values().cloned().collect())
    }

    async fn save_order(&self, order: Order) -> Result<Order, StoreError> {
        if order.order_id.is_unassigned() {
            return self.create_order(order).await;
        }

        let mut tables = self.write()?;
        let mut order = order.stamped(Utc::now());
        tables.assign_line_ids(&mut order);
        tables.last_order_id = tables.last_order_id.max(order.order_id.get());
        tables.orders.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        // Items live inside the order value, so they go with it.
        Ok(self.write()?.orders.remove(&id).is_some())
    }

    async fn create_book(&self, book: Book) -> Result<Book, StoreError> {
        self.write()?.books.push(book.clone());
        Ok(book)
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(email).map(|hash| User {
            email: email.to_string(),
            password: hash.clone(),
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.email) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.email)));
        }
        tables.users.insert(user.email.clone(), user.password.clone());
        Ok(())
    }
}
