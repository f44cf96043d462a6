//! Postgres-backed store implementation.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / Io / Tls / other | N/A | `Storage` |
//!
//! Multi-statement writes (order + items) run in a single transaction; reads
//! that span both tables share one `REPEATABLE READ` snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use orderdesk_core::{Book, Item, LineItemId, Order, OrderId, User};

use super::r#trait::{OrdersStore, StoreError};

/// Postgres-backed store for orders, books and users.
///
/// `PgPool` is internally reference counted, so cloning the store is cheap and
/// every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct PostgresOrdersStore {
    pool: PgPool,
}

impl PostgresOrdersStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrdersStore for PostgresOrdersStore {
    #[instrument(
        skip(self, order),
        fields(item_count = order.items.len(), order_id = tracing::field::Empty),
        err
    )]
    async fn create_order(&self, order: Order) -> Result<Order, StoreError> {
        let mut order = order.without_ids();

        let mut tx = begin(&self.pool).await?;
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (customer_name, ordered_at, location)
            VALUES ($1, COALESCE($2, NOW()), $3)
            RETURNING order_id, customer_name, ordered_at, location
            "#,
        )
        .bind(&order.customer_name)
        .bind(order.ordered_at)
        .bind(&order.location)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        order.order_id = OrderId::new(row.order_id);
        order.ordered_at = Some(row.ordered_at);
        insert_items(&mut tx, order.order_id, &mut order.items).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("order_id", order.order_id.get());
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let mut tx = begin_snapshot(&self.pool).await?;
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, customer_name, ordered_at, location
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT line_item_id, order_id, item_code, description, quantity
            FROM items
            WHERE order_id = $1
            ORDER BY line_item_id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_items", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let mut order = Order::from(row);
        order.items = rows.into_iter().map(Item::try_from).collect::<Result<_, _>>()?;
        Ok(Some(order))
    }

    #[instrument(skip(self), fields(order_count = tracing::field::Empty), err)]
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut tx = begin_snapshot(&self.pool).await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT order_id, customer_name, ordered_at, location
            FROM orders
            ORDER BY order_id ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let item_rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT line_item_id, order_id, item_code, description, quantity
            FROM items
            ORDER BY order_id ASC, line_item_id ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let mut items_by_order: HashMap<i64, Vec<Item>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order.entry(order_id).or_default().push(Item::try_from(row)?);
        }

        let orders = rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.order_id).unwrap_or_default();
                Order {
                    items,
                    ..Order::from(row)
                }
            })
            .collect::<Vec<_>>();

        Span::current().record("order_count", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self, order), fields(order_id = %order.order_id), err)]
    async fn save_order(&self, order: Order) -> Result<Order, StoreError> {
        if order.order_id.is_unassigned() {
            return self.create_order(order).await;
        }
        let mut order = order;

        let mut tx = begin(&self.pool).await?;
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (order_id, customer_name, ordered_at, location)
            VALUES ($1, $2, COALESCE($3, NOW()), $4)
            ON CONFLICT (order_id) DO UPDATE SET
                customer_name = EXCLUDED.customer_name,
                ordered_at = EXCLUDED.ordered_at,
                location = EXCLUDED.location
            RETURNING order_id, customer_name, ordered_at, location
            "#,
        )
        .bind(order.order_id.get())
        .bind(&order.customer_name)
        .bind(order.ordered_at)
        .bind(&order.location)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_order", e))?;
        order.ordered_at = Some(row.ordered_at);

        sqlx::query("DELETE FROM items WHERE order_id = $1")
            .bind(order.order_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_items", e))?;
        insert_items(&mut tx, order.order_id, &mut order.items).await?;

        // An explicit id may be ahead of the sequence; keep future inserts clear of it.
        // A sequence that has never handed out a value (`is_called = false`)
        // counts as zero, otherwise `last_value` itself would be issued again.
        sqlx::query(
            r#"
            SELECT setval(
                'orders_order_id_seq',
                GREATEST(
                    $1,
                    (SELECT CASE WHEN is_called THEN last_value ELSE 0 END FROM orders_order_id_seq)
                ),
                true
            )
            "#,
        )
        .bind(order.order_id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("advance_sequence", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut tx = begin(&self.pool).await?;

        sqlx::query("DELETE FROM items WHERE order_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_items", e))?;

        let deleted = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, book), err)]
    async fn create_book(&self, book: Book) -> Result<Book, StoreError> {
        sqlx::query("INSERT INTO books (title, author) VALUES ($1, $2)")
            .bind(&book.title)
            .bind(&book.author)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_book", e))?;
        Ok(book)
    }

    #[instrument(skip(self), err)]
    async fn find_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT email, password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;

        row.map(|row| -> Result<User, sqlx::Error> {
            Ok(User {
                email: row.try_get("email")?,
                password: row.try_get("password")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO users (email, password) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING",
        )
        .bind(&user.email)
        .bind(&user.password)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Conflict(format!("user {} already exists", user.email)));
        }
        Ok(())
    }
}

async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, StoreError> {
    pool.begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

/// Read-only transaction whose statements all see the same snapshot.
async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, StoreError> {
    let mut tx = begin(pool).await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("set_isolation", e))?;
    Ok(tx)
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    items: &mut [Item],
) -> Result<(), StoreError> {
    for item in items.iter_mut() {
        let line_item_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO items (order_id, item_code, description, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING line_item_id
            "#,
        )
        .bind(order_id.get())
        .bind(&item.item_code)
        .bind(&item.description)
        .bind(i64::from(item.quantity))
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        item.line_item_id = LineItemId::new(line_item_id);
    }
    Ok(())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Storage(format!("{} failed: {}", operation, other)),
    }
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    order_id: i64,
    customer_name: String,
    ordered_at: DateTime<Utc>,
    location: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            order_id: row.try_get("order_id")?,
            customer_name: row.try_get("customer_name")?,
            ordered_at: row.try_get("ordered_at")?,
            location: row.try_get("location")?,
        })
    }
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            order_id: OrderId::new(row.order_id),
            customer_name: row.customer_name,
            ordered_at: Some(row.ordered_at),
            location: row.location,
            items: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct ItemRow {
    line_item_id: i64,
    order_id: i64,
    item_code: String,
    description: String,
    quantity: i64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            line_item_id: row.try_get("line_item_id")?,
            order_id: row.try_get("order_id")?,
            item_code: row.try_get("item_code")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::Storage(format!(
                "item {} has out-of-range quantity {}",
                row.line_item_id, row.quantity
            ))
        })?;

        Ok(Item {
            line_item_id: LineItemId::new(row.line_item_id),
            item_code: row.item_code,
            description: row.description,
            quantity,
        })
    }
}
