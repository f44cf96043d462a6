//! Idempotent schema bootstrap for the Postgres store.
//!
//! Every statement is `IF NOT EXISTS`, so running this on every startup is safe.

use sqlx::PgPool;
use tracing::instrument;

use super::postgres::map_sqlx_error;
use super::r#trait::StoreError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        order_id BIGSERIAL PRIMARY KEY,
        customer_name TEXT NOT NULL DEFAULT '',
        ordered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        location TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        line_item_id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders (order_id),
        item_code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        quantity BIGINT NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS items_order_id_idx ON items (order_id)",
    r#"
    CREATE TABLE IF NOT EXISTS books (
        book_id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        email TEXT PRIMARY KEY,
        password TEXT NOT NULL
    )
    "#,
];

/// Create every table the store needs.
#[instrument(skip(pool), err)]
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
    }
    tracing::info!(statements = SCHEMA.len(), "schema applied");
    Ok(())
}
