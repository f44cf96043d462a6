//! Wire/domain models for orders, line items, books and users.
//!
//! Field names follow the public JSON contract (camelCase). Every field has a
//! zero value so partially filled request bodies still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{LineItemId, OrderId};

/// A customer order and its line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_name: String,
    pub ordered_at: Option<DateTime<Utc>>,
    pub location: String,
    pub items: Vec<Item>,
}

impl Order {
    /// Fill in `ordered_at` when the client left it out.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.ordered_at.is_none() {
            self.ordered_at = Some(now);
        }
        self
    }

    /// Drop every server-assigned identifier (used before inserting a new order).
    pub fn without_ids(mut self) -> Self {
        self.order_id = OrderId::default();
        for item in &mut self.items {
            item.line_item_id = LineItemId::default();
        }
        self
    }
}

/// A line item owned by exactly one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub line_item_id: LineItemId,
    pub item_code: String,
    pub description: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub title: String,
    pub author: String,
}

/// Email + password pair.
///
/// On the way in `password` is plaintext; once hashed it is replaced with the
/// PHC string and only that form is ever persisted.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generic human-readable notice envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A signed session token together with what it attests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
