//! `orderdesk-core` — domain models shared by every other crate.
//!
//! This crate contains **pure domain** types (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod model;

pub use error::DomainError;
pub use id::{LineItemId, OrderId};
pub use model::{Book, Item, Message, Order, SessionToken, User};
