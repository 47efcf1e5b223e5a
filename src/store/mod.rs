//! Persistence seam.
//!
//! Everything the services read or write goes through [`CommerceStore`].
//! [`PgStore`] is the production backend; [`MemoryStore`] keeps the same
//! guarantees behind a single lock and backs the test-suite.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, CartSnapshot, Order, PaymentSession, Product, User, UserProfile};
use crate::domain::stock::StockShortage;
use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of the settlement transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Stock taken, order completed, cart and session removed.
    Completed { order_id: Uuid, user_id: Uuid, total_price: Money },
    /// Nothing changed: the session was already consumed or never existed.
    SessionMissing,
    /// Nothing changed: these lines no longer fit in stock.
    InsufficientStock(Vec<StockShortage>),
}

#[async_trait]
pub trait CommerceStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<()>;

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// The user's cart joined with live product data, if the user has a cart.
    async fn find_cart(&self, user_id: Uuid) -> StoreResult<Option<CartSnapshot>>;
    /// Returns the user's cart, creating it on first use.
    async fn open_cart(&self, user_id: Uuid) -> StoreResult<Cart>;
    /// Sets the quantity of a product in a cart, adding the line if needed.
    async fn set_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem>;
    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> StoreResult<bool>;

    async fn find_pending_order(&self, user_id: Uuid) -> StoreResult<Option<Order>>;
    /// Inserts a pending order or replaces the items and total of an
    /// existing one. Orders that left `pending` are never touched.
    async fn save_pending_order(&self, order: &Order) -> StoreResult<()>;
    async fn update_order_status(&self, order: &Order) -> StoreResult<()>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Newest first; `None` lists every user's orders.
    async fn list_orders(&self, user_id: Option<Uuid>) -> StoreResult<Vec<Order>>;

    /// Records a session and drops any older session for the same order.
    async fn record_payment_session(&self, session: &PaymentSession) -> StoreResult<()>;
    async fn find_payment_session(&self, authority: &str) -> StoreResult<Option<PaymentSession>>;

    /// Atomically re-checks stock for the session's cart, decrements it,
    /// completes the order and deletes the cart and its sessions. Either all
    /// of that happens or none of it; an `Err` means the transaction was
    /// rolled back.
    async fn settle_payment(&self, authority: &str) -> StoreResult<Settlement>;
}
