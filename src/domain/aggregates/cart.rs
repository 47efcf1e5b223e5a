//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::stock::StockLine;
use crate::domain::value_objects::Money;

/// One cart per user, created the first time the user needs one.
#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self { Self { id: Uuid::now_v7(), user_id, created_at: Utc::now() } }
}

#[derive(Clone, Debug, Serialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A cart item joined with the live state of its product.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Money,
    pub stock: i32,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

impl StockLine for CartLine {
    fn product_id(&self) -> Uuid { self.product_id }
    fn product_name(&self) -> &str { &self.product_name }
    fn requested(&self) -> i32 { self.quantity }
    fn available(&self) -> i32 { self.stock }
}

#[derive(Clone, Debug)]
pub struct CartSnapshot {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn empty(cart: Cart) -> Self { Self { cart, lines: vec![] } }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn total(&self) -> Money { self.lines.iter().map(CartLine::line_total).sum() }
    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.lines.iter().find(|l| l.product_id == product_id).map_or(0, |l| l.quantity)
    }
}
