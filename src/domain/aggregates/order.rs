//! Order Aggregate
//!
//! An order is a price snapshot of a cart. It stays `Pending` while the user
//! is paying and may be re-snapshotted by repeated checkouts; a confirmed
//! payment moves it to `Completed`, after which its items are frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::cart::CartLine;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    status: OrderStatus,
    total_price: Money,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
}

/// Product, quantity and unit price as they were at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderItem { pub product_id: Uuid, pub quantity: i32, pub price: Money }

impl OrderItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Completed, Shipped }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Completed => "completed", Self::Shipped => "shipped" }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "shipped" => Ok(Self::Shipped),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl Order {
    pub fn open(user_id: Uuid) -> Self {
        Self { id: Uuid::now_v7(), user_id, status: OrderStatus::Pending, total_price: Money::zero(), items: vec![], created_at: Utc::now() }
    }

    pub fn restore(id: Uuid, user_id: Uuid, status: OrderStatus, total_price: Money, items: Vec<OrderItem>, created_at: DateTime<Utc>) -> Self {
        Self { id, user_id, status, total_price, items, created_at }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total_price(&self) -> Money { self.total_price }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }
    pub fn items_total(&self) -> Money { self.items.iter().map(OrderItem::line_total).sum() }

    /// Replaces the items with the cart's current lines at their current
    /// prices and fixes the total to match.
    pub fn snapshot(&mut self, lines: &[CartLine]) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::NotPending); }
        if lines.is_empty() { return Err(OrderError::NoItems); }
        self.items = lines
            .iter()
            .map(|l| OrderItem { product_id: l.product_id, quantity: l.quantity, price: l.unit_price })
            .collect();
        self.total_price = self.items_total();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::NotPending); }
        self.status = OrderStatus::Completed;
        Ok(())
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Completed { return Err(OrderError::NotCompleted); }
        self.status = OrderStatus::Shipped;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, NotPending, NotCompleted, UnknownStatus(String) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::NotPending => write!(f, "Order is not pending"),
            Self::NotCompleted => write!(f, "Only completed orders can be shipped"),
            Self::UnknownStatus(s) => write!(f, "Unknown order status '{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(price: i64, qty: i32) -> CartLine {
        CartLine { item_id: Uuid::new_v4(), product_id: Uuid::new_v4(), product_name: "Widget".into(), unit_price: Money::new(Decimal::new(price, 0)), stock: 5, quantity: qty }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::open(Uuid::new_v4());
        order.snapshot(&[line(100, 2), line(15, 1)]).unwrap();
        assert_eq!(order.total_price().amount(), Decimal::new(215, 0));
        assert_eq!(order.items().len(), 2);
        order.complete().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.snapshot(&[line(1, 1)]), Err(OrderError::NotPending));
        order.ship().unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert_eq!(order.complete(), Err(OrderError::NotPending));
    }

    #[test]
    fn test_resnapshot_replaces_items() {
        let mut order = Order::open(Uuid::new_v4());
        order.snapshot(&[line(100, 2)]).unwrap();
        order.snapshot(&[line(30, 1)]).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total_price(), order.items_total());
        assert_eq!(order.total_price().amount(), Decimal::new(30, 0));
    }

    #[test]
    fn test_ship_requires_completion() {
        let mut order = Order::open(Uuid::new_v4());
        assert_eq!(order.ship(), Err(OrderError::NotCompleted));
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }
}
