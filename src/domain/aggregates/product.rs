//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::stock;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    id: Uuid,
    name: String,
    description: String,
    price: Money,
    stock: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Money) -> Self {
        Self {
            id: Uuid::now_v7(), name: name.into(), description: String::new(), price, stock: 0,
            image_url: None, created_at: Utc::now(),
        }
    }

    pub fn restore(id: Uuid, name: String, description: String, price: Money, stock: i32, image_url: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self { id, name, description, price, stock, image_url, created_at }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> Money { self.price }
    pub fn stock(&self) -> i32 { self.stock }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn can_supply(&self, qty: i32) -> bool { !stock::is_insufficient(qty, self.stock) }

    pub fn update_price(&mut self, new_price: Money) { self.price = new_price; }

    pub fn add_stock(&mut self, qty: i32) -> Result<(), ProductError> {
        if qty < 0 { return Err(ProductError::InvalidQuantity); }
        self.stock = self.stock.checked_add(qty).ok_or(ProductError::InvalidQuantity)?;
        Ok(())
    }

    pub fn remove_stock(&mut self, qty: i32) -> Result<(), ProductError> {
        if qty < 0 { return Err(ProductError::InvalidQuantity); }
        self.stock = stock::decrement(self.stock, qty).ok_or(ProductError::InsufficientStock)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { InvalidQuantity, InsufficientStock }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::InvalidQuantity => write!(f, "Invalid quantity"), Self::InsufficientStock => write!(f, "Insufficient stock") }
    }
}
