use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::{CartItem, CartLine, CartSnapshot, User};
use crate::domain::stock;
use crate::domain::value_objects::Money;
use crate::store::CommerceStore;
use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_price: Money,
}

impl From<CartSnapshot> for CartView {
    fn from(snapshot: CartSnapshot) -> Self {
        let total_price = snapshot.total();
        Self { items: snapshot.lines, total_price }
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CommerceStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn CommerceStore>) -> Self { Self { store } }

    pub async fn view(&self, user: &User) -> Result<CartView> {
        let snapshot = match self.store.find_cart(user.id).await? {
            Some(snapshot) => snapshot,
            None => CartSnapshot::empty(self.store.open_cart(user.id).await?),
        };
        Ok(snapshot.into())
    }

    /// Adds `quantity` of a product, merging with an existing line. The
    /// merged quantity must still fit in stock.
    pub async fn add(&self, user: &User, product_id: Uuid, quantity: i32) -> Result<CartItem> {
        if quantity < 1 { return Err(AppError::validation("Quantity must be at least 1")); }
        let product = self.store.find_product(product_id).await?.ok_or_else(|| AppError::not_found("Product not found"))?;
        let insufficient = || AppError::validation(format!("Insufficient stock for {}. Available: {}", product.name(), product.stock()));
        if !product.can_supply(quantity) { return Err(insufficient()); }

        let cart = self.store.open_cart(user.id).await?;
        let current = self.store.find_cart(user.id).await?.map_or(0, |c| c.quantity_of(product_id));
        let merged = current.checked_add(quantity).ok_or_else(|| AppError::validation("Quantity too large"))?;
        if stock::is_insufficient(merged, product.stock()) { return Err(insufficient()); }

        let item = self.store.set_cart_item(cart.id, product_id, merged).await?;
        debug!(user_id = %user.id, %product_id, quantity = merged, "cart line updated");
        Ok(item)
    }

    pub async fn remove(&self, user: &User, item_id: Uuid) -> Result<()> {
        let cart = self.store.open_cart(user.id).await?;
        if !self.store.remove_cart_item(cart.id, item_id).await? {
            return Err(AppError::not_found("Product not found in cart"));
        }
        Ok(())
    }
}
