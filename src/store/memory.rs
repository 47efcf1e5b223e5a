use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CommerceStore, Settlement, StoreError, StoreResult};
use crate::domain::aggregates::{Cart, CartItem, CartLine, CartSnapshot, Order, OrderStatus, PaymentSession, Product, User, UserProfile};
use crate::domain::stock;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, UserProfile>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    cart_items: Vec<CartItem>,
    orders: HashMap<Uuid, Order>,
    sessions: HashMap<String, PaymentSession>,
}

impl Tables {
    fn cart_of(&self, user_id: Uuid) -> Option<&Cart> { self.carts.values().find(|c| c.user_id == user_id) }

    fn snapshot(&self, cart: &Cart) -> StoreResult<CartSnapshot> {
        let lines = self
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart.id)
            .map(|i| {
                let product = self
                    .products
                    .get(&i.product_id)
                    .ok_or_else(|| StoreError::Corrupt(format!("cart item {} points at missing product", i.id)))?;
                Ok(CartLine {
                    item_id: i.id,
                    product_id: product.id(),
                    product_name: product.name().to_string(),
                    unit_price: product.price(),
                    stock: product.stock(),
                    quantity: i.quantity,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(CartSnapshot { cart: cart.clone(), lines })
    }
}

/// In-process store. Every operation holds one lock for its whole duration,
/// which makes settlement trivially serializable.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_user(&self, user: User) { self.tables.lock().await.users.insert(user.id, user); }

    pub async fn insert_product(&self, product: Product) { self.tables.lock().await.products.insert(product.id(), product); }

    pub async fn product(&self, id: Uuid) -> Option<Product> { self.tables.lock().await.products.get(&id).cloned() }

    /// Applies a change to a stored product; `false` when it does not exist.
    pub async fn update_product(&self, id: Uuid, change: impl FnOnce(&mut Product) + Send) -> bool {
        match self.tables.lock().await.products.get_mut(&id) {
            Some(product) => { change(product); true }
            None => false,
        }
    }

    pub async fn payment_sessions(&self) -> Vec<PaymentSession> {
        self.tables.lock().await.sessions.values().cloned().collect()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> { Ok(self.tables.lock().await.users.get(&id).cloned()) }

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.tables.lock().await.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        self.tables.lock().await.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> { Ok(self.product(id).await) }

    async fn find_cart(&self, user_id: Uuid) -> StoreResult<Option<CartSnapshot>> {
        let t = self.tables.lock().await;
        t.cart_of(user_id).map(|cart| t.snapshot(cart)).transpose()
    }

    async fn open_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let mut t = self.tables.lock().await;
        if let Some(cart) = t.cart_of(user_id) { return Ok(cart.clone()); }
        let cart = Cart::for_user(user_id);
        t.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn set_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
        let mut t = self.tables.lock().await;
        if !t.carts.contains_key(&cart_id) || !t.products.contains_key(&product_id) {
            return Err(StoreError::Conflict("cart item references a missing cart or product".into()));
        }
        if quantity <= 0 { return Err(StoreError::Conflict("cart item quantity must be positive".into())); }
        if let Some(item) = t.cart_items.iter_mut().find(|i| i.cart_id == cart_id && i.product_id == product_id) {
            item.quantity = quantity;
            return Ok(item.clone());
        }
        let item = CartItem { id: Uuid::now_v7(), cart_id, product_id, quantity };
        t.cart_items.push(item.clone());
        Ok(item)
    }

    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.cart_items.len();
        t.cart_items.retain(|i| !(i.cart_id == cart_id && i.id == item_id));
        Ok(t.cart_items.len() != before)
    }

    async fn find_pending_order(&self, user_id: Uuid) -> StoreResult<Option<Order>> {
        let t = self.tables.lock().await;
        Ok(t.orders.values().find(|o| o.is_owned_by(user_id) && o.status() == OrderStatus::Pending).cloned())
    }

    async fn save_pending_order(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if order.status() != OrderStatus::Pending {
            return Err(StoreError::Conflict(format!("order {} is not pending", order.id())));
        }
        if let Some(existing) = t.orders.get(&order.id()) {
            if existing.status() != OrderStatus::Pending {
                return Err(StoreError::Conflict(format!("order {} is already {}", order.id(), existing.status().as_str())));
            }
        }
        let duplicate = t.orders.values().any(|o| o.id() != order.id() && o.is_owned_by(order.user_id()) && o.status() == OrderStatus::Pending);
        if duplicate {
            return Err(StoreError::Conflict(format!("user {} already has a pending order", order.user_id())));
        }
        t.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update_order_status(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let stored = t.orders.get_mut(&order.id()).ok_or_else(|| StoreError::Conflict(format!("order {} does not exist", order.id())))?;
        *stored = Order::restore(stored.id(), stored.user_id(), order.status(), stored.total_price(), stored.items().to_vec(), stored.created_at());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> { Ok(self.tables.lock().await.orders.get(&id).cloned()) }

    async fn list_orders(&self, user_id: Option<Uuid>) -> StoreResult<Vec<Order>> {
        let t = self.tables.lock().await;
        let mut orders: Vec<Order> = t.orders.values().filter(|o| user_id.map_or(true, |u| o.is_owned_by(u))).cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(orders)
    }

    async fn record_payment_session(&self, session: &PaymentSession) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.sessions.contains_key(session.authority.as_str()) {
            return Err(StoreError::Conflict(format!("authority {} already recorded", session.authority)));
        }
        t.sessions.retain(|_, s| !s.is_superseded_by(session));
        t.sessions.insert(session.authority.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn find_payment_session(&self, authority: &str) -> StoreResult<Option<PaymentSession>> {
        Ok(self.tables.lock().await.sessions.get(authority).cloned())
    }

    async fn settle_payment(&self, authority: &str) -> StoreResult<Settlement> {
        let mut t = self.tables.lock().await;
        let Some(session) = t.sessions.get(authority).cloned() else { return Ok(Settlement::SessionMissing) };
        let cart = t
            .carts
            .get(&session.cart_id)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("session {} points at missing cart", authority)))?;
        let snapshot = t.snapshot(&cart)?;
        if let Err(shortages) = stock::ensure_available(&snapshot.lines) {
            return Ok(Settlement::InsufficientStock(shortages));
        }

        // Stage every change first so a failure leaves the tables untouched.
        let mut order = t
            .orders
            .get(&session.order_id)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("session {} points at missing order", authority)))?;
        order.complete().map_err(|e| StoreError::Conflict(e.to_string()))?;
        let mut products = Vec::with_capacity(snapshot.lines.len());
        for line in &snapshot.lines {
            let mut product = t.products.get(&line.product_id).cloned().ok_or_else(|| StoreError::Corrupt(format!("missing product {}", line.product_id)))?;
            product.remove_stock(line.quantity).map_err(|e| StoreError::Conflict(e.to_string()))?;
            products.push(product);
        }

        for product in products { t.products.insert(product.id(), product); }
        let settled = Settlement::Completed { order_id: order.id(), user_id: order.user_id(), total_price: order.total_price() };
        t.orders.insert(order.id(), order);
        t.cart_items.retain(|i| i.cart_id != cart.id);
        t.carts.remove(&cart.id);
        t.sessions.retain(|_, s| s.cart_id != cart.id);
        Ok(settled)
    }
}
