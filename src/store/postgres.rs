use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::{CommerceStore, Settlement, StoreError, StoreResult};
use crate::domain::aggregates::{Cart, CartItem, CartLine, CartSnapshot, Order, OrderError, OrderItem, OrderStatus, PaymentSession, Product, User, UserProfile};
use crate::domain::stock;
use crate::domain::value_objects::{Authority, Money};

#[derive(FromRow)]
struct UserRow { id: Uuid, username: String, email: String, is_staff: bool, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct ProfileRow { user_id: Uuid, full_name: String, phone: String, address: String, city: String, postal_code: String, country: String }

#[derive(FromRow)]
struct ProductRow { id: Uuid, name: String, description: String, price: Decimal, stock: i32, image_url: Option<String>, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct CartRow { id: Uuid, user_id: Uuid, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct CartItemRow { id: Uuid, cart_id: Uuid, product_id: Uuid, quantity: i32 }

#[derive(FromRow)]
struct CartLineRow { item_id: Uuid, product_id: Uuid, product_name: String, unit_price: Decimal, stock: i32, quantity: i32 }

#[derive(FromRow)]
struct OrderRow { id: Uuid, user_id: Uuid, status: String, total_price: Decimal, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct OrderItemRow { order_id: Uuid, product_id: Uuid, quantity: i32, price: Decimal }

#[derive(FromRow)]
struct SessionRow { authority: String, user_id: Uuid, cart_id: Uuid, order_id: Uuid, created_at: DateTime<Utc> }

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self { User { id: r.id, username: r.username, email: r.email, is_staff: r.is_staff, created_at: r.created_at } }
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        UserProfile { user_id: r.user_id, full_name: r.full_name, phone: r.phone, address: r.address, city: r.city, postal_code: r.postal_code, country: r.country }
    }
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self { Product::restore(r.id, r.name, r.description, Money::new(r.price), r.stock, r.image_url, r.created_at) }
}

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self { Cart { id: r.id, user_id: r.user_id, created_at: r.created_at } }
}

impl From<CartItemRow> for CartItem {
    fn from(r: CartItemRow) -> Self { CartItem { id: r.id, cart_id: r.cart_id, product_id: r.product_id, quantity: r.quantity } }
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        CartLine { item_id: r.item_id, product_id: r.product_id, product_name: r.product_name, unit_price: Money::new(r.unit_price), stock: r.stock, quantity: r.quantity }
    }
}

impl TryFrom<SessionRow> for PaymentSession {
    type Error = StoreError;
    fn try_from(r: SessionRow) -> StoreResult<Self> {
        let authority = Authority::new(r.authority).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(PaymentSession { authority, user_id: r.user_id, cart_id: r.cart_id, order_id: r.order_id, created_at: r.created_at })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, status, total_price, created_at";
const SESSION_COLUMNS: &str = "authority, user_id, cart_id, order_id, created_at";
const CART_LINES: &str = "SELECT ci.id AS item_id, p.id AS product_id, p.name AS product_name, p.price AS unit_price, p.stock, ci.quantity \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id WHERE ci.cart_id = $1";

const PENDING_ORDER_INDEX: &str = "orders_one_pending_per_user";
const UNIQUE_VIOLATION: &str = "23505";

/// Turns a unique violation on `constraint` into a conflict; other errors pass through.
fn unique_violation(e: sqlx::Error, constraint: &str, message: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) && db.constraint() == Some(constraint) => {
            StoreError::Conflict(message())
        }
        _ => StoreError::Database(e),
    }
}

/// PostgreSQL backend. Settlement runs in one transaction holding row locks
/// on the payment session and on every product in the cart.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>("SELECT order_id, product_id, quantity, price FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position")
            .bind(&ids).fetch_all(&self.pool).await?;
        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for i in items {
            by_order.entry(i.order_id).or_default().push(OrderItem { product_id: i.product_id, quantity: i.quantity, price: Money::new(i.price) });
        }
        rows.into_iter()
            .map(|r| {
                let status: OrderStatus = r.status.parse().map_err(|e: OrderError| StoreError::Corrupt(e.to_string()))?;
                let items = by_order.remove(&r.id).unwrap_or_default();
                Ok(Order::restore(r.id, r.user_id, status, Money::new(r.total_price), items, r.created_at))
            })
            .collect()
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username, email, is_staff, created_at FROM users WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(User::from))
    }

    async fn find_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT user_id, full_name, phone, address, city, postal_code, country FROM user_profiles WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.map(UserProfile::from))
    }

    async fn save_profile(&self, p: &UserProfile) -> StoreResult<()> {
        sqlx::query("INSERT INTO user_profiles (user_id, full_name, phone, address, city, postal_code, country) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET full_name = $2, phone = $3, address = $4, city = $5, postal_code = $6, country = $7")
            .bind(p.user_id).bind(&p.full_name).bind(&p.phone).bind(&p.address).bind(&p.city).bind(&p.postal_code).bind(&p.country)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT id, name, description, price, stock, image_url, created_at FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn find_cart(&self, user_id: Uuid) -> StoreResult<Option<CartSnapshot>> {
        let Some(cart) = sqlx::query_as::<_, CartRow>("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let lines = sqlx::query_as::<_, CartLineRow>(&format!("{} ORDER BY ci.id", CART_LINES))
            .bind(cart.id).fetch_all(&self.pool).await?;
        Ok(Some(CartSnapshot { cart: cart.into(), lines: lines.into_iter().map(CartLine::from).collect() }))
    }

    async fn open_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let row = sqlx::query_as::<_, CartRow>("INSERT INTO carts (id, user_id, created_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id RETURNING id, user_id, created_at")
            .bind(Uuid::now_v7()).bind(user_id).fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn set_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
        let row = sqlx::query_as::<_, CartItemRow>("INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity RETURNING id, cart_id, product_id, quantity")
            .bind(Uuid::now_v7()).bind(cart_id).bind(product_id).bind(quantity).fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn remove_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = $2").bind(cart_id).bind(item_id).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn find_pending_order(&self, user_id: Uuid) -> StoreResult<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE user_id = $1 AND status = 'pending'", ORDER_COLUMNS))
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(self.attach_items(rows).await?.into_iter().next())
    }

    async fn save_pending_order(&self, order: &Order) -> StoreResult<()> {
        if order.status() != OrderStatus::Pending {
            return Err(StoreError::Conflict(format!("order {} is not pending", order.id())));
        }
        let mut tx = self.pool.begin().await?;
        let saved = sqlx::query("INSERT INTO orders (id, user_id, status, total_price, created_at) VALUES ($1, $2, 'pending', $3, $4) \
             ON CONFLICT (id) DO UPDATE SET total_price = EXCLUDED.total_price WHERE orders.status = 'pending'")
            .bind(order.id()).bind(order.user_id()).bind(order.total_price().amount()).bind(order.created_at())
            .execute(&mut *tx).await
            .map_err(|e| unique_violation(e, PENDING_ORDER_INDEX, || format!("user {} already has a pending order", order.user_id())))?;
        if saved.rows_affected() != 1 {
            return Err(StoreError::Conflict(format!("order {} is no longer pending", order.id())));
        }
        sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order.id()).execute(&mut *tx).await?;
        for (position, item) in order.items().iter().enumerate() {
            sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price, position) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(Uuid::now_v7()).bind(order.id()).bind(item.product_id).bind(item.quantity).bind(item.price.amount()).bind(position as i32)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_order_status(&self, order: &Order) -> StoreResult<()> {
        let done = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1").bind(order.id()).bind(order.status().as_str()).execute(&self.pool).await?;
        if done.rows_affected() != 1 {
            return Err(StoreError::Conflict(format!("order {} does not exist", order.id())));
        }
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id).fetch_all(&self.pool).await?;
        Ok(self.attach_items(rows).await?.into_iter().next())
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC", ORDER_COLUMNS))
            .bind(user_id).fetch_all(&self.pool).await?;
        self.attach_items(rows).await
    }

    async fn record_payment_session(&self, s: &PaymentSession) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let dropped = sqlx::query("DELETE FROM payment_sessions WHERE order_id = $1 AND authority <> $2")
            .bind(s.order_id).bind(s.authority.as_str()).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO payment_sessions (authority, user_id, cart_id, order_id, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(s.authority.as_str()).bind(s.user_id).bind(s.cart_id).bind(s.order_id).bind(s.created_at)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        if dropped.rows_affected() > 0 {
            debug!(order_id = %s.order_id, superseded = dropped.rows_affected(), "dropped superseded payment sessions");
        }
        Ok(())
    }

    async fn find_payment_session(&self, authority: &str) -> StoreResult<Option<PaymentSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!("SELECT {} FROM payment_sessions WHERE authority = $1", SESSION_COLUMNS))
            .bind(authority).fetch_optional(&self.pool).await?;
        row.map(PaymentSession::try_from).transpose()
    }

    async fn settle_payment(&self, authority: &str) -> StoreResult<Settlement> {
        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = self.pool.begin().await?;

        let Some(session) = sqlx::query_as::<_, SessionRow>(&format!("SELECT {} FROM payment_sessions WHERE authority = $1 FOR UPDATE", SESSION_COLUMNS))
            .bind(authority).fetch_optional(&mut *tx).await?
        else {
            return Ok(Settlement::SessionMissing);
        };

        // Lock products in id order so concurrent settlements cannot deadlock.
        let lines: Vec<CartLine> = sqlx::query_as::<_, CartLineRow>(&format!("{} ORDER BY p.id FOR UPDATE OF p", CART_LINES))
            .bind(session.cart_id).fetch_all(&mut *tx).await?
            .into_iter().map(CartLine::from).collect();
        if let Err(shortages) = stock::ensure_available(&lines) {
            tx.rollback().await?;
            return Ok(Settlement::InsufficientStock(shortages));
        }

        for line in &lines {
            let taken = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(line.product_id).bind(line.quantity).execute(&mut *tx).await?;
            if taken.rows_affected() != 1 {
                return Err(StoreError::Conflict(format!("stock of product {} changed during settlement", line.product_id)));
            }
        }

        let Some((user_id, total_price)) = sqlx::query_as::<_, (Uuid, Decimal)>("UPDATE orders SET status = 'completed' WHERE id = $1 AND status = 'pending' RETURNING user_id, total_price")
            .bind(session.order_id).fetch_optional(&mut *tx).await?
        else {
            return Err(StoreError::Conflict(format!("order {} is not pending", session.order_id)));
        };

        sqlx::query("DELETE FROM payment_sessions WHERE cart_id = $1").bind(session.cart_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(session.cart_id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM carts WHERE id = $1").bind(session.cart_id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(Settlement::Completed { order_id: session.order_id, user_id, total_price: Money::new(total_price) })
    }
}
