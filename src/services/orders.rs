use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderError, User};
use crate::domain::events::OrderEvent;
use crate::publisher::EventPublisher;
use crate::store::CommerceStore;
use crate::{AppError, Result};

/// Order history. Staff see every order, customers only their own.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CommerceStore>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn CommerceStore>, events: EventPublisher) -> Self { Self { store, events } }

    pub async fn list(&self, user: &User) -> Result<Vec<Order>> {
        let scope = if user.is_staff { None } else { Some(user.id) };
        Ok(self.store.list_orders(scope).await?)
    }

    pub async fn get(&self, user: &User, id: Uuid) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .filter(|o| user.is_staff || o.is_owned_by(user.id))
            .ok_or_else(|| AppError::not_found("Order not found"))
    }

    pub async fn ship(&self, user: &User, id: Uuid) -> Result<Order> {
        if !user.is_staff { return Err(AppError::Forbidden("Only staff can ship orders".into())); }
        let mut order = self.get(user, id).await?;
        order.ship().map_err(|e: OrderError| AppError::validation(e.to_string()))?;
        self.store.update_order_status(&order).await?;
        info!(order_id = %order.id(), shipped_by = %user.id, "order shipped");
        self.events.publish(&OrderEvent::Shipped { order_id: order.id() }).await;
        Ok(order)
    }
}
