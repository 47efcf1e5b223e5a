//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    CheckoutStarted { order_id: Uuid, user_id: Uuid, total: Decimal, authority: String },
    Completed { order_id: Uuid, user_id: Uuid, total: Decimal },
    Shipped { order_id: Uuid },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::CheckoutStarted { .. } => "storefront.orders.checkout_started",
            Self::Completed { .. } => "storefront.orders.completed",
            Self::Shipped { .. } => "storefront.orders.shipped",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            Self::CheckoutStarted { order_id, .. } | Self::Completed { order_id, .. } | Self::Shipped { order_id } => *order_id,
        }
    }
}
