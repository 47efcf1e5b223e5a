//! Checkout: turn the user's cart into a pending order and open a payment
//! with the gateway.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::aggregates::{CartLine, Order, PaymentSession, User, UserProfile};
use crate::domain::events::OrderEvent;
use crate::domain::stock;
use crate::domain::value_objects::{Authority, Money};
use crate::gateway::{PaymentGateway, PaymentMetadata, PaymentRequest};
use crate::publisher::EventPublisher;
use crate::store::{CommerceStore, StoreError};
use crate::{AppError, GatewayPhase, Result};

pub const PROFILE_INCOMPLETE: &str = "Please complete your profile before checkout";
pub const CART_EMPTY: &str = "Cart is empty";
pub const CHECKOUT_IN_PROGRESS: &str = "Another checkout is in progress, please retry";

#[derive(Debug, Clone)]
pub struct CheckoutRedirect {
    pub payment_url: String,
    pub order_id: Uuid,
    pub authority: Authority,
    pub total_price: Money,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CommerceStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<GatewayConfig>,
    events: EventPublisher,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>, config: Arc<GatewayConfig>, events: EventPublisher) -> Self {
        Self { store, gateway, config, events }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn checkout(&self, user: &User) -> Result<CheckoutRedirect> {
        let profile = self.store.find_profile(user.id).await?.unwrap_or_else(|| UserProfile::empty(user.id));
        if !profile.is_complete() {
            debug!(missing = ?profile.missing_fields(), "checkout refused, profile incomplete");
            return Err(AppError::validation(PROFILE_INCOMPLETE));
        }

        let cart = match self.store.find_cart(user.id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(AppError::validation(CART_EMPTY)),
        };

        if let Err(shortages) = stock::ensure_available(&cart.lines) {
            warn!(shortages = %stock::describe(&shortages), "checkout refused, insufficient stock");
            return Err(AppError::InsufficientStock(shortages));
        }

        let order = self.snapshot_pending_order(user.id, &cart.lines).await?;

        let amount = order
            .total_price()
            .to_minor_units(self.config.minor_units)
            .map_err(|e| AppError::Internal(format!("order {} total {}: {}", order.id(), order.total_price(), e)))?;
        let request = PaymentRequest {
            merchant_id: self.config.merchant_id.clone(),
            amount,
            callback_url: self.config.callback_url.clone(),
            currency: self.config.currency.clone(),
            description: self.config.description.clone(),
            metadata: PaymentMetadata { email: user.email.clone(), order_id: order.id().to_string() },
        };
        let authority = self.gateway.request_payment(&request).await.map_err(|e| {
            warn!(order_id = %order.id(), error = %e, "payment request failed");
            AppError::gateway(GatewayPhase::Initiate, "Payment request failed")
        })?;

        let session = PaymentSession::new(authority.clone(), user.id, cart.cart.id, order.id());
        self.store.record_payment_session(&session).await?;

        info!(order_id = %order.id(), %authority, total = %order.total_price(), amount, "checkout started");
        self.events
            .publish(&OrderEvent::CheckoutStarted {
                order_id: order.id(),
                user_id: user.id,
                total: order.total_price().amount(),
                authority: authority.to_string(),
            })
            .await;

        Ok(CheckoutRedirect {
            payment_url: self.config.payment_url(authority.as_str()),
            order_id: order.id(),
            authority,
            total_price: order.total_price(),
        })
    }

    /// Writes the cart onto the user's pending order, reusing the order of an
    /// abandoned earlier attempt. When a concurrent checkout saved its own
    /// pending order first, the snapshot is written onto that one instead.
    async fn snapshot_pending_order(&self, user_id: Uuid, lines: &[CartLine]) -> Result<Order> {
        let mut conflict = None;
        for _ in 0..2 {
            let mut order = self.store.find_pending_order(user_id).await?.unwrap_or_else(|| Order::open(user_id));
            order.snapshot(lines).map_err(|e| AppError::Internal(format!("order {}: {}", order.id(), e)))?;
            match self.store.save_pending_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::Conflict(reason)) => {
                    debug!(%reason, "pending order changed under us, re-reading");
                    conflict = Some(reason);
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(reason = ?conflict, "checkout gave up on a contended pending order");
        Err(AppError::Conflict(CHECKOUT_IN_PROGRESS.into()))
    }
}
