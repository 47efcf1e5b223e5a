//! Payment callback: verify the payment with the gateway and settle it.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::events::OrderEvent;
use crate::domain::stock;
use crate::gateway::{GatewayError, PaymentGateway, VerifyRequest, STATUS_OK};
use crate::publisher::EventPublisher;
use crate::store::{CommerceStore, Settlement};
use crate::{AppError, GatewayPhase, Result};

pub const PAYMENT_COMPLETED: &str = "Payment successful and order completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    pub ref_id: Option<i64>,
    /// The gateway had already verified this payment (code 101).
    pub replayed: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn CommerceStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<GatewayConfig>,
    events: EventPublisher,
}

impl PaymentService {
    pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>, config: Arc<GatewayConfig>, events: EventPublisher) -> Self {
        Self { store, gateway, config, events }
    }

    /// Handles the gateway's redirect back to us.
    ///
    /// Nothing is written unless the gateway accepts the payment and the
    /// settlement transaction commits. A failed settlement leaves the session
    /// in place, so the callback can be retried; the gateway answers 101 for
    /// an already verified payment and settlement never runs twice for one
    /// session.
    #[instrument(skip(self, status))]
    pub async fn confirm(&self, status: Option<&str>, authority: Option<&str>) -> Result<PaymentConfirmation> {
        let authority = match (status, authority.map(str::trim)) {
            (Some(STATUS_OK), Some(authority)) if !authority.is_empty() => authority,
            _ => {
                warn!(?status, "payment callback reports failure");
                return Err(AppError::payment_failed());
            }
        };

        let session = self.store.find_payment_session(authority).await?.ok_or(AppError::SessionNotFound)?;
        // Verify against what the customer was charged, not what the cart says now.
        let order = self
            .store
            .find_order(session.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        let amount = order
            .total_price()
            .to_minor_units(self.config.minor_units)
            .map_err(|e| AppError::Internal(format!("order {} total {}: {}", order.id(), order.total_price(), e)))?;

        let request = VerifyRequest { merchant_id: self.config.merchant_id.clone(), amount, authority: authority.to_string() };
        let verification = self.gateway.verify_payment(&request).await.map_err(|e| {
            warn!(order_id = %order.id(), error = %e, "payment verification failed");
            match e {
                GatewayError::Rejected(code) => AppError::rejected_by_gateway(code),
                GatewayError::Malformed(_) => AppError::gateway(GatewayPhase::Verify, "Invalid payment response"),
                GatewayError::Transport(_) | GatewayError::Status(_) => {
                    AppError::gateway(GatewayPhase::Verify, "Payment verification request failed")
                }
            }
        })?;
        if !verification.is_accepted() {
            warn!(order_id = %order.id(), code = verification.code, "gateway rejected payment");
            return Err(AppError::rejected_by_gateway(verification.code));
        }

        match self.store.settle_payment(authority).await {
            Ok(Settlement::Completed { order_id, user_id, total_price }) => {
                info!(%order_id, ref_id = ?verification.ref_id, replayed = verification.is_replay(), "payment settled");
                self.events.publish(&OrderEvent::Completed { order_id, user_id, total: total_price.amount() }).await;
                Ok(PaymentConfirmation { order_id, ref_id: verification.ref_id, replayed: verification.is_replay() })
            }
            Ok(Settlement::SessionMissing) => {
                warn!(order_id = %order.id(), "payment session consumed by a concurrent callback");
                Err(AppError::SessionNotFound)
            }
            Ok(Settlement::InsufficientStock(shortages)) => {
                warn!(order_id = %order.id(), shortages = %stock::describe(&shortages), "paid order left pending, stock ran out");
                Err(AppError::InsufficientStock(shortages))
            }
            Err(e) => {
                error!(order_id = %order.id(), error = %e, "settlement rolled back");
                Err(AppError::Processing("Payment processing failed".into()))
            }
        }
    }
}
