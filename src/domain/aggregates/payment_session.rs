//! Payment Session
//!
//! Links a gateway authority to the order, cart and user it was issued for.
//! Lives from checkout until a successful callback deletes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::Authority;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub authority: Authority,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn new(authority: Authority, user_id: Uuid, cart_id: Uuid, order_id: Uuid) -> Self {
        Self { authority, user_id, cart_id, order_id, created_at: Utc::now() }
    }

    /// A newer session for the same order makes this one stale.
    pub fn is_superseded_by(&self, newer: &PaymentSession) -> bool {
        self.order_id == newer.order_id && self.authority != newer.authority
    }
}
