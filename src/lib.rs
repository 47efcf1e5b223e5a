//! Storefront
//!
//! E-commerce backend: carts, shipping profiles, orders, and a checkout flow
//! that hands the customer to an external payment gateway and reconciles the
//! result when the gateway calls back.
//!
//! ## Features
//! - Per-user carts with stock-checked additions
//! - Checkout into a pending order snapshot plus a gateway payment session
//! - Atomic settlement on the gateway callback (stock, order, cart together)
//! - Order history and shipping

pub mod config;
pub mod domain;
pub mod gateway;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::domain::stock::StockShortage;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Which gateway call failed. A failed initiate is our problem (500); a bad
/// verify answer rejects the callback (400).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPhase {
    Initiate,
    Verify,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid profile fields")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Insufficient stock for {}", product_names(.0))]
    InsufficientStock(Vec<StockShortage>),

    #[error("{0}")]
    NotFound(String),

    #[error("Payment session not found")]
    SessionNotFound,

    #[error("{message}")]
    Payment { message: String, code: Option<i64> },

    #[error("{message}")]
    Gateway { phase: GatewayPhase, message: String },

    #[error("{0}")]
    Processing(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }
    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }
    pub fn payment_failed() -> Self { Self::Payment { message: "Payment failed".into(), code: None } }
    pub fn rejected_by_gateway(code: i64) -> Self {
        Self::Payment { message: format!("Payment verification failed with code {}", code), code: Some(code) }
    }
    pub fn gateway(phase: GatewayPhase, message: impl Into<String>) -> Self { Self::Gateway { phase, message: message.into() } }
}

fn product_names(shortages: &[StockShortage]) -> String {
    shortages.iter().map(|s| s.product.as_str()).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, AppError>;
