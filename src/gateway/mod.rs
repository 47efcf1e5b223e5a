//! Payment gateway protocol: initiate a payment, then verify it after the
//! gateway redirects the customer back to us.

mod client;

pub use client::HttpGateway;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use crate::domain::value_objects::Authority;

/// `Status` query value the gateway sends when the customer paid.
pub const STATUS_OK: &str = "OK";
/// Fresh successful verification.
pub const CODE_VERIFIED: i64 = 100;
/// The payment was already verified before.
pub const CODE_ALREADY_VERIFIED: i64 = 101;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub merchant_id: String,
    pub amount: i64,
    pub callback_url: String,
    pub currency: String,
    pub description: String,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMetadata {
    pub email: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub merchant_id: String,
    pub amount: i64,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub code: i64,
    pub ref_id: Option<i64>,
}

impl Verification {
    pub fn is_accepted(&self) -> bool { matches!(self.code, CODE_VERIFIED | CODE_ALREADY_VERIFIED) }
    pub fn is_replay(&self) -> bool { self.code == CODE_ALREADY_VERIFIED }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned HTTP {0}")]
    Status(u16),
    #[error("gateway rejected the request with code {0}")]
    Rejected(i64),
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment and returns the authority the customer pays against.
    async fn request_payment(&self, request: &PaymentRequest) -> Result<Authority, GatewayError>;

    /// Asks the gateway whether the payment behind an authority went through.
    /// Any code the gateway reports is returned; judging it is up to the caller.
    async fn verify_payment(&self, request: &VerifyRequest) -> Result<Verification, GatewayError>;
}
