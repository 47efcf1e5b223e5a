//! Environment-driven configuration.

use std::env;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub gateway: Arc<GatewayConfig>,
}

/// Everything the checkout and callback flows need to talk to the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub request_url: String,
    pub verify_url: String,
    pub start_pay_url: String,
    pub callback_url: String,
    pub currency: String,
    /// Decimal places between a price and the integer amount the gateway expects.
    pub minor_units: u32,
    pub description: String,
}

impl GatewayConfig {
    pub fn payment_url(&self, authority: &str) -> String { format!("{}{}", self.start_pay_url, authority) }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = parse_or("PORT", 8083)?;
        let database_url = required("DATABASE_URL")?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let nats_url = env::var("NATS_URL").ok().filter(|v| !v.trim().is_empty());

        let gateway = GatewayConfig {
            merchant_id: required("GATEWAY_MERCHANT_ID")?,
            request_url: var_or("GATEWAY_REQUEST_URL", "https://sandbox.zarinpal.com/pg/v4/payment/request.json"),
            verify_url: var_or("GATEWAY_VERIFY_URL", "https://sandbox.zarinpal.com/pg/v4/payment/verify.json"),
            start_pay_url: var_or("GATEWAY_START_PAY_URL", "https://sandbox.zarinpal.com/pg/StartPay/"),
            callback_url: var_or("GATEWAY_CALLBACK_URL", &format!("http://localhost:{}/api/v1/payment/callback", port)),
            currency: var_or("GATEWAY_CURRENCY", "IRT"),
            minor_units: parse_or("GATEWAY_MINOR_UNITS", 0)?,
            description: var_or("GATEWAY_DESCRIPTION", "Order payment"),
        };

        tracing::info!(port, gateway = %gateway.request_url, nats = nats_url.is_some(), "configuration loaded");
        Ok(Self { port, database_url, database_max_connections, nats_url, gateway: Arc::new(gateway) })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).ok().filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(name))
}

fn var_or(name: &str, default: &str) -> String { env::var(name).unwrap_or_else(|_| default.to_string()) }

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
        Err(_) => Ok(default),
    }
}
