use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{GatewayError, PaymentGateway, PaymentRequest, Verification, VerifyRequest, CODE_VERIFIED};
use crate::config::GatewayConfig;
use crate::domain::value_objects::Authority;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTPS client for the gateway's v4 endpoints.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    request_url: String,
    verify_url: String,
}

/// The gateway wraps results in `data` on success and `errors` on failure;
/// the other one is an empty array.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Deserialize)]
struct RequestData {
    code: i64,
    authority: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    code: i64,
    ref_id: Option<i64>,
}

impl Envelope {
    fn data<T: DeserializeOwned>(&self) -> Option<T> { serde_json::from_value(self.data.clone()).ok() }
    fn error_code(&self) -> Option<i64> { self.errors.get("code").and_then(Value::as_i64) }
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, &config.request_url, &config.verify_url))
    }

    pub fn with_client(client: reqwest::Client, request_url: &str, verify_url: &str) -> Self {
        Self { client, request_url: request_url.to_string(), verify_url: verify_url.to_string() }
    }

    async fn post<B: serde::Serialize + Sync>(&self, url: &str, body: &B) -> Result<(u16, Envelope), GatewayError> {
        let response = self.client.post(url).header(ACCEPT, "application/json").json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(url, status = status.as_u16(), "gateway responded");
        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => Ok((status.as_u16(), envelope)),
            Err(_) if !status.is_success() => Err(GatewayError::Status(status.as_u16())),
            Err(e) => Err(GatewayError::Malformed(e.to_string())),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn request_payment(&self, request: &PaymentRequest) -> Result<Authority, GatewayError> {
        let (status, envelope) = self.post(&self.request_url, request).await?;
        let Some(data) = envelope.data::<RequestData>() else {
            return Err(match envelope.error_code() {
                Some(code) => GatewayError::Rejected(code),
                None if !(200..300).contains(&status) => GatewayError::Status(status),
                None => GatewayError::Malformed("missing data".into()),
            });
        };
        if data.code != CODE_VERIFIED { return Err(GatewayError::Rejected(data.code)); }
        let authority = data.authority.ok_or_else(|| GatewayError::Malformed("missing authority".into()))?;
        Authority::new(authority).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    async fn verify_payment(&self, request: &VerifyRequest) -> Result<Verification, GatewayError> {
        let (status, envelope) = self.post(&self.verify_url, request).await?;
        if let Some(data) = envelope.data::<VerifyData>() {
            return Ok(Verification { code: data.code, ref_id: data.ref_id });
        }
        match envelope.error_code() {
            Some(code) => Ok(Verification { code, ref_id: None }),
            None if !(200..300).contains(&status) => Err(GatewayError::Status(status)),
            None => Err(GatewayError::Malformed("missing data".into())),
        }
    }
}
