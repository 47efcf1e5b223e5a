//! Shared fixtures: an in-memory store, a scripted gateway and a seeded
//! customer with a complete profile.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use storefront::config::GatewayConfig;
use storefront::domain::aggregates::{Product, User, UserProfile};
use storefront::domain::value_objects::{Authority, Money};
use storefront::gateway::{GatewayError, PaymentGateway, PaymentRequest, Verification, VerifyRequest};
use storefront::http::{router, AppState, USER_ID_HEADER};
use storefront::publisher::EventPublisher;
use storefront::store::{CommerceStore, MemoryStore};

pub const START_PAY_URL: &str = "https://gateway.test/StartPay/";

/// Hands out `AUTH-1`, `AUTH-2`, ... (or another prefix) and answers every verification with
/// the configured code, or with the configured failure.
pub struct StubGateway {
    prefix: String,
    issued: AtomicUsize,
    verify_code: AtomicI64,
    fail_requests: AtomicBool,
    verify_failure: Mutex<Option<fn() -> GatewayError>>,
    pub requests: Mutex<Vec<PaymentRequest>>,
    pub verifications: Mutex<Vec<VerifyRequest>>,
}

impl StubGateway {
    pub fn new() -> Self { Self::with_prefix("AUTH") }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issued: AtomicUsize::new(0),
            verify_code: AtomicI64::new(100),
            fail_requests: AtomicBool::new(false),
            verify_failure: Mutex::new(None),
            requests: Mutex::new(vec![]),
            verifications: Mutex::new(vec![]),
        }
    }

    pub fn answer_verify_with(&self, code: i64) { self.verify_code.store(code, Ordering::SeqCst); }

    pub fn fail_requests(&self) { self.fail_requests.store(true, Ordering::SeqCst); }

    pub fn fail_verify_with(&self, failure: fn() -> GatewayError) { *self.verify_failure.lock().unwrap() = Some(failure); }

    pub fn verify_calls(&self) -> usize { self.verifications.lock().unwrap().len() }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn request_payment(&self, request: &PaymentRequest) -> Result<Authority, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(GatewayError::Status(502));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Authority::new(format!("{}-{}", self.prefix, n)).unwrap())
    }

    async fn verify_payment(&self, request: &VerifyRequest) -> Result<Verification, GatewayError> {
        self.verifications.lock().unwrap().push(request.clone());
        if let Some(failure) = *self.verify_failure.lock().unwrap() {
            return Err(failure());
        }
        Ok(Verification { code: self.verify_code.load(Ordering::SeqCst), ref_id: Some(987654) })
    }
}

pub fn gateway_config() -> Arc<GatewayConfig> {
    Arc::new(GatewayConfig {
        merchant_id: "merchant-test".into(),
        request_url: "https://gateway.test/request.json".into(),
        verify_url: "https://gateway.test/verify.json".into(),
        start_pay_url: START_PAY_URL.into(),
        callback_url: "http://localhost:8083/api/v1/payment/callback".into(),
        currency: "IRT".into(),
        minor_units: 0,
        description: "Order payment".into(),
    })
}

pub fn money(amount: i64) -> Money { Money::new(Decimal::from(amount)) }

pub fn user(username: &str, is_staff: bool) -> User {
    User {
        id: Uuid::now_v7(),
        username: username.into(),
        email: format!("{}@example.com", username),
        is_staff,
        created_at: Utc::now(),
    }
}

pub fn complete_profile(user_id: Uuid) -> UserProfile {
    UserProfile {
        user_id,
        full_name: "Sara Karimi".into(),
        phone: "09120000000".into(),
        address: "12 Valiasr St".into(),
        city: "Tehran".into(),
        postal_code: "1234567890".into(),
        country: String::new(),
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
    pub state: AppState,
    pub customer: User,
}

impl TestApp {
    /// A customer with a complete profile and an empty store otherwise.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store.clone(), store).await
    }

    /// Same as [`TestApp::new`] but the services talk to `backend`, which
    /// is expected to wrap `store`.
    pub async fn with_store(store: Arc<MemoryStore>, backend: Arc<dyn CommerceStore>) -> Self {
        let gateway = Arc::new(StubGateway::new());
        let state = AppState::new(backend, gateway.clone(), gateway_config(), EventPublisher::disabled());
        let customer = user("sara", false);
        store.insert_user(customer.clone()).await;
        store.save_profile(&complete_profile(customer.id)).await.unwrap();
        Self { store, gateway, state, customer }
    }

    pub async fn seed_product(&self, name: &str, price: i64, stock: i32) -> Product {
        let mut product = Product::create(name, money(price));
        product.add_stock(stock).unwrap();
        self.store.insert_product(product.clone()).await;
        product
    }

    pub async fn add_to_cart(&self, product: &Product, quantity: i32) {
        self.state.carts.add(&self.customer, product.id(), quantity).await.unwrap();
    }

    /// Another customer with a complete profile.
    pub async fn add_customer(&self, username: &str) -> User {
        let customer = user(username, false);
        self.store.insert_user(customer.clone()).await;
        self.store.save_profile(&complete_profile(customer.id)).await.unwrap();
        customer
    }

    pub async fn checkout_as(&self, customer: &User, product: &Product, quantity: i32) -> String {
        self.state.carts.add(customer, product.id(), quantity).await.unwrap();
        self.state.checkout.checkout(customer).await.unwrap().authority.to_string()
    }

    pub async fn stock_of(&self, product: &Product) -> i32 { self.store.product(product.id()).await.unwrap().stock() }

    pub fn router(&self) -> Router { router(self.state.clone()) }

    pub async fn request(&self, method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.id.to_string());
        }
        let request = match body {
            Some(json) => builder.header("content-type", "application/json").body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }

    /// Sends `body` verbatim as a JSON request body.
    pub async fn request_raw(&self, method: Method, uri: &str, user: &User, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, user.id.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
