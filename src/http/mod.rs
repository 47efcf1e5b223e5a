//! HTTP surface: routes, authentication and error mapping.

mod auth;
mod error;
mod handlers;

pub use auth::{AuthenticatedUser, USER_ID_HEADER};

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::gateway::PaymentGateway;
use crate::publisher::EventPublisher;
use crate::services::{CartService, CheckoutService, OrderService, PaymentService, ProfileService};
use crate::store::CommerceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CommerceStore>,
    pub checkout: CheckoutService,
    pub payments: PaymentService,
    pub carts: CartService,
    pub orders: OrderService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>, config: Arc<GatewayConfig>, events: EventPublisher) -> Self {
        Self {
            checkout: CheckoutService::new(store.clone(), gateway.clone(), config.clone(), events.clone()),
            payments: PaymentService::new(store.clone(), gateway, config, events.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone(), events),
            profiles: ProfileService::new(store.clone()),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/checkout", post(handlers::checkout))
        .route("/api/v1/payment/callback", get(handlers::payment_callback))
        .route("/api/v1/cart", get(handlers::get_cart).post(handlers::add_to_cart))
        .route("/api/v1/cart/:item_id", delete(handlers::remove_from_cart))
        .route("/api/v1/orders", get(handlers::list_orders))
        .route("/api/v1/orders/:id", get(handlers::get_order))
        .route("/api/v1/orders/:id/ship", post(handlers::ship_order))
        .route("/api/v1/profile", get(handlers::get_profile).put(handlers::update_profile))
        .route("/api/v1/me", get(handlers::me))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
