use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AppState, AuthenticatedUser};
use crate::domain::aggregates::{Order, UserProfile};
use crate::services::payment::PAYMENT_COMPLETED;
use crate::services::CartView;
use crate::Result;

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "storefront"}))
}

pub async fn checkout(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<Json<Value>> {
    let redirect = s.checkout.checkout(&user).await?;
    Ok(Json(json!({"payment_url": redirect.payment_url})))
}

/// Query string the gateway appends when redirecting the customer back.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Authority")]
    pub authority: Option<String>,
}

pub async fn payment_callback(State(s): State<AppState>, Query(p): Query<CallbackParams>) -> Result<Json<Value>> {
    s.payments.confirm(p.status.as_deref(), p.authority.as_deref()).await?;
    Ok(Json(json!({"message": PAYMENT_COMPLETED})))
}

pub async fn get_cart(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<Json<CartView>> {
    Ok(Json(s.carts.view(&user).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 { 1 }

pub async fn add_to_cart(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser, body: std::result::Result<Json<AddToCartRequest>, JsonRejection>) -> Result<(StatusCode, Json<Value>)> {
    let Json(r) = body?;
    let item = s.carts.add(&user, r.product_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(json!({"message": "Product added to cart successfully", "item": item}))))
}

pub async fn remove_from_cart(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser, Path(item_id): Path<Uuid>) -> Result<Json<Value>> {
    s.carts.remove(&user, item_id).await?;
    Ok(Json(json!({"message": "Product removed from cart successfully"})))
}

pub async fn list_orders(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list(&user).await?))
}

pub async fn get_order(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.get(&user, id).await?))
}

pub async fn ship_order(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.ship(&user, id).await?))
}

pub async fn get_profile(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser) -> Result<Json<UserProfile>> {
    Ok(Json(s.profiles.get(&user).await?))
}

pub async fn update_profile(State(s): State<AppState>, AuthenticatedUser(user): AuthenticatedUser, body: std::result::Result<Json<UserProfile>, JsonRejection>) -> Result<Json<UserProfile>> {
    let Json(p) = body?;
    Ok(Json(s.profiles.update(&user, p).await?))
}

pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<Value> {
    Json(json!({"message": format!("Hello, {} (id: {})", user.username, user.id)}))
}
