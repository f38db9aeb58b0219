use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use storefront_types::domain::cart::{Cart, CartOwner, LineKey};
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;
use uuid::Uuid;

use super::extract::MaybeUser;
use super::{parse_id, AppState};
use crate::application::cart_service::AddItem;
use crate::auth::AuthUser;
use crate::errors::AppError;

#[derive(Deserialize)]
pub struct GuestQuery {
    pub guest_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub guest_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub guest_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RemoveLineQuery {
    pub size: Option<String>,
    pub color: Option<String>,
    pub guest_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub guest_id: String,
}

/// A verified token wins over any guest id.
fn owner_of(user: Option<AuthUser>, guest_id: Option<String>) -> Option<CartOwner> {
    match (user, guest_id.filter(|g| !g.trim().is_empty())) {
        (Some(u), _) => Some(CartOwner::User(u.id)),
        (None, Some(g)) => Some(CartOwner::Guest(g)),
        (None, None) => None,
    }
}

fn require_owner(user: Option<AuthUser>, guest_id: Option<String>) -> Result<CartOwner, AppError> {
    owner_of(user, guest_id)
        .ok_or_else(|| AppError::Unauthorized("sign in or provide a guest_id".into()))
}

pub async fn add<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Json<Cart>, AppError> {
    let owner = owner_of(user, payload.guest_id)
        .unwrap_or_else(|| CartOwner::Guest(format!("guest_{}", Uuid::new_v4())));
    let item = AddItem {
        product_id: payload.product_id,
        quantity: payload.quantity,
        size: payload.size,
        color: payload.color,
    };
    Ok(Json(state.carts.add_item(&owner, item).await?))
}

pub async fn get<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<GuestQuery>,
) -> Result<Json<Cart>, AppError> {
    let owner = require_owner(user, query.guest_id)?;
    Ok(Json(state.carts.get_cart(&owner).await?))
}

pub async fn update<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Json<Cart>, AppError> {
    let owner = require_owner(user, payload.guest_id)?;
    let key = LineKey::new(payload.product_id, payload.size, payload.color);
    Ok(Json(
        state.carts.set_quantity(&owner, key, payload.quantity).await?,
    ))
}

pub async fn remove<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    MaybeUser(user): MaybeUser,
    Path(product_id): Path<String>,
    Query(query): Query<RemoveLineQuery>,
) -> Result<Json<Cart>, AppError> {
    let product_id = parse_id(&product_id)?;
    let owner = require_owner(user, query.guest_id)?;
    let key = LineKey::new(product_id, query.size, query.color);
    Ok(Json(state.carts.remove_item(&owner, key).await?))
}

pub async fn merge<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Json(payload): Json<MergeRequest>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.carts.merge(&payload.guest_id, user.id).await?))
}
