use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;

use super::extract::AdminUser;
use super::{parse_id, AppState};
use crate::auth::AuthUser;
use crate::errors::AppError;

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn my_orders<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.my_orders(user.id).await?))
}

pub async fn get<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.orders.get_order(&user, id).await?))
}

pub async fn list_all<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list_orders().await?))
}

pub async fn update_status<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.orders.update_status(id, payload.status).await?))
}
