use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use storefront_types::domain::product::{Product, ProductInput};
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;

use super::extract::AdminUser;
use super::{parse_id, AppState};
use crate::errors::AppError;

pub async fn list<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list_products().await?))
}

pub async fn get<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.products.get_product(id).await?))
}

pub async fn create<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    _admin: AdminUser,
    Json(payload): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.products.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.products.update_product(id, payload).await?))
}

pub async fn remove<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
