use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use storefront_types::domain::checkout::Checkout;
use storefront_types::domain::order::Order;
use storefront_types::ports::payment_gateway::{PaymentGateway, PaymentSession};
use storefront_types::ports::Store;

use super::{parse_id, AppState};
use crate::application::checkout_service::{
    CallbackOutcome, CallbackParams, NewCheckout, PaymentConfirmation,
};
use crate::auth::AuthUser;
use crate::errors::AppError;

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub pidx: String,
}

pub async fn create<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Json(payload): Json<NewCheckout>,
) -> Result<(StatusCode, Json<Checkout>), AppError> {
    let checkout = state.checkouts.create_checkout(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub async fn get<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Checkout>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.checkouts.get_checkout(user.id, id).await?))
}

pub async fn initiate_khalti<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentSession>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.checkouts.initiate_payment(user.id, id).await?))
}

pub async fn verify_payment<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<PaymentConfirmation>, AppError> {
    Ok(Json(
        state.checkouts.verify_payment(user.id, &payload.pidx).await?,
    ))
}

pub async fn finalize<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let id = parse_id(&id)?;
    let order = state.checkouts.finalize(user.id, id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The gateway's own `status` query parameter is ignored; the outcome comes
/// from a server-side lookup.
pub async fn khalti_callback<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let site = state.config.site_url.trim_end_matches('/');
    let target = match state.checkouts.handle_callback(params).await {
        CallbackOutcome::Success { order_id } => {
            format!("{site}/order-confirmation?orderId={order_id}&status=success")
        }
        CallbackOutcome::Failed => format!("{site}/order-confirmation?status=failed"),
    };
    Redirect::to(&target)
}
