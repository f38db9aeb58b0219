use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use storefront_types::domain::user::User;
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;

use super::AppState;
use crate::application::user_service::{AuthResponse, LoginRequest, RegisterRequest};
use crate::auth::AuthUser;
use crate::errors::AppError;

pub async fn register<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let res = state.users.register(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn login<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.users.login(payload).await?))
}

pub async fn profile<R: Store, G: PaymentGateway>(
    State(state): State<AppState<R, G>>,
    user: AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.profile(user.id).await?))
}
