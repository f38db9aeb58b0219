//! Bearer-token extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use storefront_types::ports::payment_gateway::PaymentGateway;
use storefront_types::ports::Store;

use super::server::AppState;
use crate::auth::{AuthUser, TokenService};
use crate::errors::AppError;

/// Token when present; a malformed or expired one is still rejected.
pub struct MaybeUser(pub Option<AuthUser>);

pub struct AdminUser(pub AuthUser);

fn bearer(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid authorization header".into()))?;
    TokenService::extract_from_header(header)
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("invalid authorization header".into()))
}

impl<R: Store, G: PaymentGateway> FromRequestParts<AppState<R, G>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R, G>,
    ) -> Result<Self, Self::Rejection> {
        match bearer(parts)? {
            Some(token) => {
                let user = state.tokens.verify(token).inspect_err(|e| {
                    tracing::warn!(uri = %parts.uri, error = %e, "rejected bearer token");
                })?;
                Ok(MaybeUser(Some(user)))
            }
            None => Ok(MaybeUser(None)),
        }
    }
}

impl<R: Store, G: PaymentGateway> FromRequestParts<AppState<R, G>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R, G>,
    ) -> Result<Self, Self::Rejection> {
        MaybeUser::from_request_parts(parts, state)
            .await?
            .0
            .ok_or_else(|| AppError::Unauthorized("not authorized, no token".into()))
    }
}

impl<R: Store, G: PaymentGateway> FromRequestParts<AppState<R, G>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R, G>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("not authorized as an admin".into()));
        }
        Ok(AdminUser(user))
    }
}
