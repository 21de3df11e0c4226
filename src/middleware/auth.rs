// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState, models::auth::Principal};

// Valida el token de sesión y deja el usuario en las "extensions"
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;

    let principal = app_state.auth_service.validate_token(bearer.token()).await?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

// Solo administradores. Debe ir por dentro de `auth_guard`.
pub async fn admin_guard(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<Principal>()
        .map(|p| p.is_admin)
        .ok_or(AppError::InvalidToken)?;

    if !is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

// Usuario autenticado, directamente en los handlers
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}
