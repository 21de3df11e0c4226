// src/middleware/modules.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{auth::Principal, modules::ModuleKey},
};

/// Módulo que protege una ruta.
pub trait ModuleDef: Send + Sync + 'static {
    fn key() -> ModuleKey;
}

/// Deja pasar si el módulo es visible para el usuario, o si es administrador.
pub struct RequireModule<M>(pub PhantomData<M>);

impl<M, S> FromRequestParts<S> for RequireModule<M>
where
    M: ModuleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_header(
            parts
                .headers
                .get(axum::http::header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
        );

        let principal = parts
            .extensions
            .get::<Principal>()
            .ok_or(AppError::InvalidToken)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        app_state
            .visibility_service
            .ensure_access(M::key(), principal)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        Ok(RequireModule(PhantomData))
    }
}

// ---
// MÓDULOS PROTEGIDOS
// ---

pub struct CalendarModule;
impl ModuleDef for CalendarModule {
    fn key() -> ModuleKey { ModuleKey::Calendario }
}

pub struct AnnouncementsModule;
impl ModuleDef for AnnouncementsModule {
    fn key() -> ModuleKey { ModuleKey::Anuncios }
}

pub struct SumModule;
impl ModuleDef for SumModule {
    fn key() -> ModuleKey { ModuleKey::Sum }
}

pub struct CartsModule;
impl ModuleDef for CartsModule {
    fn key() -> ModuleKey { ModuleKey::Carts }
}
