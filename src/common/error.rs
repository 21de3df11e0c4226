// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::{auth::AdmissionDenial, modules::ModuleKey},
};

// Errores de dominio.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Acceso denegado: {0}")]
    AuthDenied(AdmissionDenial),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Operación no permitida")]
    Forbidden,

    #[error("Módulo deshabilitado: {0}")]
    ModuleDisabled(ModuleKey),

    #[error("No encontrado: {0}")]
    NotFound(String),

    #[error("Validación fallida: {0}")]
    ValidationFailed(String),

    #[error("La franja ya está reservada")]
    SlotTaken,

    #[error("Día no reservable")]
    DayNotBookable,

    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Error de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Error listo para la respuesta HTTP, ya traducido.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::ValidationFailed(_)
            | AppError::DayNotBookable => StatusCode::BAD_REQUEST,
            AppError::AuthDenied(_) | AppError::Forbidden | AppError::ModuleDisabled(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotTaken => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "error.validation",
            AppError::AuthDenied(denial) => denial.message_key(),
            AppError::InvalidToken => "error.invalid_token",
            AppError::Forbidden => "error.forbidden",
            AppError::ModuleDisabled(_) => "error.module_disabled",
            AppError::NotFound(_) => "error.not_found",
            AppError::ValidationFailed(_) => "error.validation_failed",
            AppError::SlotTaken => "error.slot_taken",
            AppError::DayNotBookable => "error.day_not_bookable",
            _ => "error.internal",
        }
    }

    /// Traduce el error al idioma del cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        let mut error = i18n.translate(&locale.0, self.message_key());

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_deref().unwrap_or(e.code.as_ref());
                            Value::String(i18n.translate(&locale.0, &format!("validation.{}", code)))
                        })
                        .collect();
                    fields.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(fields))
            }
            AppError::NotFound(what) | AppError::ValidationFailed(what) => {
                Some(json!({ "reason": what }))
            }
            AppError::ModuleDisabled(key) => Some(json!({ "module": key })),
            _ => None,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // El detalle solo va al log
            tracing::error!("Error interno del servidor: {:?}", self);
            error = i18n.translate(&locale.0, "error.internal");
        }

        ApiError { status, error, details }
    }
}

// Extractores sin acceso al I18nStore
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(AppError::AuthDenied(AdmissionDenial::NumericPrefix).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::SlotTaken.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DayNotBookable.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("ticket".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::ModuleDisabled(ModuleKey::Sum).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn messages_are_localized() {
        let store = I18nStore::global();
        let es = AppError::SlotTaken.to_api_error(&Locale("es".into()), store);
        let en = AppError::SlotTaken.to_api_error(&Locale("en".into()), store);
        assert_ne!(es.error, en.error);
        assert_eq!(es.status, StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exhausted on node 3"));
        let api = err.to_api_error(&Locale("es".into()), I18nStore::global());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("pool"));
        assert!(api.details.is_none());
    }
}
