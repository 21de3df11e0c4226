// src/services/auth.rs

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::{AuditRepository, UserRepository},
    models::auth::{AdmissionDenial, AuthResponse, Claims, LoginOutcome, Principal},
    services::identity::IdentityProvider,
};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Regla de admisión sobre el correo ya verificado por el proveedor.
pub fn check_admission(email: &str, domain: &str) -> Result<(), AdmissionDenial> {
    let email = normalize_email(email);
    let domain = normalize_email(domain);

    let (local, email_domain) = email.split_once('@').ok_or(AdmissionDenial::Unrecognized)?;
    if local.is_empty() || email_domain.is_empty() {
        return Err(AdmissionDenial::Unrecognized);
    }

    if email_domain != domain {
        return Err(AdmissionDenial::DomainMismatch);
    }

    // Las cuentas de alumnado llevan un número justo antes de la @
    if local.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        return Err(AdmissionDenial::NumericPrefix);
    }

    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    audit_repo: AuditRepository,
    identity: Arc<dyn IdentityProvider>,
    jwt_secret: String,
    session_ttl: chrono::Duration,
    institutional_domain: String,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        audit_repo: AuditRepository,
        identity: Arc<dyn IdentityProvider>,
        jwt_secret: String,
        session_ttl: chrono::Duration,
        institutional_domain: String,
    ) -> Self {
        Self { user_repo, audit_repo, identity, jwt_secret, session_ttl, institutional_domain }
    }

    pub async fn sign_in(&self, credential: &str) -> Result<AuthResponse, AppError> {
        // 1. El proveedor valida la credencial
        let identity = self.identity.verify(credential).await?;
        let email = normalize_email(&identity.email);
        let name = identity.display_name.as_deref();

        // 2. Regla de admisión
        if let Err(denial) = check_admission(&email, &self.institutional_domain) {
            tracing::info!("Acceso rechazado para '{}': {}", email, denial);
            self.record_audit(LoginOutcome::Failed, &email, name, Some(denial.reason())).await;
            return Err(AppError::AuthDenied(denial));
        }

        self.record_audit(LoginOutcome::Success, &email, name, None).await;

        // 3. Perfil: se crea en el primer acceso y nunca se sobrescribe
        let created = self
            .user_repo
            .ensure_user(&identity.uid, &email, name)
            .await?;
        if created {
            tracing::info!("👤 Nuevo perfil creado para {}", email);
        }

        let principal = self
            .user_repo
            .find_by_uid(&identity.uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("usuario {}", identity.uid)))?;

        // 4. Token de sesión
        let token = self.create_token(&principal.uid)?;
        Ok(AuthResponse { token, principal })
    }

    pub async fn validate_token(&self, token: &str) -> Result<Principal, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.user_repo
            .find_by_uid(&token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn create_token(&self, uid: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        let claims = Claims {
            sub: uid.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    // Un fallo al escribir la auditoría nunca cambia el resultado del acceso
    async fn record_audit(
        &self,
        kind: LoginOutcome,
        email: &str,
        name: Option<&str>,
        reason: Option<&str>,
    ) {
        if let Err(e) = self.audit_repo.append(kind, email, name, reason).await {
            tracing::warn!("No se pudo registrar el acceso de '{}': {}", email, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "iesamachado.org";

    #[test]
    fn staff_accounts_are_admitted() {
        assert_eq!(check_admission("mgarcia@iesamachado.org", DOMAIN), Ok(()));
        assert_eq!(check_admission("  MGarcia@IESAMachado.org ", DOMAIN), Ok(()));
        // Un número en medio no es cuenta de alumnado
        assert_eq!(check_admission("jp3rez@iesamachado.org", DOMAIN), Ok(()));
    }

    #[test]
    fn student_accounts_are_rejected() {
        assert_eq!(
            check_admission("alumno123@iesamachado.org", DOMAIN),
            Err(AdmissionDenial::NumericPrefix)
        );
    }

    #[test]
    fn foreign_domains_are_rejected() {
        assert_eq!(
            check_admission("someone@gmail.com", DOMAIN),
            Err(AdmissionDenial::DomainMismatch)
        );
        // El dominio va antes que el prefijo numérico
        assert_eq!(
            check_admission("someone1@gmail.com", DOMAIN),
            Err(AdmissionDenial::DomainMismatch)
        );
    }

    #[test]
    fn malformed_emails_are_unrecognized() {
        for email in ["", "no-at-sign", "@iesamachado.org", "profe@"] {
            assert_eq!(check_admission(email, DOMAIN), Err(AdmissionDenial::Unrecognized), "{email}");
        }
    }
}
