// src/services/identity.rs

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::common::error::AppError;

/// Identidad ya verificada por el proveedor externo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Proveedor de identidad: valida la credencial que trae el cliente.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AppError>;
}

// Claims mínimos de un ID token OIDC
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Verifica ID tokens RS256 con la clave pública del proveedor.
pub struct OidcIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl OidcIdentityProvider {
    pub fn from_rsa_pem(pem: &str, audience: &str, issuer: Option<&str>) -> Result<Self, AppError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { decoding_key, validation })
    }
}

#[async_trait]
impl IdentityProvider for OidcIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AppError> {
        let token_data = decode::<IdTokenClaims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("ID token rechazado: {}", e);
                AppError::InvalidToken
            })?;

        let claims = token_data.claims;
        // Sin email la admisión lo clasificará como no reconocido
        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email.unwrap_or_default(),
            display_name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const PRIVATE_PEM: &str = include_str!("testdata/idp_private.pem");
    const PUBLIC_PEM: &str = include_str!("testdata/idp_public.pem");

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        email: &'a str,
        name: &'a str,
        aud: &'a str,
        iss: &'a str,
        exp: usize,
    }

    fn sign(aud: &str) -> String {
        let claims = TestClaims {
            sub: "k9Jx2mQp7rT",
            email: "mgarcia@iesamachado.org",
            name: "María García",
            aud,
            iss: "https://accounts.example.org",
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        let key = EncodingKey::from_rsa_pem(PRIVATE_PEM.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
    }

    fn provider() -> OidcIdentityProvider {
        OidcIdentityProvider::from_rsa_pem(
            PUBLIC_PEM,
            "intranet-web",
            Some("https://accounts.example.org"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_a_token_signed_by_the_provider() {
        let identity = provider().verify(&sign("intranet-web")).await.unwrap();
        assert_eq!(identity.uid, "k9Jx2mQp7rT");
        assert_eq!(identity.email, "mgarcia@iesamachado.org");
        assert_eq!(identity.display_name.as_deref(), Some("María García"));
    }

    #[tokio::test]
    async fn rejects_a_token_for_another_audience() {
        let result = provider().verify(&sign("another-app")).await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let result = provider().verify("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }
}
