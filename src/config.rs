// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        AnnouncementRepository, AuditRepository, CalendarRepository, DepartmentRepository,
        ModuleRepository, ReservationRepository, TicketRepository, UserRepository,
    },
    services::{
        announcement_service::AnnouncementService,
        auth::AuthService,
        calendar_service::CalendarService,
        change_feed::ChangeFeed,
        dashboard_service::DashboardService,
        department_service::DepartmentService,
        identity::{IdentityProvider, OidcIdentityProvider},
        reservation_service::ReservationService,
        ticket_service::TicketService,
        user_service::UserService,
        visibility::VisibilityService,
    },
};

pub const DEFAULT_DOMAIN: &str = "iesamachado.org";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Configuración leída del entorno.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub institutional_domain: String,
    pub tic_hourly_rate: Decimal,
    pub idp_public_key_pem: String,
    pub idp_audience: String,
    pub idp_issuer: Option<String>,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };

        let session_ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(raw) => raw.parse().context("SESSION_TTL_HOURS inválido")?,
            None => 12,
        };
        let tic_hourly_rate = match lookup("TIC_HOURLY_RATE") {
            Some(raw) => raw.parse::<Decimal>().context("TIC_HOURLY_RATE inválido")?,
            None => Decimal::from(20),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_hours,
            institutional_domain: lookup("INSTITUTIONAL_DOMAIN")
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
                .to_lowercase(),
            tic_hourly_rate,
            // Los .env suelen guardar el PEM en una línea con "\n" literales
            idp_public_key_pem: required("IDP_PUBLIC_KEY_PEM")?.replace("\\n", "\n"),
            idp_audience: required("IDP_AUDIENCE")?,
            idp_issuer: lookup("IDP_ISSUER").filter(|v| !v.trim().is_empty()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub change_feed: ChangeFeed,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub visibility_service: VisibilityService,
    pub calendar_service: CalendarService,
    pub reservation_service: ReservationService,
    pub ticket_service: TicketService,
    pub department_service: DepartmentService,
    pub announcement_service: AnnouncementService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Settings::from_env()?;

        // Conexión a la base de datos
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexión con la base de datos establecida");

        let identity = OidcIdentityProvider::from_rsa_pem(
            &settings.idp_public_key_pem,
            &settings.idp_audience,
            settings.idp_issuer.as_deref(),
        )
        .map_err(|e| anyhow::anyhow!("Clave pública del proveedor de identidad inválida: {}", e))?;

        Ok(Self::build(db_pool, settings, Arc::new(identity)))
    }

    /// Monta el grafo de dependencias sobre un pool ya creado.
    pub fn build(db_pool: PgPool, settings: Settings, identity: Arc<dyn IdentityProvider>) -> Self {
        let change_feed = ChangeFeed::default();

        let user_repo = UserRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());
        let module_repo = ModuleRepository::new(db_pool.clone());
        let calendar_repo = CalendarRepository::new(db_pool.clone());
        let reservation_repo = ReservationRepository::new(db_pool.clone());
        let ticket_repo = TicketRepository::new(db_pool.clone());
        let department_repo = DepartmentRepository::new(db_pool.clone());
        let announcement_repo = AnnouncementRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            audit_repo.clone(),
            identity,
            settings.jwt_secret.clone(),
            chrono::Duration::hours(settings.session_ttl_hours),
            settings.institutional_domain.clone(),
        );
        let user_service = UserService::new(user_repo.clone(), department_repo.clone(), audit_repo);
        let visibility_service = VisibilityService::new(module_repo);
        let calendar_service =
            CalendarService::new(db_pool.clone(), calendar_repo.clone(), change_feed.clone());
        let reservation_service = ReservationService::new(
            db_pool.clone(),
            reservation_repo,
            calendar_repo,
            change_feed.clone(),
        );
        let ticket_service = TicketService::new(
            db_pool.clone(),
            ticket_repo,
            department_repo.clone(),
            user_repo.clone(),
            settings.tic_hourly_rate,
        );
        let department_service = DepartmentService::new(department_repo, user_repo);
        let announcement_service = AnnouncementService::new(announcement_repo);
        let dashboard_service = DashboardService::new(
            visibility_service.clone(),
            ticket_service.clone(),
            announcement_service.clone(),
        );

        Self {
            db_pool,
            settings: Arc::new(settings),
            i18n_store: Arc::new(I18nStore::load()),
            change_feed,
            auth_service,
            user_service,
            visibility_service,
            calendar_service,
            reservation_service,
            ticket_service,
            department_service,
            announcement_service,
            dashboard_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://intranet@localhost/intranet"),
        ("JWT_SECRET", "secreto"),
        ("IDP_PUBLIC_KEY_PEM", "-----BEGIN PUBLIC KEY-----\\nAAA\\n-----END PUBLIC KEY-----"),
        ("IDP_AUDIENCE", "intranet-web"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(settings.session_ttl_hours, 12);
        assert_eq!(settings.institutional_domain, DEFAULT_DOMAIN);
        assert_eq!(settings.tic_hourly_rate, Decimal::from(20));
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.idp_issuer, None);
        assert!(settings.idp_public_key_pem.contains("\nAAA\n"));
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = Settings::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TIC_HOURLY_RATE", "22.50"));
        vars.push(("SESSION_TTL_HOURS", "8"));
        vars.push(("INSTITUTIONAL_DOMAIN", "IESEjemplo.es"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.tic_hourly_rate, Decimal::new(2250, 2));
        assert_eq!(settings.session_ttl_hours, 8);
        assert_eq!(settings.institutional_domain, "iesejemplo.es");
    }

    #[test]
    fn bad_rate_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TIC_HOURLY_RATE", "veinte"));
        assert!(Settings::from_lookup(lookup(&vars)).is_err());
    }
}
