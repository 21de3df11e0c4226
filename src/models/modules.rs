// src/models/modules.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Áreas funcionales que el administrador puede activar u ocultar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKey {
    Calendario,
    Anuncios,
    TicketsTic,
    TicketsMaintenance,
    #[serde(rename = "tickets_3d")]
    Tickets3d,
    Sum,
    Carts,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 7] = [
        ModuleKey::Calendario,
        ModuleKey::Anuncios,
        ModuleKey::TicketsTic,
        ModuleKey::TicketsMaintenance,
        ModuleKey::Tickets3d,
        ModuleKey::Sum,
        ModuleKey::Carts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKey::Calendario => "calendario",
            ModuleKey::Anuncios => "anuncios",
            ModuleKey::TicketsTic => "tickets_tic",
            ModuleKey::TicketsMaintenance => "tickets_maintenance",
            ModuleKey::Tickets3d => "tickets_3d",
            ModuleKey::Sum => "sum",
            ModuleKey::Carts => "carts",
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("módulo desconocido: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "module_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    Active,
    Inactive,
    #[serde(rename = "testers")]
    #[sqlx(rename = "testers")]
    TestersOnly,
}

/// Configuración de módulos. Una clave ausente equivale a `Active`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ModuleConfig(pub BTreeMap<ModuleKey, VisibilityState>);

impl ModuleConfig {
    pub const DEFAULT_STATE: VisibilityState = VisibilityState::Active;

    pub fn state(&self, key: ModuleKey) -> VisibilityState {
        self.0.get(&key).copied().unwrap_or(Self::DEFAULT_STATE)
    }

    pub fn set(&mut self, key: ModuleKey, state: VisibilityState) {
        self.0.insert(key, state);
    }
}

// Entrada de navegación para el usuario actual
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleVisibility {
    pub key: ModuleKey,
    pub state: VisibilityState,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_active() {
        let config = ModuleConfig::default();
        assert_eq!(config.state(ModuleKey::Sum), VisibilityState::Active);
    }

    #[test]
    fn config_deserializes_from_plain_map() {
        let config: ModuleConfig =
            serde_json::from_str(r#"{"sum":"testers","tickets_3d":"inactive"}"#).unwrap();
        assert_eq!(config.state(ModuleKey::Sum), VisibilityState::TestersOnly);
        assert_eq!(config.state(ModuleKey::Tickets3d), VisibilityState::Inactive);
        assert_eq!(config.state(ModuleKey::Carts), VisibilityState::Active);
    }

    #[test]
    fn keys_parse_from_their_wire_names() {
        for key in ModuleKey::ALL {
            assert_eq!(key.as_str().parse::<ModuleKey>(), Ok(key));
        }
        assert!("biblioteca".parse::<ModuleKey>().is_err());
    }
}
