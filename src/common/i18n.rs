// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "es";

// Catálogos embebidos en el binario
const CATALOGS: [(&str, &str); 2] = [
    ("es", include_str!("../../locales/es.json")),
    ("en", include_str!("../../locales/en.json")),
];

static GLOBAL: LazyLock<I18nStore> = LazyLock::new(I18nStore::load);

/// Mensajes traducidos por idioma y clave.
#[derive(Debug, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> Self {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(messages) => {
                    catalogs.insert(lang.to_string(), messages);
                }
                Err(e) => tracing::error!("Catálogo '{}' inválido: {}", lang, e),
            }
        }
        Self { catalogs }
    }

    pub fn global() -> &'static I18nStore {
        &GLOBAL
    }

    /// Busca en el idioma pedido, luego en el por defecto, luego devuelve la clave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .unwrap_or(key)
            .to_string()
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::load();
        let es = &store.catalogs["es"];
        let en = &store.catalogs["en"];
        for key in es.keys() {
            assert!(en.contains_key(key), "falta '{}' en en.json", key);
        }
        assert_eq!(es.len(), en.len());
    }

    #[test]
    fn unknown_language_falls_back_to_spanish() {
        let store = I18nStore::load();
        assert_eq!(
            store.translate("pt", "error.slot_taken"),
            store.translate("es", "error.slot_taken")
        );
    }

    #[test]
    fn unknown_key_is_returned_as_is() {
        assert_eq!(I18nStore::global().translate("en", "no.such.key"), "no.such.key");
    }
}
