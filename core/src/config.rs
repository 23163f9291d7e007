//! Per-client configuration and the stores that hold it.
//!
//! # Design
//! Client records (connection parameters plus branding) live in an external
//! store keyed by access code. `ConfigStore` is the boundary the session
//! bootstrap needs; `MemoryConfigStore` backs tests and local runs.
//!
//! The admin password is read through `SecretStore`. There is no built-in
//! fallback password: with nothing configured, every attempt is rejected.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Company filter value meaning "first company the user can see".
pub const ALL_COMPANIES: &str = "ALL";

/// Environment variable read by `EnvSecretStore`.
pub const ADMIN_PASSWORD_ENV: &str = "LEMON_ADMIN_PASSWORD";

fn default_company_filter() -> String {
    ALL_COMPANIES.to_string()
}

fn default_true() -> bool {
    true
}

/// Connection and display settings for one client (branch access code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub code: String,
    pub url: String,
    pub db: String,
    pub username: String,
    pub api_key: String,
    #[serde(default = "default_company_filter")]
    pub company_filter: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub use_proxy: bool,
    #[serde(default)]
    pub business_name: Option<String>,
}

impl ClientConfig {
    /// Parse a single record from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn display_name(&self) -> &str {
        self.business_name.as_deref().unwrap_or(&self.code)
    }
}

/// Storefront metadata kept outside Odoo for one product of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductExtra {
    pub odoo_id: i64,
    pub client_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub custom_category: Option<String>,
}

/// Access codes are matched trimmed and upper-cased.
pub fn normalize_access_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Storage for client records and product overrides.
pub trait ConfigStore {
    fn client_by_code(&self, code: &str) -> Option<ClientConfig>;
    fn list(&self) -> Vec<ClientConfig>;
    /// Insert or replace by `code`.
    fn save(&self, config: ClientConfig);
    /// Returns whether a record was removed.
    fn delete(&self, code: &str) -> bool;
    /// Insert or replace by `(odoo_id, client_code)`.
    fn upsert_product_extra(&self, extra: ProductExtra);
    fn product_extras(&self, client_code: &str) -> HashMap<i64, ProductExtra>;
}

#[derive(Debug, Default)]
struct Tables {
    clients: Vec<ClientConfig>,
    extras: HashMap<(i64, String), ProductExtra>,
}

/// In-memory `ConfigStore`. Clients list in insertion order.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    tables: RwLock<Tables>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ClientConfig>) -> Self {
        let store = Self::new();
        for client in clients {
            store.save(client);
        }
        store
    }

    /// Load a JSON array of client records.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let clients: Vec<ClientConfig> = serde_json::from_str(text)?;
        Ok(Self::with_clients(clients))
    }
}

impl ConfigStore for MemoryConfigStore {
    fn client_by_code(&self, code: &str) -> Option<ClientConfig> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.clients.iter().find(|c| c.code == code).cloned()
    }

    fn list(&self) -> Vec<ClientConfig> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.clients.clone()
    }

    fn save(&self, config: ClientConfig) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        match tables.clients.iter_mut().find(|c| c.code == config.code) {
            Some(existing) => *existing = config,
            None => tables.clients.push(config),
        }
    }

    fn delete(&self, code: &str) -> bool {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let before = tables.clients.len();
        tables.clients.retain(|c| c.code != code);
        tables.clients.len() != before
    }

    fn upsert_product_extra(&self, extra: ProductExtra) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables
            .extras
            .insert((extra.odoo_id, extra.client_code.clone()), extra);
    }

    fn product_extras(&self, client_code: &str) -> HashMap<i64, ProductExtra> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables
            .extras
            .values()
            .filter(|e| e.client_code == client_code)
            .map(|e| (e.odoo_id, e.clone()))
            .collect()
    }
}

/// Source of the dashboard admin password.
pub trait SecretStore {
    fn admin_password(&self) -> Option<String>;
    fn set_admin_password(&self, password: &str);
}

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    password: RwLock<Option<String>>,
}

impl MemorySecretStore {
    pub fn new(password: Option<&str>) -> Self {
        Self {
            password: RwLock::new(password.map(str::to_string)),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn admin_password(&self) -> Option<String> {
        self.password.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_admin_password(&self, password: &str) {
        *self.password.write().unwrap_or_else(|e| e.into_inner()) = Some(password.to_string());
    }
}

/// Reads `LEMON_ADMIN_PASSWORD` on every lookup. Changes made through
/// `set_admin_password` only last for the process.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    overridden: MemorySecretStore,
}

impl SecretStore for EnvSecretStore {
    fn admin_password(&self) -> Option<String> {
        self.overridden
            .admin_password()
            .or_else(|| std::env::var(ADMIN_PASSWORD_ENV).ok())
            .filter(|p| !p.is_empty())
    }

    fn set_admin_password(&self, password: &str) {
        self.overridden.set_admin_password(password);
    }
}

/// True only when a password is configured and `candidate` matches it.
pub fn verify_admin_password(store: &dyn SecretStore, candidate: &str) -> bool {
    match store.admin_password() {
        Some(expected) => expected == candidate,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: &str) -> ClientConfig {
        ClientConfig::from_json(&format!(
            r#"{{"code":"{code}","url":"https://erp.example.com","db":"lemon","username":"bot@example.com","api_key":"k"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn config_defaults() {
        let c = sample("SEDE1");
        assert_eq!(c.company_filter, ALL_COMPANIES);
        assert!(c.is_active);
        assert!(c.use_proxy);
        assert_eq!(c.display_name(), "SEDE1");
    }

    #[test]
    fn save_replaces_by_code() {
        let store = MemoryConfigStore::with_clients([sample("A"), sample("B")]);
        let mut updated = sample("A");
        updated.db = "other".to_string();
        store.save(updated);
        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].db, "other");
        assert!(store.delete("B"));
        assert!(!store.delete("B"));
        assert!(store.client_by_code("B").is_none());
    }

    #[test]
    fn product_extras_upsert_on_pair() {
        let store = MemoryConfigStore::new();
        let extra = ProductExtra {
            odoo_id: 10,
            client_code: "A".to_string(),
            description: Some("v1".to_string()),
            instructions: None,
            custom_category: None,
        };
        store.upsert_product_extra(extra.clone());
        store.upsert_product_extra(ProductExtra {
            description: Some("v2".to_string()),
            ..extra.clone()
        });
        store.upsert_product_extra(ProductExtra {
            client_code: "B".to_string(),
            ..extra
        });
        let extras = store.product_extras("A");
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[&10].description.as_deref(), Some("v2"));
    }

    #[test]
    fn access_code_normalization() {
        assert_eq!(normalize_access_code("  sede1 "), "SEDE1");
    }

    #[test]
    fn no_password_configured_rejects_everything() {
        let store = MemorySecretStore::new(None);
        assert!(!verify_admin_password(&store, ""));
        assert!(!verify_admin_password(&store, "anything"));
        store.set_admin_password("s3cret");
        assert!(verify_admin_password(&store, "s3cret"));
        assert!(!verify_admin_password(&store, "S3CRET"));
    }
}
