///! CLI configuration management
///!
///! The config file stands in for the browser's cookies and session storage:
///! it keeps the token and auth tenant across invocations together with the
///! view context values.

use anyhow::Result;
use arkdash_common::session::{Session, SessionKey, UserType};
use arkdash_common::tenant::TenantPrecedence;
use arkdash_common::{TenantService, SYSTEM_TENANT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_server: String,
    pub default_output: String,
    pub token: Option<String>,
    /// Tenant the token was issued for
    pub tenant: Option<String>,
    pub username: Option<String>,
    pub user_type: Option<UserType>,
    pub system_tenant: String,
    pub namespace: Option<String>,
    pub skip_login_page: bool,
    pub tenant_precedence: TenantPrecedence,
    /// Remaining view keys, including partitions keyed by tenant name
    pub session: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_server: "http://localhost:9090".to_string(),
            default_output: "table".to_string(),
            token: None,
            tenant: None,
            username: None,
            user_type: None,
            system_tenant: SYSTEM_TENANT.to_string(),
            namespace: None,
            skip_login_page: false,
            tenant_precedence: TenantPrecedence::default(),
            session: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::debug!(path = %path.display(), "config saved");

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("ARKDASH_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home).join(".config/arkdash/cli.toml"))
    }

    /// Session seeded from the persisted values
    pub fn session(&self) -> Session {
        let session = Session::from_map(self.session.clone());
        if let Some(username) = &self.username {
            session.set(SessionKey::Username, username.clone());
        }
        if let Some(user_type) = &self.user_type {
            session.set(SessionKey::UserType, user_type.as_str());
        }
        if let Some(namespace) = &self.namespace {
            session.set(SessionKey::Namespace, namespace.clone());
        }
        if let Some(tenant) = &self.tenant {
            if session.get(&SessionKey::ParentTenant).is_none() {
                session.set(SessionKey::ParentTenant, tenant.clone());
            }
        }
        session
    }

    /// Copy a session's values back for persistence
    pub fn store_session(&mut self, session: &Session) {
        let mut values = session.to_map();
        for key in [SessionKey::Username, SessionKey::UserType, SessionKey::Namespace] {
            values.remove(key.name());
        }
        self.session = values;
    }

    /// Tenant service for the stored credentials
    pub fn tenant_service(&self, session: Session) -> TenantService {
        let auth_tenant = self.tenant.as_deref().unwrap_or_default();
        TenantService::with_options(session, auth_tenant, &self.system_tenant, self.tenant_precedence)
    }

    /// Forget credentials and everything derived from them
    pub fn clear_credentials(&mut self) {
        self.token = None;
        self.tenant = None;
        self.username = None;
        self.user_type = None;
        self.session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_output, "table");
        assert_eq!(config.system_tenant, SYSTEM_TENANT);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cli.toml");

        let mut config = Config::default();
        config.token = Some("jwe".to_string());
        config.tenant = Some("acme".to_string());
        config.user_type = Some(UserType::TenantAdmin);
        config.session.insert("acme".to_string(), "tp-1".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.token.as_deref(), Some("jwe"));
        assert_eq!(loaded.user_type, Some(UserType::TenantAdmin));
        assert_eq!(loaded.session.get("acme").map(String::as_str), Some("tp-1"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        std::fs::write(&path, "tenant = \"acme\"\ntenant_precedence = \"context\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tenant.as_deref(), Some("acme"));
        assert_eq!(config.tenant_precedence, TenantPrecedence::Context);
        assert_eq!(config.default_server, "http://localhost:9090");
    }

    #[test]
    fn test_session_round_trip() {
        let mut config = Config::default();
        config.tenant = Some("acme".to_string());
        config.username = Some("alice".to_string());
        config.user_type = Some(UserType::TenantUser);

        let session = config.session();
        assert_eq!(session.get(&SessionKey::ParentTenant).as_deref(), Some("acme"));
        assert_eq!(session.username().as_deref(), Some("alice"));

        session.set(SessionKey::PodTenant, "acme");
        config.store_session(&session);
        assert_eq!(config.session.get("podTenant").map(String::as_str), Some("acme"));
        assert!(!config.session.contains_key("username"));
        assert!(!config.session.contains_key("userType"));
    }

    #[test]
    fn test_tenant_service_from_config() {
        let mut config = Config::default();
        config.tenant = Some(SYSTEM_TENANT.to_string());
        let tenants = config.tenant_service(config.session());
        assert!(tenants.is_system());
    }
}
