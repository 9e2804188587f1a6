///! Command handlers

pub mod auth;
pub mod create;
pub mod resource;
pub mod tenant;

use crate::api::ApiClient;
use crate::config::Config;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use arkdash_common::session::SessionKey;
use arkdash_common::{Session, TenantService, ViewContext};

/// State shared by every command of one invocation
pub struct Context {
    pub api: ApiClient,
    pub config: Config,
    pub session: Session,
    pub tenants: TenantService,
    pub format: OutputFormat,
    /// Stored tenant to put back when `--tenant` applies to this invocation only
    overridden: Option<Option<String>>,
}

impl Context {
    pub async fn new(config: Config, server: Option<&str>, format: Option<&str>) -> Self {
        let api = ApiClient::new(server.unwrap_or(&config.default_server));
        if let Some(token) = &config.token {
            api.set_token(token.clone()).await;
        }

        let format = OutputFormat::parse(format.unwrap_or(&config.default_output));
        let session = config.session();
        let tenants = config.tenant_service(session.clone());

        Self {
            api,
            config,
            session,
            tenants,
            format,
            overridden: None,
        }
    }

    /// Inspect another tenant for this invocation only
    pub fn override_tenant(&mut self, tenant: &str) -> Result<()> {
        if self.tenants.switch_to(tenant)? {
            if self.overridden.is_none() {
                self.overridden = Some(self.session.get(&SessionKey::CurrentTenant));
            }
            self.session.set(SessionKey::CurrentTenant, tenant);
        } else {
            output::print_warning(&format!(
                "Ignoring --tenant {}: signed in to tenant '{}'",
                tenant,
                self.tenants.auth_tenant()
            ));
        }
        Ok(())
    }

    /// Snapshot the view; system sessions see the tenant they inspect
    pub fn view(&mut self) -> ViewContext {
        if self.tenants.is_system() {
            ViewContext::capture_inspected(&mut self.tenants)
        } else {
            ViewContext::capture(&self.tenants)
        }
    }

    pub fn require_login(&self) -> Result<()> {
        if self.config.token.is_none() {
            anyhow::bail!("Not logged in. Use 'arkdash auth login' first");
        }
        Ok(())
    }

    /// Make the tenant in the session the stored one
    pub fn keep_tenant(&mut self) {
        self.overridden = None;
    }

    /// Copy the session into the config, leaving out a `--tenant` override
    fn store_session(&mut self) {
        self.config.store_session(&self.session);
        if let Some(stored) = &self.overridden {
            let key = SessionKey::CurrentTenant.name();
            match stored {
                Some(tenant) => self.config.session.insert(key.to_string(), tenant.clone()),
                None => self.config.session.remove(key),
            };
        }
    }

    /// Persist the config together with the session values
    pub fn save(&mut self) -> Result<()> {
        self.store_session();
        self.config.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkdash_common::session::UserType;
    use arkdash_common::SYSTEM_TENANT;

    fn system_config() -> Config {
        let mut config = Config::default();
        config.tenant = Some(SYSTEM_TENANT.to_string());
        config.user_type = Some(UserType::ClusterAdmin);
        config
    }

    #[tokio::test]
    async fn test_override_tenant_for_system_session() {
        let mut ctx = Context::new(system_config(), None, None).await;
        ctx.override_tenant("acme").unwrap();

        let view = ctx.view();
        assert_eq!(view.tenant, "acme");
        assert_eq!(ctx.overridden, Some(None));
    }

    #[tokio::test]
    async fn test_override_tenant_ignored_for_tenant_session() {
        let mut config = Config::default();
        config.tenant = Some("acme".to_string());
        let mut ctx = Context::new(config, None, None).await;

        ctx.override_tenant("beta").unwrap();
        assert_eq!(ctx.view().tenant, "acme");
        assert!(ctx.overridden.is_none());
    }

    #[tokio::test]
    async fn test_writes_under_override_are_kept() {
        let mut ctx = Context::new(system_config(), None, None).await;
        ctx.override_tenant("acme").unwrap();
        ctx.session.set_partition("acme", "tp-1");
        ctx.store_session();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        ctx.config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        let session = reloaded.session();
        assert_eq!(session.partition_of("acme").as_deref(), Some("tp-1"));
        assert!(session.get(&SessionKey::CurrentTenant).is_none());
    }

    #[tokio::test]
    async fn test_override_restores_switched_tenant() {
        let mut config = system_config();
        config
            .session
            .insert(SessionKey::CurrentTenant.name().to_string(), "beta".to_string());
        let mut ctx = Context::new(config, None, None).await;

        ctx.override_tenant("acme").unwrap();
        ctx.store_session();
        assert_eq!(
            ctx.config.session.get(SessionKey::CurrentTenant.name()).map(String::as_str),
            Some("beta")
        );

        ctx.keep_tenant();
        ctx.store_session();
        assert_eq!(
            ctx.config.session.get(SessionKey::CurrentTenant.name()).map(String::as_str),
            Some("acme")
        );
    }

    #[tokio::test]
    async fn test_override_tenant_rejects_invalid_name() {
        let mut ctx = Context::new(system_config(), None, None).await;
        assert!(ctx.override_tenant("Bad_Name").is_err());
    }

    #[tokio::test]
    async fn test_format_and_server_fall_back_to_config() {
        let mut config = Config::default();
        config.default_output = "yaml".to_string();
        let ctx = Context::new(config, Some("http://console:8080"), None).await;

        assert_eq!(ctx.format, OutputFormat::Yaml);
        assert_eq!(ctx.api.url("api/v1/node"), "http://console:8080/api/v1/node");
        assert!(ctx.require_login().is_err());
    }
}
