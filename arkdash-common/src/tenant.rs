///! Tenant and partition context
///!
///! The auth tenant is fixed for the lifetime of the service. Only a session
///! authenticated against the system tenant may switch the tenant under view.

use crate::session::{Session, SessionKey};
use crate::{Error, Result, SYSTEM_TENANT};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TENANT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap()
});

/// Where `current()` looks first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPrecedence {
    /// User type and parent tenant from the session win; internal state is
    /// the fallback when the session carries neither
    #[default]
    Session,
    /// Only the auth tenant and explicit switches count
    Context,
}

#[derive(Debug, Clone)]
pub struct TenantService {
    session: Session,
    system_tenant: String,
    precedence: TenantPrecedence,
    auth_tenant: String,
    current_tenant: String,
    resource_tenant: String,
    is_system_tenant: bool,
}

impl TenantService {
    /// Create the service for a session authenticated against `auth_tenant`
    pub fn new(session: Session, auth_tenant: &str) -> Self {
        Self::with_options(session, auth_tenant, SYSTEM_TENANT, TenantPrecedence::default())
    }

    pub fn with_options(
        session: Session,
        auth_tenant: &str,
        system_tenant: &str,
        precedence: TenantPrecedence,
    ) -> Self {
        let mut service = Self {
            session,
            system_tenant: system_tenant.to_string(),
            precedence,
            auth_tenant: String::new(),
            current_tenant: String::new(),
            resource_tenant: String::new(),
            is_system_tenant: false,
        };
        service.set_auth_tenant(auth_tenant);
        service
    }

    fn set_auth_tenant(&mut self, tenant: &str) {
        self.auth_tenant = tenant.to_string();
        self.is_system_tenant = tenant == self.system_tenant;
        self.current_tenant = tenant.to_string();
    }

    /// Switch the tenant under view. No-op unless authenticated as system.
    pub fn set_current(&mut self, tenant: &str) -> bool {
        if !self.is_system_tenant {
            tracing::debug!(tenant, auth = %self.auth_tenant, "ignoring tenant switch for non-system session");
            return false;
        }
        self.current_tenant = tenant.to_string();
        true
    }

    /// Switch the tenant under view after validating its name
    pub fn switch_to(&mut self, tenant: &str) -> Result<bool> {
        if !self.is_tenant_valid(tenant) {
            return Err(Error::InvalidTenant(tenant.to_string()));
        }
        Ok(self.set_current(tenant))
    }

    /// Effective tenant for REST calls
    pub fn current(&self) -> String {
        if self.precedence == TenantPrecedence::Session && self.is_system_tenant {
            if let Some(user_type) = self.session.user_type() {
                if user_type.is_cluster_admin() {
                    return self.system_tenant.clone();
                }
            }
        }
        if self.precedence == TenantPrecedence::Session {
            if let Some(parent) = self.session.get(&SessionKey::ParentTenant) {
                // A non-system session never leaves its own tenant.
                if self.is_system_tenant || parent == self.auth_tenant {
                    return parent;
                }
            }
        }
        self.current_tenant.clone()
    }

    /// Tenant stored as the one being switched to, without session overrides
    pub fn current_tenant(&self) -> &str {
        &self.current_tenant
    }

    /// Tenant whose resources are being inspected by a system or cluster admin.
    ///
    /// The last resolved value is kept when the session names neither.
    pub fn resource_tenant(&mut self) -> String {
        if let Some(tenant) = self.session.get(&SessionKey::CurrentTenant) {
            self.resource_tenant = tenant;
        } else if let Some(tenant) = self.session.get(&SessionKey::CurrentTpTenant) {
            self.resource_tenant = tenant;
        }
        self.resource_tenant.clone()
    }

    /// Storage partition of the resource tenant
    pub fn tenant_partition(&mut self) -> Option<String> {
        let tenant = self.resource_tenant();
        if tenant.is_empty() {
            return None;
        }
        self.session.partition_of(&tenant)
    }

    /// Storage partition stashed for any tenant
    pub fn partition_of(&self, tenant: &str) -> Option<String> {
        self.session.partition_of(tenant)
    }

    pub fn auth_tenant(&self) -> &str {
        &self.auth_tenant
    }

    pub fn system_tenant(&self) -> &str {
        &self.system_tenant
    }

    pub fn is_tenant_valid(&self, tenant: &str) -> bool {
        is_tenant_valid(tenant)
    }

    pub fn is_system(&self) -> bool {
        self.is_system_tenant
    }

    pub fn is_current_system(&self) -> bool {
        self.current() == self.system_tenant
    }

    /// Whether cluster-wide views (nodes, partitions, all tenants) are open
    pub fn can_access_system_views(&self) -> bool {
        self.is_system() && self.is_current_system()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// DNS-label style tenant name check
pub fn is_tenant_valid(tenant: &str) -> bool {
    TENANT_REGEX.is_match(tenant)
}
