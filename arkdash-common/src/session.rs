///! Session context store
///!
///! One owner for the per-session view values (user type, parent tenant,
///! tenant under view, partitions). Keys are typed; their storage names are
///! the ones the web console uses, so persisted sessions stay compatible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Kind of account signed in to the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserType {
    ClusterAdmin,
    TenantAdmin,
    TenantUser,
    Other(String),
}

impl UserType {
    pub fn as_str(&self) -> &str {
        match self {
            UserType::ClusterAdmin => "cluster-admin",
            UserType::TenantAdmin => "tenant-admin",
            UserType::TenantUser => "tenant-user",
            UserType::Other(s) => s.as_str(),
        }
    }

    pub fn is_cluster_admin(&self) -> bool {
        matches!(self, UserType::ClusterAdmin)
    }
}

impl From<String> for UserType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "cluster-admin" => UserType::ClusterAdmin,
            "tenant-admin" => UserType::TenantAdmin,
            "tenant-user" => UserType::TenantUser,
            _ => UserType::Other(s),
        }
    }
}

impl From<&str> for UserType {
    fn from(s: &str) -> Self {
        UserType::from(s.to_string())
    }
}

impl From<UserType> for String {
    fn from(t: UserType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed session keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    UserType,
    /// Tenant the signed-in user belongs to
    ParentTenant,
    Namespace,
    TenantName,
    /// Tenant selected from the tenant list
    CurrentTenant,
    /// Tenant selected from the tenant-partition view
    CurrentTpTenant,
    PodTenant,
    DeploymentTenant,
    ReplicaSetTenant,
    Username,
    /// Storage partition of the named tenant or cluster
    Partition(String),
}

impl SessionKey {
    /// Storage name of the key
    pub fn name(&self) -> &str {
        match self {
            SessionKey::UserType => "userType",
            SessionKey::ParentTenant => "parentTenant",
            SessionKey::Namespace => "namespace",
            SessionKey::TenantName => "tenantName",
            SessionKey::CurrentTenant => "currentTenant",
            SessionKey::CurrentTpTenant => "currentTpTenant",
            SessionKey::PodTenant => "podTenant",
            SessionKey::DeploymentTenant => "deploymentTenant",
            SessionKey::ReplicaSetTenant => "replicaSetTenant",
            SessionKey::Username => "username",
            SessionKey::Partition(tenant) => tenant.as_str(),
        }
    }
}

/// Shared session values.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct Session {
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a session from previously persisted values
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Snapshot of every stored value, for persistence
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self.values.read() {
            Ok(values) => values.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stored value; empty strings count as unset
    pub fn get(&self, key: &SessionKey) -> Option<String> {
        let values = match self.values.read() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.get(key.name()).filter(|v| !v.is_empty()).cloned()
    }

    pub fn set(&self, key: SessionKey, value: impl Into<String>) {
        let value = value.into();
        tracing::trace!(key = key.name(), value = %value, "session set");
        let mut values = match self.values.write() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.insert(key.name().to_string(), value);
    }

    pub fn remove(&self, key: &SessionKey) -> Option<String> {
        let mut values = match self.values.write() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.remove(key.name())
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.get(&SessionKey::UserType).map(UserType::from)
    }

    pub fn username(&self) -> Option<String> {
        self.get(&SessionKey::Username)
    }

    /// Partition stashed for `tenant`
    pub fn partition_of(&self, tenant: &str) -> Option<String> {
        self.get(&SessionKey::Partition(tenant.to_string()))
    }

    pub fn set_partition(&self, tenant: &str, partition: impl Into<String>) {
        self.set(SessionKey::Partition(tenant.to_string()), partition);
    }
}
