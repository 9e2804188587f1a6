///! REST endpoint templates
///!
///! Templates carry `:partition`, `:tenant`, `:namespace` and `:name`
///! placeholders. The builders never validate or encode segments; callers
///! fill the placeholders with [`PathParams`] before issuing a request.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root of every backend API path
pub const BASE_HREF: &str = "api/v1";

pub const PARTITION_PLACEHOLDER: &str = ":partition";
pub const TENANT_PLACEHOLDER: &str = ":tenant";
pub const NAMESPACE_PLACEHOLDER: &str = ":namespace";
pub const NAME_PLACEHOLDER: &str = ":name";

/// Resource kinds addressed by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    Job,
    CronJob,
    Crd,
    CrdFull,
    CrdObject,
    DaemonSet,
    Deployment,
    Pod,
    VirtualMachine,
    ReplicaSet,
    OldReplicaSet,
    NewReplicaSet,
    ReplicationController,
    StatefulSet,
    Node,
    Namespace,
    PersistentVolume,
    StorageClass,
    ClusterRole,
    ConfigMap,
    PersistentVolumeClaim,
    Secret,
    Ingress,
    Service,
    Event,
    Container,
    Tenant,
    Partition,
    ResourceQuota,
    Role,
    /// User collection, addressed as `users`
    Users,
    /// Single user, addressed as `user`
    User,
    ServiceAccount,
    ResourcePartition,
    TenantPartition,
    Network,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        Self::Job,
        Self::CronJob,
        Self::Crd,
        Self::CrdFull,
        Self::CrdObject,
        Self::DaemonSet,
        Self::Deployment,
        Self::Pod,
        Self::VirtualMachine,
        Self::ReplicaSet,
        Self::OldReplicaSet,
        Self::NewReplicaSet,
        Self::ReplicationController,
        Self::StatefulSet,
        Self::Node,
        Self::Namespace,
        Self::PersistentVolume,
        Self::StorageClass,
        Self::ClusterRole,
        Self::ConfigMap,
        Self::PersistentVolumeClaim,
        Self::Secret,
        Self::Ingress,
        Self::Service,
        Self::Event,
        Self::Container,
        Self::Tenant,
        Self::Partition,
        Self::ResourceQuota,
        Self::Role,
        Self::Users,
        Self::User,
        Self::ServiceAccount,
        Self::ResourcePartition,
        Self::TenantPartition,
        Self::Network,
    ];

    /// Name of this kind as the console knows it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::CronJob => "cronjob",
            Self::Crd => "crd",
            Self::CrdFull => "customresourcedefinition",
            Self::CrdObject => "object",
            Self::DaemonSet => "daemonset",
            Self::Deployment => "deployment",
            Self::Pod => "pod",
            Self::VirtualMachine => "virtualmachine",
            Self::ReplicaSet => "replicaset",
            Self::OldReplicaSet => "oldreplicaset",
            Self::NewReplicaSet => "newreplicaset",
            Self::ReplicationController => "replicationcontroller",
            Self::StatefulSet => "statefulset",
            Self::Node => "node",
            Self::Namespace => "namespace",
            Self::PersistentVolume => "persistentvolume",
            Self::StorageClass => "storageclass",
            Self::ClusterRole => "clusterrole",
            Self::ConfigMap => "configmap",
            Self::PersistentVolumeClaim => "persistentvolumeclaim",
            Self::Secret => "secret",
            Self::Ingress => "ingress",
            Self::Service => "service",
            Self::Event => "event",
            Self::Container => "container",
            Self::Tenant => "tenant",
            Self::Partition => "partition",
            Self::ResourceQuota => "resourcequota",
            Self::Role => "role",
            Self::Users => "users",
            Self::User => "user",
            Self::ServiceAccount => "serviceaccount",
            Self::ResourcePartition => "resourcepartition",
            Self::TenantPartition => "tenantpartition",
            Self::Network => "network",
        }
    }

    /// Segment the backend routes this kind under. Networks are custom
    /// resources and are served by the CRD handlers.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Network => Self::Crd.as_str(),
            other => other.as_str(),
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        matches!(
            self,
            Self::Job
                | Self::CronJob
                | Self::CrdObject
                | Self::DaemonSet
                | Self::Deployment
                | Self::Pod
                | Self::VirtualMachine
                | Self::ReplicaSet
                | Self::ReplicationController
                | Self::StatefulSet
                | Self::ConfigMap
                | Self::PersistentVolumeClaim
                | Self::Secret
                | Self::Ingress
                | Self::Service
                | Self::ResourceQuota
                | Self::Role
                | Self::ServiceAccount
        )
    }

    /// Whether the backend serves this kind under `/tenants/:tenant`
    pub fn is_tenanted(&self) -> bool {
        !matches!(
            self,
            Self::Node
                | Self::ResourcePartition
                | Self::TenantPartition
                | Self::Partition
                | Self::PersistentVolume
                | Self::StorageClass
                | Self::Event
                | Self::Container
        )
    }

    /// Endpoint with the scope flags this kind is usually listed with
    pub fn default_endpoint(self) -> ResourceEndpoint {
        EndpointManager::resource(self, self.is_namespaced(), self.is_tenanted(), false)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if let Some(kind) = Self::ALL.iter().find(|k| k.as_str() == lower) {
            return Ok(*kind);
        }

        let kind = match lower.as_str() {
            "pods" | "po" => Self::Pod,
            "deployments" | "deploy" => Self::Deployment,
            "replicasets" | "rs" => Self::ReplicaSet,
            "namespaces" | "ns" => Self::Namespace,
            "nodes" | "no" => Self::Node,
            "tenants" => Self::Tenant,
            "roles" => Self::Role,
            "clusterroles" => Self::ClusterRole,
            "resourcequotas" | "quota" => Self::ResourceQuota,
            "serviceaccounts" | "sa" => Self::ServiceAccount,
            "virtualmachines" | "vm" => Self::VirtualMachine,
            "networks" | "net" => Self::Network,
            "crds" => Self::Crd,
            "services" | "svc" => Self::Service,
            "configmaps" | "cm" => Self::ConfigMap,
            "secrets" => Self::Secret,
            "jobs" => Self::Job,
            "cronjobs" => Self::CronJob,
            "daemonsets" | "ds" => Self::DaemonSet,
            "statefulsets" | "sts" => Self::StatefulSet,
            "events" => Self::Event,
            "partitions" => Self::Partition,
            _ => return Err(Error::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Utility endpoints that do not address a resource collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    Shell,
}

impl Utility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Utility::Shell => "shell",
        }
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// URL templates for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEndpoint {
    kind: ResourceKind,
    namespaced: bool,
    tenanted: bool,
    partitioned: bool,
}

impl ResourceEndpoint {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            namespaced: false,
            tenanted: false,
            partitioned: false,
        }
    }

    pub fn namespaced(mut self) -> Self {
        self.namespaced = true;
        self
    }

    pub fn tenanted(mut self) -> Self {
        self.tenanted = true;
        self
    }

    pub fn partitioned(mut self) -> Self {
        self.partitioned = true;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn is_tenanted(&self) -> bool {
        self.tenanted
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    fn prefix(&self) -> String {
        let mut url = String::from(BASE_HREF);
        if self.partitioned {
            url.push_str("/partition/");
            url.push_str(PARTITION_PLACEHOLDER);
        }
        if self.tenanted {
            url.push_str("/tenants/");
            url.push_str(TENANT_PLACEHOLDER);
        }
        url
    }

    /// Service accounts of a tenant are routed below their namespace
    pub fn is_namespace_first(&self) -> bool {
        self.kind == ResourceKind::ServiceAccount && self.tenanted && self.namespaced
    }

    /// Collection template
    pub fn list(&self) -> String {
        let mut url = self.prefix();
        if self.is_namespace_first() {
            return format!("{}/namespaces/{}/{}", url, NAMESPACE_PLACEHOLDER, self.kind.path_segment());
        }
        url.push('/');
        url.push_str(self.kind.path_segment());
        if self.namespaced {
            url.push('/');
            url.push_str(NAMESPACE_PLACEHOLDER);
        }
        url
    }

    /// Single-object template
    pub fn detail(&self) -> String {
        if self.is_namespace_first() {
            return format!(
                "{}/namespaces/{}/{}s/{}",
                self.prefix(),
                NAMESPACE_PLACEHOLDER,
                self.kind.path_segment(),
                NAME_PLACEHOLDER
            );
        }
        format!("{}/{}", self.list(), NAME_PLACEHOLDER)
    }

    /// Template for a resource related to one object, such as a pod's events.
    ///
    /// A literal tenant replaces the `:tenant` placeholder when given, and a
    /// missing namespace leaves `:namespace` in place. The partition segment
    /// is never part of a child path.
    pub fn child(
        &self,
        resource_name: &str,
        related: ResourceKind,
        namespace: Option<&str>,
        tenant: Option<&str>,
    ) -> String {
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or(NAMESPACE_PLACEHOLDER);
        let tenant = tenant.filter(|t| !t.is_empty()).unwrap_or(TENANT_PLACEHOLDER);

        let mut url = String::from(BASE_HREF);
        if self.tenanted {
            url.push_str("/tenants/");
            url.push_str(tenant);
        }
        url.push('/');
        url.push_str(self.kind.path_segment());
        if self.namespaced {
            url.push('/');
            url.push_str(namespace);
        }
        format!("{}/{}/{}", url, resource_name, related.path_segment())
    }
}

/// Template for a utility endpoint
#[derive(Debug, Clone, Copy)]
pub struct UtilityEndpoint {
    utility: Utility,
}

impl UtilityEndpoint {
    /// Exec endpoint of a pod
    pub fn shell(&self, namespace: &str, pod: &str, tenant: Option<&str>) -> String {
        let mut url = String::from(BASE_HREF);
        if let Some(tenant) = tenant.filter(|t| !t.is_empty()) {
            url.push_str("/tenants/");
            url.push_str(tenant);
        }
        format!(
            "{}/{}/{}/{}/{}",
            url,
            ResourceKind::Pod,
            namespace,
            pod,
            self.utility.as_str()
        )
    }
}

/// Entry point for endpoint templates
pub struct EndpointManager;

impl EndpointManager {
    pub fn resource(
        kind: ResourceKind,
        namespaced: bool,
        tenanted: bool,
        partitioned: bool,
    ) -> ResourceEndpoint {
        ResourceEndpoint {
            kind,
            namespaced,
            tenanted,
            partitioned,
        }
    }

    pub fn utility(utility: Utility) -> UtilityEndpoint {
        UtilityEndpoint { utility }
    }

    /// CSRF token for a mutating action performed in `tenant`
    pub fn csrf_token(tenant: &str, action: &str) -> String {
        format!("{}/tenants/{}/csrftoken/{}", BASE_HREF, tenant, action)
    }

    /// Scale subresource; the trailing slash is part of the route
    pub fn scale(tenant: Option<&str>, kind: &str, namespace: &str, name: &str) -> String {
        let mut url = String::from(BASE_HREF);
        if let Some(tenant) = tenant.filter(|t| !t.is_empty()) {
            url.push_str("/tenants/");
            url.push_str(tenant);
        }
        format!("{}/scale/{}/{}/{}/", url, kind, namespace, name)
    }

    /// Manual run of a cron job
    pub fn trigger(namespace: &str, name: &str) -> String {
        format!("{}/{}/{}/{}/trigger", BASE_HREF, ResourceKind::CronJob, namespace, name)
    }

    /// Collection accepting POSTs for newly created objects
    pub fn create(target: CreateTarget) -> String {
        format!("{}/{}", BASE_HREF, target.as_str())
    }
}

/// Collections the create dialogs post to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTarget {
    Tenant,
    Namespace,
    Node,
    ResourceQuota,
    Roles,
    ClusterRole,
    Users,
    ServiceAccounts,
    ClusterRoleBinding,
    RoleBindings,
}

impl CreateTarget {
    /// Path segment; also used as the CSRF action name
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateTarget::Tenant => "tenant",
            CreateTarget::Namespace => "namespace",
            CreateTarget::Node => "node",
            CreateTarget::ResourceQuota => "resourcequota",
            CreateTarget::Roles => "roles",
            CreateTarget::ClusterRole => "clusterrole",
            CreateTarget::Users => "users",
            CreateTarget::ServiceAccounts => "serviceaccounts",
            CreateTarget::ClusterRoleBinding => "clusterrolebinding",
            CreateTarget::RoleBindings => "rolebindings",
        }
    }
}

/// Values substituted into a template's placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    pub partition: Option<String>,
    pub tenant: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn pairs(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (PARTITION_PLACEHOLDER, self.partition.as_deref()),
            (TENANT_PLACEHOLDER, self.tenant.as_deref()),
            (NAMESPACE_PLACEHOLDER, self.namespace.as_deref()),
            (NAME_PLACEHOLDER, self.name.as_deref()),
        ]
    }

    /// Replace every placeholder that has a value; others stay in place
    pub fn fill(&self, template: &str) -> String {
        template
            .split('/')
            .map(|segment| {
                self.pairs()
                    .iter()
                    .find(|(placeholder, _)| *placeholder == segment)
                    .and_then(|(_, value)| *value)
                    .unwrap_or(segment)
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Like [`fill`](Self::fill), but every placeholder must be resolved
    pub fn fill_strict(&self, template: &str) -> Result<String> {
        let url = self.fill(template);
        for segment in url.split('/') {
            if let Some((placeholder, _)) = self.pairs().iter().find(|(p, _)| *p == segment) {
                return Err(Error::UnresolvedPlaceholder {
                    placeholder: *placeholder,
                    template: template.to_string(),
                });
            }
        }
        Ok(url)
    }
}
