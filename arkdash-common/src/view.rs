///! Immutable view snapshots and list target resolution

use crate::endpoint::{EndpointManager, PathParams, ResourceEndpoint, ResourceKind, BASE_HREF};
use crate::session::{Session, SessionKey, UserType};
use crate::tenant::TenantService;
use crate::{Result, DEFAULT_NAMESPACE};
use serde::Serialize;

/// Which namespaces a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceScope<'a> {
    /// The session's default namespace
    Context,
    Named(&'a str),
    All,
}

/// Tenant, partition and user type a view renders with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewContext {
    pub tenant: String,
    pub user_type: Option<UserType>,
    pub namespace: String,
    /// Partition of `tenant`, when one is stashed in the session
    pub partition: Option<String>,
    pub system_tenant: String,
}

impl ViewContext {
    /// Snapshot for the tenant the session is working in
    pub fn capture(tenants: &TenantService) -> Self {
        Self::for_tenant(tenants, &tenants.current())
    }

    /// Snapshot for the tenant an admin is inspecting, falling back to the
    /// current tenant when none is selected
    pub fn capture_inspected(tenants: &mut TenantService) -> Self {
        let inspected = tenants.resource_tenant();
        if inspected.is_empty() {
            Self::capture(tenants)
        } else {
            Self::for_tenant(tenants, &inspected)
        }
    }

    /// Snapshot for an explicit tenant
    pub fn for_tenant(tenants: &TenantService, tenant: &str) -> Self {
        let session = tenants.session();
        let namespace = session
            .get(&SessionKey::Namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Self {
            tenant: tenant.to_string(),
            user_type: session.user_type(),
            namespace,
            partition: tenants.partition_of(tenant),
            system_tenant: tenants.system_tenant().to_string(),
        }
    }

    pub fn is_cluster_admin(&self) -> bool {
        self.user_type.as_ref().is_some_and(UserType::is_cluster_admin)
    }

    pub fn is_system_tenant(&self) -> bool {
        self.tenant == self.system_tenant
    }

    fn params(&self, namespace: &str) -> PathParams {
        let mut params = PathParams::new().tenant(&self.tenant).namespace(namespace);
        if let Some(partition) = &self.partition {
            params = params.partition(partition);
        }
        params
    }

    /// Collection URL for `endpoint`.
    ///
    /// Cluster admins list tenanted kinds across every namespace of the
    /// tenant, and through its partition when the tenant is the system
    /// tenant. An explicitly named namespace uses the endpoint's template.
    /// Service accounts have no tenant-wide route and always list one
    /// namespace.
    pub fn list_url(&self, endpoint: &ResourceEndpoint, scope: NamespaceScope<'_>) -> String {
        if self.is_cluster_admin()
            && endpoint.is_tenanted()
            && !endpoint.is_namespace_first()
            && !matches!(scope, NamespaceScope::Named(_))
        {
            return self.admin_list_url(endpoint.kind());
        }

        let (template, namespace) = match scope {
            NamespaceScope::Context => (endpoint.list(), self.namespace.as_str()),
            NamespaceScope::All if endpoint.is_namespace_first() => (endpoint.list(), self.namespace.as_str()),
            NamespaceScope::Named(ns) => (endpoint.list(), ns),
            NamespaceScope::All => {
                let unscoped = EndpointManager::resource(
                    endpoint.kind(),
                    false,
                    endpoint.is_tenanted(),
                    endpoint.is_partitioned(),
                );
                (unscoped.list(), self.namespace.as_str())
            }
        };
        self.params(namespace).fill(&template)
    }

    fn admin_list_url(&self, kind: ResourceKind) -> String {
        let partition = match (&self.partition, self.is_system_tenant()) {
            (Some(p), true) => format!("partition/{}/", p),
            _ => String::new(),
        };
        let url = format!("{}/{}tenants/{}/{}", BASE_HREF, partition, self.tenant, kind.path_segment());
        tracing::debug!(%url, "cluster-admin list override");
        url
    }

    /// URL of one object; every placeholder must resolve
    pub fn detail_url(&self, endpoint: &ResourceEndpoint, namespace: Option<&str>, name: &str) -> Result<String> {
        let namespace = namespace.unwrap_or(self.namespace.as_str());
        self.params(namespace).name(name).fill_strict(&endpoint.detail())
    }

    /// URL of a resource related to one object
    pub fn child_url(
        &self,
        endpoint: &ResourceEndpoint,
        name: &str,
        related: ResourceKind,
        namespace: Option<&str>,
    ) -> String {
        let namespace = namespace.unwrap_or(self.namespace.as_str());
        endpoint.child(name, related, Some(namespace), Some(&self.tenant))
    }

    /// Remember which tenant a listing of `kind` was rendered for, so a
    /// later detail view of the same kind can recover it
    pub fn record(&self, session: &Session, kind: ResourceKind) {
        if let Some(key) = recorded_key(kind) {
            session.set(key, self.tenant.clone());
        }
    }
}

fn recorded_key(kind: ResourceKind) -> Option<SessionKey> {
    match kind {
        ResourceKind::Pod => Some(SessionKey::PodTenant),
        ResourceKind::Deployment => Some(SessionKey::DeploymentTenant),
        ResourceKind::ReplicaSet => Some(SessionKey::ReplicaSetTenant),
        ResourceKind::Namespace | ResourceKind::ResourceQuota => Some(SessionKey::TenantName),
        _ => None,
    }
}

/// Tenant a previous listing of `kind` was rendered for
pub fn recorded_tenant(session: &Session, kind: ResourceKind) -> Option<String> {
    recorded_key(kind).and_then(|key| session.get(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantPrecedence;
    use crate::SYSTEM_TENANT;

    fn admin_session() -> Session {
        let session = Session::new();
        session.set(SessionKey::UserType, "cluster-admin");
        session
    }

    #[test]
    fn test_cluster_admin_lists_through_partition() {
        let session = admin_session();
        session.set_partition(SYSTEM_TENANT, "rp-1");
        let tenants = TenantService::new(session, SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Deployment, true, true, false);
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::Context),
            "api/v1/partition/rp-1/tenants/system/deployment"
        );
    }

    #[test]
    fn test_cluster_admin_without_partition() {
        let tenants = TenantService::new(admin_session(), SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Pod, true, true, false);
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::All),
            "api/v1/tenants/system/pod"
        );
    }

    #[test]
    fn test_cluster_admin_inspecting_other_tenant_skips_partition() {
        let session = admin_session();
        session.set(SessionKey::CurrentTenant, "acme");
        session.set_partition("acme", "tp-2");
        let mut tenants = TenantService::new(session, SYSTEM_TENANT);
        let view = ViewContext::capture_inspected(&mut tenants);

        assert_eq!(view.tenant, "acme");
        let endpoint = EndpointManager::resource(ResourceKind::Namespace, false, true, false);
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::Context),
            "api/v1/tenants/acme/namespace"
        );
    }

    #[test]
    fn test_cluster_admin_named_namespace_uses_template() {
        let tenants = TenantService::new(admin_session(), SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Pod, true, true, false);
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::Named("kube-system")),
            "api/v1/tenants/system/pod/kube-system"
        );
    }

    #[test]
    fn test_cluster_admin_lists_networks_through_crd_route() {
        let tenants = TenantService::new(admin_session(), SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        assert_eq!(
            view.list_url(&ResourceKind::Network.default_endpoint(), NamespaceScope::Context),
            "api/v1/tenants/system/crd"
        );
    }

    #[test]
    fn test_cluster_admin_service_accounts_keep_namespace_route() {
        let tenants = TenantService::new(admin_session(), SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        assert_eq!(
            view.list_url(&ResourceKind::ServiceAccount.default_endpoint(), NamespaceScope::Context),
            "api/v1/tenants/system/namespaces/default/serviceaccount"
        );
    }

    #[test]
    fn test_tenant_user_fills_template() {
        let session = Session::new();
        session.set(SessionKey::UserType, "tenant-user");
        session.set(SessionKey::ParentTenant, "acme");
        session.set(SessionKey::Namespace, "team-a");
        let tenants = TenantService::new(session, "acme");
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Pod, true, true, false);
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::Context),
            "api/v1/tenants/acme/pod/team-a"
        );
        assert_eq!(
            view.list_url(&endpoint, NamespaceScope::All),
            "api/v1/tenants/acme/pod"
        );
    }

    #[test]
    fn test_cluster_scoped_kind_is_not_overridden() {
        let tenants = TenantService::new(admin_session(), SYSTEM_TENANT);
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Node, false, false, false);
        assert_eq!(view.list_url(&endpoint, NamespaceScope::Context), "api/v1/node");
    }

    #[test]
    fn test_namespace_defaults() {
        let tenants =
            TenantService::with_options(Session::new(), "acme", SYSTEM_TENANT, TenantPrecedence::Context);
        let view = ViewContext::capture(&tenants);
        assert_eq!(view.namespace, DEFAULT_NAMESPACE);
        assert!(!view.is_cluster_admin());
    }

    #[test]
    fn test_detail_url_requires_partition_when_partitioned() {
        let tenants = TenantService::new(Session::new(), "acme");
        let view = ViewContext::capture(&tenants);

        let plain = EndpointManager::resource(ResourceKind::Pod, true, true, false);
        assert_eq!(
            view.detail_url(&plain, Some("ns1"), "p1").unwrap(),
            "api/v1/tenants/acme/pod/ns1/p1"
        );

        let partitioned = EndpointManager::resource(ResourceKind::Pod, true, true, true);
        assert!(view.detail_url(&partitioned, Some("ns1"), "p1").is_err());
    }

    #[test]
    fn test_child_url_uses_view_tenant() {
        let tenants = TenantService::new(Session::new(), "acme");
        let view = ViewContext::capture(&tenants);

        let endpoint = EndpointManager::resource(ResourceKind::Deployment, true, true, false);
        assert_eq!(
            view.child_url(&endpoint, "web", ResourceKind::Event, None),
            "api/v1/tenants/acme/deployment/default/web/event"
        );
    }

    #[test]
    fn test_record_listing_tenant() {
        let session = Session::new();
        let tenants = TenantService::new(session.clone(), "acme");
        let view = ViewContext::capture(&tenants);

        view.record(&session, ResourceKind::Pod);
        view.record(&session, ResourceKind::Node);

        assert_eq!(session.get(&SessionKey::PodTenant).as_deref(), Some("acme"));
        assert_eq!(recorded_tenant(&session, ResourceKind::Pod).as_deref(), Some("acme"));
        assert_eq!(recorded_tenant(&session, ResourceKind::Node), None);
    }
}
