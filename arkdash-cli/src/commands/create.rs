///! Create commands

use super::Context;
use crate::api::Csrf;
use crate::output;
use anyhow::{Context as _, Result};
use arkdash_common::endpoint::CreateTarget;
use arkdash_common::tenant::is_tenant_valid;
use arkdash_common::{EndpointManager, PathParams, ResourceKind, DEFAULT_NAMESPACE};
use base64::Engine;
use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NAME_MAX_LENGTH: usize = 63;
const USERNAME_MAX_LENGTH: usize = 24;
const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
/// Cluster role bound to new cluster admins
const ADMIN_CLUSTER_ROLE: &str = "admin-role";
const TOKEN_POLL_INTERVAL: Duration = Duration::from_secs(3);
const TOKEN_POLL_ATTEMPTS: u32 = 20;

/// Kind of account `create user` makes; tenant admins come with `create tenant`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NewUserType {
    TenantUser,
    ClusterAdmin,
}

impl NewUserType {
    fn as_str(&self) -> &'static str {
        match self {
            NewUserType::TenantUser => "tenant-user",
            NewUserType::ClusterAdmin => "cluster-admin",
        }
    }
}

#[derive(Subcommand)]
pub enum CreateCommands {
    /// Create a namespace in the current tenant
    Namespace { name: String },

    /// Create a tenant together with its tenant admin
    Tenant {
        name: String,

        /// Tenant admin username
        #[arg(short, long)]
        username: String,

        /// Tenant admin password (will be prompted if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Assign a resource quota to a namespace
    Quota {
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(long)]
        cpu: Option<String>,
        #[arg(long)]
        memory: Option<String>,
        #[arg(long)]
        pods: Option<String>,
        #[arg(long)]
        services: Option<String>,
        #[arg(long)]
        pvc: Option<String>,
        #[arg(long)]
        config_maps: Option<String>,
        #[arg(long)]
        secrets: Option<String>,
        #[arg(long)]
        ephemeral_storage: Option<String>,
    },

    /// Create a role in a namespace of the current tenant
    Role {
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        /// Comma separated API groups
        #[arg(long, default_value = "*")]
        api_groups: String,
        /// Comma separated verbs
        #[arg(long)]
        verbs: String,
        /// Comma separated resources
        #[arg(long)]
        resources: String,
    },

    /// Create a cluster role (system sessions only)
    #[command(name = "clusterrole")]
    ClusterRole {
        name: String,
        #[arg(long, default_value = "*")]
        api_groups: String,
        #[arg(long)]
        verbs: String,
        #[arg(long)]
        resources: String,
    },

    /// Create a console user backed by a service account
    User {
        username: String,

        #[arg(long = "type", value_enum)]
        user_type: NewUserType,

        /// Role bound to a tenant user
        #[arg(short, long)]
        role: Option<String>,

        /// Namespace of a tenant user's service account
        #[arg(short, long)]
        namespace: Option<String>,

        /// Password (will be prompted if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Register a node (system sessions only)
    Node { name: String },
}

#[derive(Serialize)]
struct NamespaceSpec {
    name: String,
    tenant: String,
}

#[derive(Serialize)]
struct TenantSpec {
    name: String,
    username: String,
    password: String,
}

#[derive(Serialize, Default)]
struct QuotaSpec {
    name: String,
    tenant: String,
    namespace: String,
    cpu: String,
    memory: String,
    pods: String,
    services: String,
    pvc: String,
    config_maps: String,
    secrets: String,
    ephemeral_storage: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleSpec {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    api_groups: Vec<String>,
    verbs: Vec<String>,
    resources: Vec<String>,
}

#[derive(Serialize)]
struct NodeSpec {
    name: String,
    #[serde(rename = "StorageClusterId")]
    storage_cluster_id: String,
}

#[derive(Serialize)]
struct ServiceAccountSpec {
    name: String,
    namespace: String,
    tenant: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Subject {
    kind: &'static str,
    name: String,
    namespace: String,
    api_group: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleRef {
    kind: &'static str,
    name: String,
    api_group: &'static str,
}

#[derive(Serialize)]
struct BindingSpec {
    name: String,
    namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    subject: Subject,
    role_ref: RoleRef,
}

impl BindingSpec {
    /// Bind the service account `name` in `namespace` to a role
    fn for_service_account(name: &str, namespace: &str, role_kind: &'static str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            tenant: None,
            subject: Subject {
                kind: "ServiceAccount",
                name: name.to_string(),
                namespace: namespace.to_string(),
                api_group: "",
            },
            role_ref: RoleRef {
                kind: role_kind,
                name: role.to_string(),
                api_group: RBAC_API_GROUP,
            },
        }
    }
}

#[derive(Serialize)]
struct UserSpec {
    name: String,
    password: String,
    token: String,
    namespace: String,
    #[serde(rename = "type")]
    user_type: String,
    tenant: String,
    role: String,
}

#[derive(Deserialize, Default)]
struct SecretList {
    #[serde(default)]
    secrets: Vec<SecretItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretItem {
    object_meta: arkdash_common::ObjectMeta,
}

#[derive(Deserialize)]
struct SecretDetail {
    #[serde(default)]
    data: std::collections::BTreeMap<String, String>,
}

/// Where the pieces of a new user live
#[derive(Debug, PartialEq)]
struct UserPlan {
    /// Tenant holding the service account and its token secret
    account_tenant: String,
    namespace: String,
    /// Tenant recorded on the user
    user_tenant: String,
    role: String,
}

fn plan_user(
    user_type: NewUserType,
    current_tenant: &str,
    system_tenant: &str,
    namespace: Option<String>,
    role: Option<String>,
) -> Result<UserPlan> {
    match user_type {
        NewUserType::TenantUser => {
            let Some(role) = role.filter(|r| !r.is_empty()) else {
                anyhow::bail!("A tenant user needs a role: pass --role");
            };
            Ok(UserPlan {
                account_tenant: current_tenant.to_string(),
                namespace: namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                user_tenant: current_tenant.to_string(),
                role,
            })
        }
        NewUserType::ClusterAdmin => Ok(UserPlan {
            account_tenant: system_tenant.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            user_tenant: system_tenant.to_string(),
            role: String::new(),
        }),
    }
}

/// Split a comma separated list, dropping blanks
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Name of the token secret the backend generated for `username`
fn token_secret<'a>(secrets: &'a [SecretItem], username: &str) -> Option<&'a str> {
    let marker = format!("{}-token", username);
    secrets
        .iter()
        .map(|s| s.object_meta.name.as_str())
        .find(|name| name.contains(&marker))
}

fn decode_token(encoded: &str) -> Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("Service account token is not valid base64")?;
    String::from_utf8(bytes).context("Service account token is not UTF-8")
}

/// Wait for the service account token of `username` and decode it
async fn wait_for_token(ctx: &Context, tenant: &str, namespace: &str, username: &str) -> Result<String> {
    let endpoint = ResourceKind::Secret.default_endpoint();
    let params = PathParams::new().tenant(tenant).namespace(namespace);
    let list_url = params.fill_strict(&endpoint.list())?;

    for attempt in 1..=TOKEN_POLL_ATTEMPTS {
        let list: SecretList = ctx.api.get(&list_url).await?;
        if let Some(secret) = token_secret(&list.secrets, username) {
            let url = params.clone().name(secret).fill_strict(&endpoint.detail())?;
            let detail: SecretDetail = ctx.api.get(&url).await?;
            let Some(encoded) = detail.data.get("token") else {
                anyhow::bail!("Secret '{}' has no token", secret);
            };
            return decode_token(encoded);
        }
        tracing::debug!(%username, attempt, "token secret not ready");
        tokio::time::sleep(TOKEN_POLL_INTERVAL).await;
    }

    anyhow::bail!(
        "No token secret appeared for service account '{}' in {}/{}",
        username,
        tenant,
        namespace
    )
}

fn prompt_password(prompt: &str, password: Option<String>) -> Result<String> {
    match password {
        Some(pwd) => Ok(pwd),
        None => Ok(dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?),
    }
}

/// Namespaces and tenants share the DNS label naming rule
fn check_name(what: &str, name: &str) -> Result<()> {
    if name.len() > NAME_MAX_LENGTH || !is_tenant_valid(name) {
        anyhow::bail!(
            "Invalid {} name '{}': at most {} lowercase letters, digits or '-'",
            what,
            name,
            NAME_MAX_LENGTH
        );
    }
    Ok(())
}

pub async fn handle_create_command(command: CreateCommands, ctx: &mut Context) -> Result<()> {
    ctx.require_login()?;

    match command {
        CreateCommands::Namespace { name } => {
            check_name("namespace", &name)?;
            let tenant = ctx.view().tenant;
            let target = CreateTarget::Namespace;
            let spec = NamespaceSpec {
                name: name.clone(),
                tenant: tenant.clone(),
            };

            ctx.api
                .post_empty(&EndpointManager::create(target), &spec, Some(Csrf::new(&tenant, target.as_str())))
                .await?;
            output::print_success(&format!("namespace '{}' created in tenant '{}'", name, tenant));
        }

        CreateCommands::Tenant {
            name,
            username,
            password,
        } => {
            if !ctx.tenants.is_system() {
                anyhow::bail!("Only system sessions can create tenants");
            }
            check_name("tenant", &name)?;
            let password = prompt_password("Tenant admin password", password)?;

            let target = CreateTarget::Tenant;
            let spec = TenantSpec {
                name: name.clone(),
                username,
                password,
            };
            // The token is requested for the tenant being created.
            ctx.api
                .post_empty(&EndpointManager::create(target), &spec, Some(Csrf::new(&name, target.as_str())))
                .await?;
            output::print_success(&format!("tenant '{}' created", name));
        }

        CreateCommands::Quota {
            name,
            namespace,
            cpu,
            memory,
            pods,
            services,
            pvc,
            config_maps,
            secrets,
            ephemeral_storage,
        } => {
            let view = ctx.view();
            let target = CreateTarget::ResourceQuota;
            let spec = QuotaSpec {
                name: name.clone(),
                tenant: view.tenant.clone(),
                namespace: namespace.unwrap_or_else(|| view.namespace.clone()),
                cpu: cpu.unwrap_or_default(),
                memory: memory.unwrap_or_default(),
                pods: pods.unwrap_or_default(),
                services: services.unwrap_or_default(),
                pvc: pvc.unwrap_or_default(),
                config_maps: config_maps.unwrap_or_default(),
                secrets: secrets.unwrap_or_default(),
                ephemeral_storage: ephemeral_storage.unwrap_or_default(),
            };

            ctx.api
                .post_empty(
                    &EndpointManager::create(target),
                    &spec,
                    Some(Csrf::new(&view.tenant, target.as_str())),
                )
                .await?;
            output::print_success(&format!("quota '{}' assigned to namespace '{}'", name, spec.namespace));
        }

        CreateCommands::Role {
            name,
            namespace,
            api_groups,
            verbs,
            resources,
        } => {
            let view = ctx.view();
            let target = CreateTarget::Roles;
            let spec = RoleSpec {
                name: name.clone(),
                tenant: Some(view.tenant.clone()),
                namespace: Some(namespace.unwrap_or_else(|| view.namespace.clone())),
                api_groups: split_list(&api_groups),
                verbs: split_list(&verbs),
                resources: split_list(&resources),
            };

            ctx.api
                .post_empty(
                    &EndpointManager::create(target),
                    &spec,
                    Some(Csrf::new(&view.tenant, target.as_str())),
                )
                .await?;
            output::print_success(&format!("role '{}' created in tenant '{}'", name, view.tenant));
        }

        CreateCommands::ClusterRole {
            name,
            api_groups,
            verbs,
            resources,
        } => {
            if !ctx.tenants.is_system() {
                anyhow::bail!("Only system sessions can create cluster roles");
            }
            let target = CreateTarget::ClusterRole;
            let spec = RoleSpec {
                name: name.clone(),
                tenant: None,
                namespace: None,
                api_groups: split_list(&api_groups),
                verbs: split_list(&verbs),
                resources: split_list(&resources),
            };

            let system = ctx.config.system_tenant.clone();
            ctx.api
                .post_empty(&EndpointManager::create(target), &spec, Some(Csrf::new(&system, target.as_str())))
                .await?;
            output::print_success(&format!("cluster role '{}' created", name));
        }

        CreateCommands::Node { name } => {
            if !ctx.tenants.is_system() {
                anyhow::bail!("Only system sessions can register nodes");
            }
            let target = CreateTarget::Node;
            let spec = NodeSpec {
                name: name.clone(),
                storage_cluster_id: name.clone(),
            };
            // The token is requested for the node being registered.
            ctx.api
                .post_empty(&EndpointManager::create(target), &spec, Some(Csrf::new(&name, target.as_str())))
                .await?;
            output::print_success(&format!("node '{}' registered", name));
        }

        CreateCommands::User {
            username,
            user_type,
            role,
            namespace,
            password,
        } => {
            if username.len() > USERNAME_MAX_LENGTH || !is_tenant_valid(&username) {
                anyhow::bail!(
                    "Invalid username '{}': at most {} lowercase letters, digits or '-'",
                    username,
                    USERNAME_MAX_LENGTH
                );
            }
            if user_type == NewUserType::ClusterAdmin && !ctx.tenants.is_system() {
                anyhow::bail!("Only system sessions can create cluster admins");
            }

            let current = ctx.view().tenant;
            let plan = plan_user(user_type, &current, &ctx.config.system_tenant, namespace, role)?;
            let password = prompt_password("User password", password)?;

            let target = CreateTarget::ServiceAccounts;
            let account = ServiceAccountSpec {
                name: username.clone(),
                namespace: plan.namespace.clone(),
                tenant: plan.account_tenant.clone(),
            };
            ctx.api
                .post_empty(
                    &EndpointManager::create(target),
                    &account,
                    Some(Csrf::new(&plan.account_tenant, target.as_str())),
                )
                .await?;
            tracing::info!(%username, tenant = %plan.account_tenant, namespace = %plan.namespace, "service account created");

            match user_type {
                NewUserType::TenantUser => {
                    let target = CreateTarget::RoleBindings;
                    let mut binding = BindingSpec::for_service_account(&username, &plan.namespace, "Role", &plan.role);
                    binding.tenant = Some(plan.account_tenant.clone());
                    ctx.api
                        .post_empty(
                            &EndpointManager::create(target),
                            &binding,
                            Some(Csrf::new(&plan.account_tenant, target.as_str())),
                        )
                        .await?;
                }
                NewUserType::ClusterAdmin => {
                    let target = CreateTarget::ClusterRoleBinding;
                    let binding =
                        BindingSpec::for_service_account(&username, &plan.namespace, "ClusterRole", ADMIN_CLUSTER_ROLE);
                    let system = ctx.config.system_tenant.clone();
                    ctx.api
                        .post_empty(&EndpointManager::create(target), &binding, Some(Csrf::new(&system, target.as_str())))
                        .await?;
                }
            }

            output::print_info("Waiting for the service account token...");
            let token = wait_for_token(ctx, &plan.account_tenant, &plan.namespace, &username).await?;

            let target = CreateTarget::Users;
            let spec = UserSpec {
                name: username.clone(),
                password,
                token,
                namespace: plan.namespace.clone(),
                user_type: user_type.as_str().to_string(),
                tenant: plan.user_tenant.clone(),
                role: plan.role.clone(),
            };
            ctx.api
                .post_empty(&EndpointManager::create(target), &spec, Some(Csrf::new(&current, target.as_str())))
                .await?;
            output::print_success(&format!("{} '{}' created in tenant '{}'", user_type.as_str(), username, plan.user_tenant));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name() {
        assert!(check_name("namespace", "team-a").is_ok());
        assert!(check_name("namespace", "Team_A").is_err());
        assert!(check_name("tenant", &"a".repeat(64)).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("get, list,,watch"), vec!["get", "list", "watch"]);
        assert_eq!(split_list("*"), vec!["*"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_role_spec_field_names() {
        let spec = RoleSpec {
            name: "reader".to_string(),
            tenant: Some("acme".to_string()),
            namespace: Some("team-a".to_string()),
            api_groups: split_list("apps,"),
            verbs: split_list("get,list"),
            resources: split_list("pods"),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["apiGroups"], serde_json::json!(["apps"]));
        assert_eq!(value["verbs"], serde_json::json!(["get", "list"]));
        assert_eq!(value["namespace"], "team-a");

        let cluster = RoleSpec {
            tenant: None,
            namespace: None,
            ..spec
        };
        let value = serde_json::to_value(&cluster).unwrap();
        assert!(value.get("tenant").is_none());
        assert!(value.get("namespace").is_none());
    }

    #[test]
    fn test_node_spec_carries_storage_cluster() {
        let spec = NodeSpec {
            name: "n1".to_string(),
            storage_cluster_id: "n1".to_string(),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value, serde_json::json!({"name": "n1", "StorageClusterId": "n1"}));
    }

    #[test]
    fn test_binding_spec_shape() {
        let mut binding = BindingSpec::for_service_account("bob", "team-a", "Role", "reader");
        binding.tenant = Some("acme".to_string());
        let value = serde_json::to_value(&binding).unwrap();
        assert_eq!(value["tenant"], "acme");
        assert_eq!(
            value["subject"],
            serde_json::json!({"kind": "ServiceAccount", "name": "bob", "namespace": "team-a", "apiGroup": ""})
        );
        assert_eq!(
            value["role_ref"],
            serde_json::json!({"kind": "Role", "name": "reader", "apiGroup": "rbac.authorization.k8s.io"})
        );

        let binding = BindingSpec::for_service_account("root2", "default", "ClusterRole", ADMIN_CLUSTER_ROLE);
        let value = serde_json::to_value(&binding).unwrap();
        assert!(value.get("tenant").is_none());
        assert_eq!(value["role_ref"]["name"], "admin-role");
    }

    #[test]
    fn test_plan_user() {
        let plan = plan_user(
            NewUserType::TenantUser,
            "acme",
            "system",
            Some("team-a".to_string()),
            Some("reader".to_string()),
        )
        .unwrap();
        assert_eq!(
            plan,
            UserPlan {
                account_tenant: "acme".to_string(),
                namespace: "team-a".to_string(),
                user_tenant: "acme".to_string(),
                role: "reader".to_string(),
            }
        );
        assert!(plan_user(NewUserType::TenantUser, "acme", "system", None, None).is_err());

        let plan = plan_user(NewUserType::ClusterAdmin, "acme", "system", Some("x".to_string()), Some("r".to_string()))
            .unwrap();
        assert_eq!(plan.account_tenant, "system");
        assert_eq!(plan.user_tenant, "system");
        assert_eq!(plan.namespace, "default");
        assert!(plan.role.is_empty());
    }

    #[test]
    fn test_token_secret_lookup_and_decode() {
        let list: SecretList = serde_json::from_value(serde_json::json!({
            "listMeta": {"totalItems": 2},
            "secrets": [
                {"objectMeta": {"name": "default-token-abcde"}},
                {"objectMeta": {"name": "bob-token-x7k2p"}}
            ]
        }))
        .unwrap();
        assert_eq!(token_secret(&list.secrets, "bob"), Some("bob-token-x7k2p"));
        assert_eq!(token_secret(&list.secrets, "carol"), None);

        assert_eq!(decode_token("ZXlKaGJHY2lPaUpT\n").unwrap(), "eyJhbGciOiJS");
        assert!(decode_token("not base64!").is_err());
    }

    #[test]
    fn test_quota_spec_field_names() {
        let spec = QuotaSpec {
            name: "q1".to_string(),
            config_maps: "10".to_string(),
            ephemeral_storage: "1Gi".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["config_maps"], "10");
        assert_eq!(value["ephemeral_storage"], "1Gi");
        assert_eq!(value["cpu"], "");
    }
}
