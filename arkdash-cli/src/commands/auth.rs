///! Authentication commands

use super::Context;
use crate::api::Csrf;
use crate::output;
use anyhow::Result;
use arkdash_common::auth::{user_detail_path, AuthResponse, ConsoleUserDetail, LoginSpec};
use arkdash_common::session::SessionKey;
use arkdash_common::{Session, DEFAULT_NAMESPACE};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login to the console
    Login {
        #[arg(short, long)]
        username: String,

        /// Tenant the account belongs to
        #[arg(short = 'T', long = "login-tenant", value_name = "TENANT")]
        login_tenant: String,

        /// Password (will be prompted if not provided)
        #[arg(short, long)]
        password: Option<String>,

        /// Default namespace for this session
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Logout (clear stored credentials)
    Logout,

    /// Show current authentication status
    Status,
}

pub async fn handle_auth_command(command: AuthCommands, ctx: &mut Context) -> Result<()> {
    match command {
        AuthCommands::Login {
            username,
            login_tenant: tenant,
            password,
            namespace,
        } => {
            let password = match password {
                Some(pwd) => pwd,
                None => dialoguer::Password::new().with_prompt("Password").interact()?,
            };

            let spec = LoginSpec {
                username: username.clone(),
                password,
                tenant: tenant.clone(),
                namespace: namespace.clone(),
            };
            let response: AuthResponse = ctx
                .api
                .post("api/v1/login", &spec, Some(Csrf::new(&tenant, "login")))
                .await?;
            if !response.errors.is_empty() {
                anyhow::bail!("Login rejected: {}", serde_json::to_string(&response.errors)?);
            }

            ctx.api.set_token(response.jwe_token.clone()).await;
            tracing::info!(%username, %tenant, "logged in");

            // The account record tells us whether this is a cluster admin.
            let path = user_detail_path(&urlencoding::encode(&username));
            let account = match ctx.api.get::<ConsoleUserDetail>(&path).await {
                Ok(detail) => Some(detail.object_meta),
                Err(e) => {
                    tracing::warn!(error = %e, "account lookup failed");
                    output::print_warning(&format!(
                        "Could not look up the account type of '{}'; treating it as a member of '{}'",
                        username, tenant
                    ));
                    None
                }
            };

            let auth_tenant = match &account {
                Some(user) => user.home_tenant(&ctx.config.system_tenant).to_string(),
                None => tenant.clone(),
            };

            ctx.config.clear_credentials();
            ctx.config.token = Some(response.jwe_token);
            ctx.config.tenant = Some(auth_tenant.clone());
            ctx.config.username = Some(username.clone());
            ctx.config.user_type = account.as_ref().map(|u| u.user_type.clone());
            ctx.config.namespace = Some(response.namespace.unwrap_or(namespace));

            ctx.session = Session::new();
            ctx.session.set(SessionKey::ParentTenant, auth_tenant.clone());
            ctx.tenants = ctx.config.tenant_service(ctx.session.clone());
            ctx.save()?;

            output::print_success("Login successful");
            println!("  Username: {}", username);
            println!("  Tenant: {}", auth_tenant);
            if let Some(user_type) = &ctx.config.user_type {
                println!("  Type: {}", user_type);
            }
        }

        AuthCommands::Logout => {
            ctx.api.clear_token().await;
            ctx.config.clear_credentials();
            ctx.session = Session::new();
            ctx.save()?;

            output::print_success("Logged out successfully");
        }

        AuthCommands::Status => match (&ctx.config.token, &ctx.config.username) {
            (Some(token), Some(username)) => {
                println!("Authenticated as: {}", username);
                println!("Tenant: {}", ctx.tenants.auth_tenant());
                if let Some(user_type) = &ctx.config.user_type {
                    println!("Type: {}", user_type);
                }
                println!("Token: {}...", token_preview(token));
            }
            (Some(_), None) => println!("Token present but no username stored"),
            (None, _) => {
                println!("Not authenticated");
                println!("Use 'arkdash auth login' to authenticate");
            }
        },
    }

    Ok(())
}

/// Leading characters of a token, safe to print
fn token_preview(token: &str) -> String {
    token.chars().take(20).collect()
}
