///! Tenant context commands

use super::Context;
use crate::output;
use anyhow::Result;
use arkdash_common::session::SessionKey;
use arkdash_common::tenant::is_tenant_valid;
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand)]
pub enum TenantCommands {
    /// Show the tenant context requests are made in
    Current,
    /// Switch the tenant under view (system sessions only)
    Switch { name: String },
    /// Check a tenant name
    Validate { name: String },
    /// Show or record the storage partition of a tenant
    Partition {
        /// Tenant name; defaults to the tenant under inspection
        name: Option<String>,
        /// Record this partition for the tenant
        #[arg(long)]
        set: Option<String>,
    },
}

#[derive(Serialize)]
struct TenantStatus {
    auth_tenant: String,
    current: String,
    inspected: Option<String>,
    partition: Option<String>,
    user_type: Option<String>,
    system: bool,
}

pub async fn handle_tenant_command(command: TenantCommands, ctx: &mut Context) -> Result<()> {
    match command {
        TenantCommands::Current => {
            let inspected = Some(ctx.tenants.resource_tenant()).filter(|t| !t.is_empty());
            let status = TenantStatus {
                auth_tenant: ctx.tenants.auth_tenant().to_string(),
                current: ctx.tenants.current(),
                partition: ctx.tenants.tenant_partition(),
                inspected,
                user_type: ctx.session.user_type().map(|u| u.to_string()),
                system: ctx.tenants.is_system(),
            };

            match ctx.format {
                output::OutputFormat::Table => {
                    println!("Tenant: {}", status.current);
                    println!("  Signed in to: {}", status.auth_tenant);
                    if let Some(inspected) = &status.inspected {
                        println!("  Inspecting: {}", inspected);
                    }
                    println!("  Partition: {}", status.partition.as_deref().unwrap_or("-"));
                    println!("  User type: {}", status.user_type.as_deref().unwrap_or("-"));
                }
                format => output::print_single(&status, format)?,
            }
        }

        TenantCommands::Switch { name: tenant } => {
            if ctx.tenants.switch_to(&tenant)? {
                ctx.session.set(SessionKey::CurrentTenant, tenant.clone());
                ctx.keep_tenant();
                ctx.save()?;
                output::print_success(&format!("Switched to tenant '{}'", tenant));
            } else {
                output::print_warning(&format!(
                    "Only system sessions can switch tenants; staying in '{}'",
                    ctx.tenants.current()
                ));
            }
        }

        TenantCommands::Validate { name: tenant } => {
            if is_tenant_valid(&tenant) {
                output::print_success(&format!("'{}' is a valid tenant name", tenant));
            } else {
                anyhow::bail!(
                    "'{}' is not a valid tenant name: use lowercase letters, digits and '-', \
                     starting and ending with a letter or digit",
                    tenant
                );
            }
        }

        TenantCommands::Partition { name, set } => {
            let tenant = match name {
                Some(tenant) => tenant,
                None => {
                    let inspected = ctx.tenants.resource_tenant();
                    if inspected.is_empty() {
                        ctx.tenants.current()
                    } else {
                        inspected
                    }
                }
            };

            if let Some(partition) = set {
                ctx.session.set_partition(&tenant, partition.clone());
                ctx.save()?;
                output::print_success(&format!("Recorded partition '{}' for '{}'", partition, tenant));
            } else {
                match ctx.tenants.partition_of(&tenant) {
                    Some(partition) => println!("{}", partition),
                    None => output::print_info(&format!("No partition recorded for '{}'", tenant)),
                }
            }
        }
    }

    Ok(())
}
