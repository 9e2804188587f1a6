///! Arkdash CLI
///!
///! Command-line console for a multi-tenant cluster dashboard backend

mod api;
mod commands;
mod config;
mod logging;
mod output;

use anyhow::Result;
use arkdash_common::ResourceKind;
use clap::{Parser, Subcommand};
use commands::auth::AuthCommands;
use commands::create::CreateCommands;
use commands::resource::UrlCommands;
use commands::tenant::TenantCommands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// API server address (defaults to the configured server)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Inspect another tenant for this command (system sessions only)
    #[arg(short, long, global = true)]
    tenant: Option<String>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Inspect or switch the tenant context
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },
    /// List resources of a kind, or show one object
    Get {
        kind: ResourceKind,
        name: Option<String>,
        #[arg(short, long)]
        namespace: Option<String>,
        /// List across every namespace
        #[arg(short = 'A', long)]
        all_namespaces: bool,
    },
    /// Delete an object
    Delete {
        kind: ResourceKind,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        /// Account id, required for users
        #[arg(long)]
        id: Option<i64>,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace an object with the contents of a JSON or YAML file
    Edit {
        kind: ResourceKind,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(long)]
        id: Option<i64>,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Scale a workload
    Scale {
        kind: ResourceKind,
        namespace: String,
        name: String,
        replicas: u32,
    },
    /// Run a cron job now
    Trigger { namespace: String, name: String },
    /// Create namespaces, tenants, quotas, roles, users and nodes
    Create {
        #[command(subcommand)]
        command: CreateCommands,
    },
    /// Print the URL a request would use, without sending it
    Url {
        #[command(subcommand)]
        command: UrlCommands,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = match logging::LoggingConfig::from_env(cli.verbose).init() {
        Ok(guard) => guard,
        Err(e) => {
            output::print_error(&format!("Failed to initialise logging: {}", e));
            None
        }
    };

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    let config = config::Config::load()?;
    let mut ctx = commands::Context::new(config, cli.server.as_deref(), cli.output.as_deref()).await;
    if let Some(tenant) = &cli.tenant {
        ctx.override_tenant(tenant)?;
    }

    match cli.command {
        Commands::Auth { command } => commands::auth::handle_auth_command(command, &mut ctx).await?,
        Commands::Tenant { command } => commands::tenant::handle_tenant_command(command, &mut ctx).await?,
        Commands::Get {
            kind,
            name,
            namespace,
            all_namespaces,
        } => commands::resource::handle_get(&mut ctx, kind, name, namespace, all_namespaces).await?,
        Commands::Delete {
            kind,
            name,
            namespace,
            id,
            yes,
        } => commands::resource::handle_delete(&mut ctx, kind, name, namespace, id, yes).await?,
        Commands::Edit {
            kind,
            name,
            namespace,
            id,
            file,
        } => commands::resource::handle_edit(&mut ctx, kind, name, namespace, id, file).await?,
        Commands::Scale {
            kind,
            namespace,
            name,
            replicas,
        } => commands::resource::handle_scale(&mut ctx, kind, namespace, name, replicas).await?,
        Commands::Trigger { namespace, name } => {
            commands::resource::handle_trigger(&mut ctx, namespace, name).await?
        }
        Commands::Create { command } => commands::create::handle_create_command(command, &mut ctx).await?,
        Commands::Url { command } => commands::resource::handle_url(&mut ctx, command)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
