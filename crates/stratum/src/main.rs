//! Stratum
//!
//! Multi-tenant account administration server, plus the tenant
//! administration command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use stratum_persistence::{CallSignal, IdentityResolver, StoreProvider};
use stratum_rest::{ServerConfig, TenantAdmin, create_app_with_provider, init_logging};
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use stratum_persistence::backends::sqlite::{SqliteProvider, SqliteStoreConfig, StoreLocation};
#[cfg(feature = "sqlite")]
use stratum_persistence::strategy::SchemaPerTenantConfig;

#[derive(Debug, Parser)]
#[command(name = "stratum", version)]
#[command(about = "Multi-tenant account administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the account API server.
    Serve(ServerConfig),
    /// Manage tenants.
    Tenant(TenantArgs),
}

#[derive(Debug, Args)]
struct TenantArgs {
    /// Directory holding the control and tenant databases.
    #[arg(long, env = "STRATUM_DATA_DIR")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: TenantCommand,
}

#[derive(Debug, Subcommand)]
enum TenantCommand {
    /// Add a tenant and provision its store.
    Add {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Store selector. Derived from the name when omitted.
        #[arg(long)]
        short_name: Option<String>,
    },
    /// Delete a tenant and its store.
    Delete {
        /// Short name of the tenant.
        #[arg(value_name = "NAME")]
        positional: Option<String>,
        /// Short name of the tenant.
        #[arg(long)]
        name: Option<String>,
        /// Required to actually delete.
        #[arg(long)]
        confirm: bool,
    },
    /// List tenants.
    List,
}

/// Opens the SQLite stores under `data_dir`, or in memory when unset.
///
/// Pool sizing comes from `config`.
#[cfg(feature = "sqlite")]
fn open_provider(
    data_dir: Option<&Path>,
    config: &ServerConfig,
) -> anyhow::Result<Arc<dyn StoreProvider>> {
    let location = match data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "Opening SQLite stores");
            StoreLocation::directory(dir)
        }
        None => {
            info!("Opening in-memory SQLite stores");
            StoreLocation::in_memory()
        }
    };
    let pool = SqliteStoreConfig::default()
        .with_max_connections(config.max_connections)
        .with_connection_timeout(config.connection_timeout);
    let provider = SqliteProvider::with_config(location, pool, SchemaPerTenantConfig::default())?;
    Ok(Arc::new(provider))
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
fn open_provider(
    _data_dir: Option<&Path>,
    _config: &ServerConfig,
) -> anyhow::Result<Arc<dyn StoreProvider>> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p stratum --features sqlite"
    )
}

/// Starts the Axum HTTP server.
async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        request_timeout = ?config.request_timeout,
        "Starting Stratum server"
    );

    if config.data_dir.is_none() {
        warn!(
            "No data directory set; stores are in memory and tenants added with \
             `stratum tenant add` are not visible to this server"
        );
    }

    let provider = open_provider(config.data_dir.as_deref(), &config)?;
    let app = create_app_with_provider(provider, config.clone());

    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

async fn tenant(args: TenantArgs) -> anyhow::Result<()> {
    let provider = open_provider(Some(&args.data_dir), &ServerConfig::from_env())?;
    let admin = TenantAdmin::new(IdentityResolver::new(provider));

    match args.command {
        TenantCommand::Add { name, short_name } => {
            let tenant = admin
                .add_tenant(&name, short_name.as_deref(), CallSignal::new())
                .await?;
            println!("Added tenant {} ({})", tenant.short_name, tenant.id);
        }
        TenantCommand::Delete {
            positional,
            name,
            confirm,
        } => {
            let Some(name) = name.or(positional).filter(|n| !n.trim().is_empty()) else {
                println!("You must provide tenant name");
                return Ok(());
            };
            if !confirm {
                println!("You must pass the confirm flag");
                return Ok(());
            }

            println!("Deleting tenant: {}", name);
            if let Err(e) = admin.delete_tenant(&name, CallSignal::new()).await {
                println!("{}", e);
                return Ok(());
            }
            println!("Done deleting tenant!");
        }
        TenantCommand::List => {
            for tenant in admin.list_tenants(CallSignal::new()).await? {
                println!("{}\t{}\t{}", tenant.short_name, tenant.id, tenant.name);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => {
            init_logging(&config.log_level);
            serve(config).await
        }
        Command::Tenant(args) => {
            init_logging("warn");
            tenant(args).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_delete_accepts_positional_name() {
        let cli = Cli::try_parse_from([
            "stratum",
            "tenant",
            "--data-dir",
            "/var/lib/stratum",
            "delete",
            "acme",
            "--confirm",
        ])
        .unwrap();
        match cli.command {
            Command::Tenant(TenantArgs {
                data_dir,
                command:
                    TenantCommand::Delete {
                        positional,
                        name,
                        confirm,
                    },
            }) => {
                assert_eq!(data_dir, PathBuf::from("/var/lib/stratum"));
                assert_eq!(positional.as_deref(), Some("acme"));
                assert_eq!(name, None);
                assert!(confirm);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_uses_server_flags() {
        let cli = Cli::try_parse_from(["stratum", "serve", "--port", "9090"]).unwrap();
        match cli.command {
            Command::Serve(config) => assert_eq!(config.port, 9090),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tenant_commands_require_data_dir() {
        if std::env::var_os("STRATUM_DATA_DIR").is_some() {
            return;
        }
        let err = Cli::try_parse_from(["stratum", "tenant", "list"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
