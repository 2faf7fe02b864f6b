use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::AppState;

#[derive(Parser)]
#[command(name = "bizbank-core")]
#[command(about = "BizBank Core - business banking transfer and transaction engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Transfer management commands
    #[command(subcommand)]
    Transfer(TransferCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Show a transaction by ID (a pending ID also finds its posted record)
    Show {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Pull the bank's current status for a transfer and apply it
    Sync {
        /// Transfer UUID
        #[arg(value_name = "TRANSFER_ID")]
        transfer_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_show(state: &AppState, tx_id: Uuid) -> anyhow::Result<()> {
    match state.queries.find(tx_id).await? {
        Some(view) => {
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        None => {
            tracing::warn!("Transaction {} not found", tx_id);
            anyhow::bail!("Transaction {} not found", tx_id)
        }
    }
}

pub async fn handle_transfer_sync(state: &AppState, transfer_id: Uuid) -> anyhow::Result<()> {
    let transfer = state.transfers.sync_transfer(transfer_id).await?;
    tracing::info!(transfer_id = %transfer.id, status = %transfer.status, "transfer synced");
    println!("✓ Transfer {} is {}", transfer.id, transfer.status);
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub async fn handle_config_validate(config: &Config, pool: &PgPool) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Bank Backend: {:?}", config.bank_backend);
    println!("  Bank API URL: {}", config.bank_api_url);
    if let Some(url) = &config.transfer_service_url {
        println!("  Transfer Service URL: {}", url);
    }
    match &config.redis_url {
        Some(url) => println!("  Redis URL: {}", mask_password(url)),
        None => println!("  Redis URL: (not set)"),
    }
    println!("  Aggregator Transfer Limit: {}", config.aggregator_transfer_limit);

    let report = crate::startup::validate_environment(config, pool).await?;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user_start = slash_pos + 2;
                let user = &url[user_start..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
