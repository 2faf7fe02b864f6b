use bizbank_core::cli::{Cli, Commands, DbCommands, TransferCommands, TxCommands};
use bizbank_core::config::{Config, LogFormat};
use bizbank_core::{build_state, cli, create_app, db};
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => {
            let pool = db::create_pool(&config).await?;
            cli::handle_config_validate(&config, &pool).await
        }
        Commands::Tx(TxCommands::Show { tx_id }) => {
            let pool = db::create_pool(&config).await?;
            let state = build_state(&config, pool)?;
            cli::handle_tx_show(&state, tx_id).await
        }
        Commands::Transfer(TransferCommands::Sync { transfer_id }) => {
            let pool = db::create_pool(&config).await?;
            let state = build_state(&config, pool)?;
            cli::handle_transfer_sync(&state, transfer_id).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let state = build_state(&config, pool)?;
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
