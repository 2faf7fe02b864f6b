pub mod adapters;
pub mod bank;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod startup;
pub mod translation;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::adapters::{PostgresDirectory, PostgresTransactionStore, PostgresTransferStore};
use crate::bank::{BackendKind, BankBackend, PartnerBankClient, RemoteTransferClient};
use crate::config::Config;
use crate::ports::{AccountDirectory, ContactDirectory, PayeeStore, TransactionStore, TransferStore};
use crate::services::{
    EventPublisher, InMemoryPublisher, LifecycleService, LimitValidator, NotificationEmitter,
    RedisQueuePublisher, TransactionQueryService, TransferRouter, TransferService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub transfers: TransferService,
    pub lifecycle: LifecycleService,
    pub queries: TransactionQueryService,
    pub webhook_secret: String,
}

/// Storage the services read and write through.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountDirectory>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub payees: Arc<dyn PayeeStore>,
    pub transfers: Arc<dyn TransferStore>,
    pub transactions: Arc<dyn TransactionStore>,
}

impl Stores {
    pub fn postgres(pool: &PgPool) -> Self {
        let directory = Arc::new(PostgresDirectory::new(pool.clone()));
        Self {
            accounts: directory.clone(),
            contacts: directory.clone(),
            payees: directory,
            transfers: Arc::new(PostgresTransferStore::new(pool.clone())),
            transactions: Arc::new(PostgresTransactionStore::new(pool.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub aggregator_limit: BigDecimal,
    pub bank_name: String,
    pub webhook_secret: String,
    pub decline_threshold: u32,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            aggregator_limit: config.aggregator_transfer_limit.clone(),
            bank_name: config.bank_name.clone(),
            webhook_secret: config.bank_webhook_secret.clone(),
            decline_threshold: config.decline_code_threshold,
        }
    }
}

impl AppState {
    pub fn assemble(
        db: PgPool,
        stores: Stores,
        backend: Arc<dyn BankBackend>,
        publisher: Arc<dyn EventPublisher>,
        settings: Settings,
    ) -> Self {
        let notifier = NotificationEmitter::new(publisher, settings.bank_name);
        let lifecycle = LifecycleService::new(
            stores.transactions.clone(),
            stores.transfers.clone(),
            notifier,
        );
        let router = TransferRouter::new(
            stores.accounts.clone(),
            stores.contacts.clone(),
            stores.payees.clone(),
        );
        let validator = LimitValidator::new(stores.accounts.clone(), settings.aggregator_limit);
        let transfers = TransferService::new(
            router,
            validator,
            backend,
            stores.transfers.clone(),
            lifecycle.clone(),
            settings.decline_threshold,
        );
        let queries = TransactionQueryService::new(
            stores.transactions,
            stores.accounts,
            stores.contacts,
        );

        AppState {
            db,
            transfers,
            lifecycle,
            queries,
            webhook_secret: settings.webhook_secret,
        }
    }
}

/// Picks the bank backend once for the life of the process.
pub fn bank_backend(config: &Config) -> anyhow::Result<Arc<dyn BankBackend>> {
    match config.bank_backend {
        BackendKind::Partner => Ok(Arc::new(PartnerBankClient::new(
            config.bank_api_url.clone(),
            config.bank_api_key.clone(),
            config.decline_code_threshold,
        ))),
        BackendKind::Remote => {
            let url = config
                .transfer_service_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("TRANSFER_SERVICE_URL is required for the remote backend"))?;
            Ok(Arc::new(RemoteTransferClient::new(url, config.decline_code_threshold)))
        }
    }
}

pub fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisQueuePublisher::new(url, config.notification_queue.clone())?)),
        None => {
            tracing::warn!("REDIS_URL not set; pending-transfer notifications stay in memory");
            Ok(Arc::new(InMemoryPublisher::new()))
        }
    }
}

pub fn build_state(config: &Config, pool: PgPool) -> anyhow::Result<AppState> {
    let backend = bank_backend(config)?;
    let publisher = event_publisher(config)?;
    tracing::info!(backend = backend.name(), "bank backend selected");

    Ok(AppState::assemble(
        pool.clone(),
        Stores::postgres(&pool),
        backend,
        publisher,
        Settings::from_config(config),
    ))
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/transfers", post(handlers::transfers::submit_transfer))
        .route("/transfers/:id", get(handlers::transfers::get_transfer))
        .route("/transfers/:id/review", post(handlers::transfers::review_transfer))
        .route("/transactions", get(handlers::transactions::list_transactions))
        .route("/transactions/:id", get(handlers::transactions::get_transaction))
        .route("/webhooks/bank", post(handlers::webhook::bank_event))
        .with_state(state)
}
