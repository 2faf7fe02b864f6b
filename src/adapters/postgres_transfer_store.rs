use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{EndpointRef, EndpointType, MoneyTransfer, Rail, RoutingContext, TransferStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransferStore};

const COLUMNS: &str = "id, bank_transfer_id, business_id, source_id, source_type, destination_id, \
    destination_type, rail, amount, currency, notes, contact_id, payment_request_id, interest_id, \
    status, created_at, updated_at";

/// Postgres-backed money transfer records.
#[derive(Clone)]
pub struct PostgresTransferStore {
    pool: PgPool,
}

impl PostgresTransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransferStore for PostgresTransferStore {
    async fn insert(&self, transfer: &MoneyTransfer) -> RepositoryResult<MoneyTransfer> {
        let sql = format!(
            "INSERT INTO money_transfers ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {cols}",
            cols = COLUMNS
        );

        let row = sqlx::query_as::<_, TransferRow>(&sql)
            .bind(transfer.id)
            .bind(&transfer.bank_transfer_id)
            .bind(transfer.business_id)
            .bind(transfer.source.id)
            .bind(transfer.source.kind.as_str())
            .bind(transfer.destination.id)
            .bind(transfer.destination.kind.as_str())
            .bind(transfer.rail.as_str())
            .bind(&transfer.amount)
            .bind(&transfer.currency)
            .bind(&transfer.notes)
            .bind(transfer.context.contact_id())
            .bind(transfer.payment_request_id)
            .bind(transfer.interest_id)
            .bind(transfer.status.as_str())
            .bind(transfer.created_at)
            .bind(transfer.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    RepositoryError::Conflict(format!("transfer {}", transfer.bank_transfer_id))
                }
                other => RepositoryError::from(other),
            })?;

        row.into_domain()
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<MoneyTransfer>> {
        sqlx::query_as::<_, TransferRow>(&format!("SELECT {} FROM money_transfers WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TransferRow::into_domain)
            .transpose()
    }

    async fn get_by_bank_id(&self, bank_transfer_id: &str) -> RepositoryResult<Option<MoneyTransfer>> {
        sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {} FROM money_transfers WHERE bank_transfer_id = $1",
            COLUMNS
        ))
        .bind(bank_transfer_id)
        .fetch_optional(&self.pool)
        .await?
        .map(TransferRow::into_domain)
        .transpose()
    }

    async fn update_status(&self, id: Uuid, status: TransferStatus) -> RepositoryResult<MoneyTransfer> {
        sqlx::query_as::<_, TransferRow>(&format!(
            "UPDATE money_transfers SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("transfer {}", id)))?
        .into_domain()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    bank_transfer_id: String,
    business_id: Uuid,
    source_id: Uuid,
    source_type: String,
    destination_id: Uuid,
    destination_type: String,
    rail: String,
    amount: BigDecimal,
    currency: String,
    notes: Option<String>,
    contact_id: Option<Uuid>,
    payment_request_id: Option<Uuid>,
    interest_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(column: &str, value: &str) -> RepositoryError {
    RepositoryError::Corrupt(format!("money_transfers.{} has unknown value {:?}", column, value))
}

impl TransferRow {
    fn into_domain(self) -> RepositoryResult<MoneyTransfer> {
        let source_kind =
            EndpointType::parse(&self.source_type).ok_or_else(|| corrupt("source_type", &self.source_type))?;
        let destination_kind = EndpointType::parse(&self.destination_type)
            .ok_or_else(|| corrupt("destination_type", &self.destination_type))?;
        let rail = Rail::parse(&self.rail).ok_or_else(|| corrupt("rail", &self.rail))?;
        let status = TransferStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?;

        Ok(MoneyTransfer {
            id: self.id,
            bank_transfer_id: self.bank_transfer_id,
            business_id: self.business_id,
            source: EndpointRef {
                id: self.source_id,
                kind: source_kind,
            },
            destination: EndpointRef {
                id: self.destination_id,
                kind: destination_kind,
            },
            rail,
            amount: self.amount,
            currency: self.currency,
            notes: self.notes,
            context: RoutingContext::from_contact(self.contact_id),
            payment_request_id: self.payment_request_id,
            interest_id: self.interest_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
