//! Postgres implementation of TransactionStore.
//!
//! Each partition is its own table with the same column set; card and hold
//! details live in 1:1 side tables keyed by transaction id.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    BankRecord, CardDetail, CodeType, HoldDetail, Partition, SideDetails, Transaction,
    TransactionFilter, TransactionLinks, TransactionStatus, TransactionSubtype, TransactionType,
};
use crate::ports::{RepositoryError, RepositoryResult, StoredTransaction, TransactionStore};

const COLUMNS: &str = "id, business_id, pending_id, bank_transaction_id, account_id, status, \
    category, subtype, code_type, amount, currency, description, transaction_date, \
    money_transfer_id, contact_id, dispute_id, receipt_id, invoice_id, created_at, updated_at";

type DbTransaction<'c> = sqlx::Transaction<'c, Postgres>;

#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select_from(partition: Partition) -> String {
        format!(
            "SELECT '{}'::text AS partition, {} FROM {}",
            partition.as_str(),
            COLUMNS,
            partition.table_name()
        )
    }

    fn union_all() -> String {
        Partition::ALL
            .iter()
            .map(|p| Self::select_from(*p))
            .collect::<Vec<_>>()
            .join(" UNION ALL ")
    }

    async fn insert_row(db: &mut DbTransaction<'_>, tx: &Transaction) -> RepositoryResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
            tx.partition.table_name(),
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(tx.id)
            .bind(tx.business_id)
            .bind(tx.pending_id)
            .bind(&tx.bank.bank_transaction_id)
            .bind(tx.bank.account_id)
            .bind(tx.bank.status.as_str())
            .bind(tx.bank.category.as_str())
            .bind(tx.bank.subtype.as_str())
            .bind(tx.bank.code_type.as_str())
            .bind(&tx.bank.amount)
            .bind(&tx.bank.currency)
            .bind(&tx.bank.description)
            .bind(tx.bank.transaction_date)
            .bind(tx.links.money_transfer_id)
            .bind(tx.links.contact_id)
            .bind(tx.links.dispute_id)
            .bind(tx.links.receipt_id)
            .bind(tx.links.invoice_id)
            .bind(tx.created_at)
            .bind(tx.updated_at)
            .execute(&mut **db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    RepositoryError::Conflict(format!("transaction {}", tx.id))
                }
                other => RepositoryError::from(other),
            })?;

        Ok(())
    }

    async fn upsert_details(
        db: &mut DbTransaction<'_>,
        transaction_id: Uuid,
        details: &SideDetails,
    ) -> RepositoryResult<()> {
        if let Some(card) = &details.card {
            sqlx::query(
                r#"
                INSERT INTO card_transactions (transaction_id, card_id, last4, merchant_name, merchant_category_code)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (transaction_id) DO UPDATE SET
                    card_id = EXCLUDED.card_id,
                    last4 = EXCLUDED.last4,
                    merchant_name = EXCLUDED.merchant_name,
                    merchant_category_code = EXCLUDED.merchant_category_code
                "#,
            )
            .bind(transaction_id)
            .bind(card.card_id)
            .bind(&card.last4)
            .bind(&card.merchant_name)
            .bind(&card.merchant_category_code)
            .execute(&mut **db)
            .await?;
        }

        if let Some(hold) = &details.hold {
            sqlx::query(
                r#"
                INSERT INTO hold_transactions (transaction_id, hold_id, reason, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (transaction_id) DO UPDATE SET
                    hold_id = EXCLUDED.hold_id,
                    reason = EXCLUDED.reason,
                    expires_at = EXCLUDED.expires_at
                "#,
            )
            .bind(transaction_id)
            .bind(&hold.hold_id)
            .bind(&hold.reason)
            .bind(hold.expires_at)
            .execute(&mut **db)
            .await?;
        }

        Ok(())
    }

    /// Joins side records onto a set of rows.
    async fn with_details(&self, rows: Vec<TransactionRow>) -> RepositoryResult<Vec<StoredTransaction>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cards: HashMap<Uuid, CardDetail> = sqlx::query_as::<_, CardRow>(
            "SELECT transaction_id, card_id, last4, merchant_name, merchant_category_code \
             FROM card_transactions WHERE transaction_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CardRow::into_domain)
        .collect();

        let holds: HashMap<Uuid, HoldDetail> = sqlx::query_as::<_, HoldRow>(
            "SELECT transaction_id, hold_id, reason, expires_at \
             FROM hold_transactions WHERE transaction_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(HoldRow::into_domain)
        .collect();

        rows.into_iter()
            .map(|row| {
                let details = SideDetails {
                    card: cards.get(&row.id).cloned(),
                    hold: holds.get(&row.id).cloned(),
                };
                Ok(StoredTransaction {
                    transaction: row.into_domain()?,
                    details,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<Transaction> {
        let mut db = self.pool.begin().await?;
        Self::insert_row(&mut db, tx).await?;
        Self::upsert_details(&mut db, tx.id, details).await?;
        db.commit().await?;
        Ok(tx.clone())
    }

    async fn update_pending(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<()> {
        let mut db = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE pending_transactions SET
                bank_transaction_id = $2, status = $3, category = $4, subtype = $5,
                code_type = $6, amount = $7, currency = $8, description = $9,
                transaction_date = $10, contact_id = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(tx.id)
        .bind(&tx.bank.bank_transaction_id)
        .bind(tx.bank.status.as_str())
        .bind(tx.bank.category.as_str())
        .bind(tx.bank.subtype.as_str())
        .bind(tx.bank.code_type.as_str())
        .bind(&tx.bank.amount)
        .bind(&tx.bank.currency)
        .bind(&tx.bank.description)
        .bind(tx.bank.transaction_date)
        .bind(tx.links.contact_id)
        .bind(tx.updated_at)
        .execute(&mut *db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("pending transaction {}", tx.id)));
        }

        Self::upsert_details(&mut db, tx.id, details).await?;
        db.commit().await?;
        Ok(())
    }

    async fn move_to_terminal(
        &self,
        pending_id: Uuid,
        terminal: &Transaction,
        details: &SideDetails,
    ) -> RepositoryResult<Transaction> {
        if terminal.partition == Partition::Pending {
            return Err(RepositoryError::Conflict(format!(
                "transaction {} is not terminal",
                terminal.id
            )));
        }

        let mut db = self.pool.begin().await?;

        let removed: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM pending_transactions WHERE id = $1 RETURNING id")
                .bind(pending_id)
                .fetch_optional(&mut *db)
                .await?;
        if removed.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "pending transaction {}",
                pending_id
            )));
        }

        Self::insert_row(&mut db, terminal).await?;

        for table in ["card_transactions", "hold_transactions"] {
            sqlx::query(&format!(
                "UPDATE {} SET transaction_id = $1 WHERE transaction_id = $2",
                table
            ))
            .bind(terminal.id)
            .bind(pending_id)
            .execute(&mut *db)
            .await?;
        }
        Self::upsert_details(&mut db, terminal.id, details).await?;

        db.commit().await?;
        Ok(terminal.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<StoredTransaction>> {
        let sql = format!(
            "SELECT * FROM ({}) AS t WHERE id = $1 OR pending_id = $1 ORDER BY (id = $1) DESC LIMIT 1",
            Self::union_all()
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(self.with_details(rows).await?.into_iter().next())
    }

    async fn find_by_bank_id(&self, bank_transaction_id: &str) -> RepositoryResult<Option<Transaction>> {
        let sql = format!(
            "SELECT * FROM ({}) AS t WHERE bank_transaction_id = $1 LIMIT 1",
            Self::union_all()
        );
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(bank_transaction_id)
            .fetch_optional(&self.pool)
            .await?
            .map(TransactionRow::into_domain)
            .transpose()
    }

    async fn find_pending_for_transfer(
        &self,
        money_transfer_id: Uuid,
        account_id: Uuid,
    ) -> RepositoryResult<Option<Transaction>> {
        let sql = format!(
            "{} WHERE money_transfer_id = $1 AND account_id = $2 ORDER BY created_at LIMIT 1",
            Self::select_from(Partition::Pending)
        );
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(money_transfer_id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .map(TransactionRow::into_domain)
            .transpose()
    }

    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<StoredTransaction>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM (");

        for (i, partition) in filter.partitions().into_iter().enumerate() {
            if i > 0 {
                qb.push(" UNION ALL ");
            }
            qb.push(Self::select_from(partition));
            qb.push(" WHERE business_id = ");
            qb.push_bind(filter.business_id);

            if let Some(account_id) = filter.account_id {
                qb.push(" AND account_id = ").push_bind(account_id);
            }
            if let Some(start) = filter.start_date {
                qb.push(" AND transaction_date >= ").push_bind(start);
            }
            if let Some(end) = filter.end_date {
                qb.push(" AND transaction_date <= ").push_bind(end);
            }
            if let Some(min) = &filter.min_amount {
                qb.push(" AND ABS(amount) >= ").push_bind(min.clone());
            }
            if let Some(max) = &filter.max_amount {
                qb.push(" AND ABS(amount) <= ").push_bind(max.clone());
            }
            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", escape_like(search));
                qb.push(" AND (description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR subtype ILIKE ")
                    .push_bind(pattern)
                    .push(" OR contact_id = ANY(")
                    .push_bind(filter.search_contact_ids.clone())
                    .push("))");
            }
        }

        qb.push(") AS t ORDER BY transaction_date DESC, id DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = qb
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;

        self.with_details(rows).await
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn label<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> RepositoryResult<T> {
    parse(value).ok_or_else(|| RepositoryError::Corrupt(format!("{} has unknown value {:?}", column, value)))
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    partition: String,
    id: Uuid,
    business_id: Uuid,
    pending_id: Option<Uuid>,
    bank_transaction_id: Option<String>,
    account_id: Uuid,
    status: String,
    category: String,
    subtype: String,
    code_type: String,
    amount: BigDecimal,
    currency: String,
    description: String,
    transaction_date: DateTime<Utc>,
    money_transfer_id: Option<Uuid>,
    contact_id: Option<Uuid>,
    dispute_id: Option<Uuid>,
    receipt_id: Option<Uuid>,
    invoice_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            partition: label("partition", &self.partition, Partition::parse)?,
            business_id: self.business_id,
            pending_id: self.pending_id,
            links: TransactionLinks {
                money_transfer_id: self.money_transfer_id,
                contact_id: self.contact_id,
                dispute_id: self.dispute_id,
                receipt_id: self.receipt_id,
                invoice_id: self.invoice_id,
            },
            bank: BankRecord {
                bank_transaction_id: self.bank_transaction_id,
                account_id: self.account_id,
                status: label("status", &self.status, TransactionStatus::parse)?,
                category: label("category", &self.category, TransactionType::parse)?,
                subtype: label("subtype", &self.subtype, TransactionSubtype::parse)?,
                code_type: label("code_type", &self.code_type, CodeType::parse)?,
                amount: self.amount,
                currency: self.currency,
                description: self.description,
                transaction_date: self.transaction_date,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CardRow {
    transaction_id: Uuid,
    card_id: Option<Uuid>,
    last4: String,
    merchant_name: Option<String>,
    merchant_category_code: Option<String>,
}

impl CardRow {
    fn into_domain(self) -> (Uuid, CardDetail) {
        (
            self.transaction_id,
            CardDetail {
                card_id: self.card_id,
                last4: self.last4,
                merchant_name: self.merchant_name,
                merchant_category_code: self.merchant_category_code,
            },
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HoldRow {
    transaction_id: Uuid,
    hold_id: String,
    reason: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl HoldRow {
    fn into_domain(self) -> (Uuid, HoldDetail) {
        (
            self.transaction_id,
            HoldDetail {
                hold_id: self.hold_id,
                reason: self.reason,
                expires_at: self.expires_at,
            },
        )
    }
}
