//! Postgres adapters for the collaborator data the engine reads: business
//! accounts and balances, linked cards, contacts and check payees.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    AccountOrigin, AccountUsage, BankAccount, CheckPayee, ContactSnapshot, LinkedCard,
    MailingAddress,
};
use crate::ports::{
    AccountDirectory, ContactDirectory, PayeeStore, RepositoryError, RepositoryResult,
};

#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PostgresDirectory {
    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<BankAccount>> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, business_id, bank_account_id, name, usage, origin, contact_id \
             FROM business_accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(AccountRow::into_domain)
        .transpose()
    }

    async fn get_card(&self, id: Uuid) -> RepositoryResult<Option<LinkedCard>> {
        let row = sqlx::query_as::<_, CardRow>(
            "SELECT id, business_id, bank_card_id, last4, holder_name, contact_id \
             FROM linked_cards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LinkedCard {
            id: r.id,
            business_id: r.business_id,
            bank_card_id: r.bank_card_id,
            last4: r.last4,
            holder_name: r.holder_name,
            contact_id: r.contact_id,
        }))
    }

    async fn posted_balance(&self, account_id: Uuid) -> RepositoryResult<Option<BigDecimal>> {
        let balance: Option<Option<BigDecimal>> =
            sqlx::query_scalar("SELECT posted_balance FROM business_accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(balance.flatten())
    }
}

#[async_trait]
impl ContactDirectory for PostgresDirectory {
    async fn get_contact(&self, id: Uuid) -> RepositoryResult<Option<ContactSnapshot>> {
        let row = sqlx::query_as::<_, ContactRow>("SELECT id, business_id, name, email FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ContactRow::into_domain))
    }

    async fn search(&self, business_id: Uuid, text: &str) -> RepositoryResult<Vec<ContactSnapshot>> {
        let rows = sqlx::query_as::<_, ContactRow>(
            "SELECT id, business_id, name, email FROM contacts \
             WHERE business_id = $1 AND name ILIKE '%' || $2 || '%' ORDER BY name LIMIT 100",
        )
        .bind(business_id)
        .bind(text)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ContactRow::into_domain).collect())
    }
}

#[async_trait]
impl PayeeStore for PostgresDirectory {
    async fn get_payee(&self, id: Uuid) -> RepositoryResult<Option<CheckPayee>> {
        let row = sqlx::query_as::<_, PayeeRow>(&format!("SELECT {} FROM check_payees WHERE id = $1", PAYEE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PayeeRow::into_domain))
    }

    async fn find_by_address(
        &self,
        business_id: Uuid,
        contact_id: Uuid,
        address: &MailingAddress,
    ) -> RepositoryResult<Option<CheckPayee>> {
        let row = sqlx::query_as::<_, PayeeRow>(&format!(
            "SELECT {} FROM check_payees WHERE business_id = $1 AND contact_id = $2 AND match_key = $3",
            PAYEE_COLUMNS
        ))
        .bind(business_id)
        .bind(contact_id)
        .bind(address.match_key())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PayeeRow::into_domain))
    }

    async fn create_payee(&self, payee: &CheckPayee) -> RepositoryResult<CheckPayee> {
        let inserted = sqlx::query_as::<_, PayeeRow>(&format!(
            "INSERT INTO check_payees \
             (id, business_id, contact_id, name, line1, line2, city, state, postal_code, match_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (business_id, contact_id, match_key) DO NOTHING \
             RETURNING {}",
            PAYEE_COLUMNS
        ))
        .bind(payee.id)
        .bind(payee.business_id)
        .bind(payee.contact_id)
        .bind(&payee.name)
        .bind(&payee.address.line1)
        .bind(&payee.address.line2)
        .bind(&payee.address.city)
        .bind(&payee.address.state)
        .bind(&payee.address.postal_code)
        .bind(payee.address.match_key())
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row.into_domain()),
            None => self
                .find_by_address(payee.business_id, payee.contact_id, &payee.address)
                .await?
                .ok_or_else(|| RepositoryError::Conflict(format!("check payee {}", payee.id))),
        }
    }
}

const PAYEE_COLUMNS: &str = "id, business_id, contact_id, name, line1, line2, city, state, postal_code";

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    business_id: Uuid,
    bank_account_id: String,
    name: String,
    usage: String,
    origin: String,
    contact_id: Option<Uuid>,
}

impl AccountRow {
    fn into_domain(self) -> RepositoryResult<BankAccount> {
        let usage = AccountUsage::parse(&self.usage)
            .ok_or_else(|| RepositoryError::Corrupt(format!("business_accounts.usage {:?}", self.usage)))?;
        let origin = AccountOrigin::parse(&self.origin)
            .ok_or_else(|| RepositoryError::Corrupt(format!("business_accounts.origin {:?}", self.origin)))?;

        Ok(BankAccount {
            id: self.id,
            business_id: self.business_id,
            bank_account_id: self.bank_account_id,
            name: self.name,
            usage,
            origin,
            contact_id: self.contact_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    business_id: Uuid,
    bank_card_id: String,
    last4: String,
    holder_name: String,
    contact_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    business_id: Uuid,
    name: String,
    email: Option<String>,
}

impl ContactRow {
    fn into_domain(self) -> ContactSnapshot {
        ContactSnapshot {
            id: self.id,
            business_id: self.business_id,
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PayeeRow {
    id: Uuid,
    business_id: Uuid,
    contact_id: Uuid,
    name: String,
    line1: String,
    line2: Option<String>,
    city: String,
    state: String,
    postal_code: String,
}

impl PayeeRow {
    fn into_domain(self) -> CheckPayee {
        CheckPayee {
            id: self.id,
            business_id: self.business_id,
            contact_id: self.contact_id,
            name: self.name,
            address: MailingAddress {
                line1: self.line1,
                line2: self.line2,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
            },
        }
    }
}
