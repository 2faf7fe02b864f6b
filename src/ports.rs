//! Storage and collaborator ports.
//! Services depend on these traits only; `adapters` holds the Postgres and
//! in-memory implementations.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    BankAccount, CheckPayee, ContactSnapshot, LinkedCard, MailingAddress, MoneyTransfer,
    SideDetails, Transaction, TransactionFilter, TransferStatus,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A transaction with its 1:1 side records.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    pub transaction: Transaction,
    pub details: SideDetails,
}

/// Business accounts, linked accounts and linked cards, plus balance lookup.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<BankAccount>>;
    async fn get_card(&self, id: Uuid) -> RepositoryResult<Option<LinkedCard>>;
    /// Current posted balance; `None` when the bank keeps no ledger for it.
    async fn posted_balance(&self, account_id: Uuid) -> RepositoryResult<Option<BigDecimal>>;
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn get_contact(&self, id: Uuid) -> RepositoryResult<Option<ContactSnapshot>>;
    async fn search(&self, business_id: Uuid, text: &str) -> RepositoryResult<Vec<ContactSnapshot>>;
}

#[async_trait]
pub trait PayeeStore: Send + Sync {
    async fn get_payee(&self, id: Uuid) -> RepositoryResult<Option<CheckPayee>>;
    async fn find_by_address(
        &self,
        business_id: Uuid,
        contact_id: Uuid,
        address: &MailingAddress,
    ) -> RepositoryResult<Option<CheckPayee>>;
    /// Inserts the payee, or returns the one already stored for the same
    /// business, contact and address.
    async fn create_payee(&self, payee: &CheckPayee) -> RepositoryResult<CheckPayee>;
}

#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn insert(&self, transfer: &MoneyTransfer) -> RepositoryResult<MoneyTransfer>;
    async fn get(&self, id: Uuid) -> RepositoryResult<Option<MoneyTransfer>>;
    async fn get_by_bank_id(&self, bank_transfer_id: &str) -> RepositoryResult<Option<MoneyTransfer>>;
    async fn update_status(&self, id: Uuid, status: TransferStatus) -> RepositoryResult<MoneyTransfer>;
}

/// The three transaction partitions and their side tables.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts into the partition named by `tx.partition`.
    async fn insert(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<Transaction>;
    async fn update_pending(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<()>;
    /// Moves a pending record into its terminal partition in one unit: the
    /// terminal row is written, side records are re-keyed to it, any side
    /// records carried by the terminal event are upserted over them and the
    /// pending row is removed.
    async fn move_to_terminal(
        &self,
        pending_id: Uuid,
        terminal: &Transaction,
        details: &SideDetails,
    ) -> RepositoryResult<Transaction>;
    /// Looks up by id in every partition, falling back to the pending-id
    /// cross-reference on terminal records.
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<StoredTransaction>>;
    async fn find_by_bank_id(&self, bank_transaction_id: &str) -> RepositoryResult<Option<Transaction>>;
    async fn find_pending_for_transfer(
        &self,
        money_transfer_id: Uuid,
        account_id: Uuid,
    ) -> RepositoryResult<Option<Transaction>>;
    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<StoredTransaction>>;
}
