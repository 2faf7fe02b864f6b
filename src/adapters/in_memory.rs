//! In-memory implementations of every port, plus a scripted bank backend.
//! Used by the service tests and the integration tests under `tests/`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::bank::{normalize_outcome, snapshot, BankBackend, BankError, FailureReason, TransferSnapshot};
use crate::domain::{
    BankAccount, CheckPayee, ContactSnapshot, ExecuteRequest, LinkedCard, MailingAddress,
    MoneyTransfer, Partition, SideDetails, Transaction, TransactionFilter, TransferStatus,
};
use crate::ports::{
    AccountDirectory, ContactDirectory, PayeeStore, RepositoryError, RepositoryResult,
    StoredTransaction, TransactionStore, TransferStore,
};
use crate::translation::transfer_status_to_partner;

/// Accounts, cards, balances and contacts.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    accounts: Arc<RwLock<HashMap<Uuid, BankAccount>>>,
    balances: Arc<RwLock<HashMap<Uuid, BigDecimal>>>,
    cards: Arc<RwLock<HashMap<Uuid, LinkedCard>>>,
    contacts: Arc<RwLock<HashMap<Uuid, ContactSnapshot>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, account: BankAccount, posted_balance: Option<BigDecimal>) {
        if let Some(balance) = posted_balance {
            self.balances.write().await.insert(account.id, balance);
        }
        self.accounts.write().await.insert(account.id, account);
    }

    pub async fn add_card(&self, card: LinkedCard) {
        self.cards.write().await.insert(card.id, card);
    }

    pub async fn add_contact(&self, contact: ContactSnapshot) {
        self.contacts.write().await.insert(contact.id, contact);
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<BankAccount>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn get_card(&self, id: Uuid) -> RepositoryResult<Option<LinkedCard>> {
        Ok(self.cards.read().await.get(&id).cloned())
    }

    async fn posted_balance(&self, account_id: Uuid) -> RepositoryResult<Option<BigDecimal>> {
        Ok(self.balances.read().await.get(&account_id).cloned())
    }
}

#[async_trait]
impl ContactDirectory for InMemoryDirectory {
    async fn get_contact(&self, id: Uuid) -> RepositoryResult<Option<ContactSnapshot>> {
        Ok(self.contacts.read().await.get(&id).cloned())
    }

    async fn search(&self, business_id: Uuid, text: &str) -> RepositoryResult<Vec<ContactSnapshot>> {
        let needle = text.to_lowercase();
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| c.business_id == business_id && c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPayeeStore {
    payees: Arc<RwLock<HashMap<Uuid, CheckPayee>>>,
}

impl InMemoryPayeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.payees.read().await.len()
    }
}

fn same_payee(payee: &CheckPayee, business_id: Uuid, contact_id: Uuid, key: &str) -> bool {
    payee.business_id == business_id && payee.contact_id == contact_id && payee.address.match_key() == key
}

#[async_trait]
impl PayeeStore for InMemoryPayeeStore {
    async fn get_payee(&self, id: Uuid) -> RepositoryResult<Option<CheckPayee>> {
        Ok(self.payees.read().await.get(&id).cloned())
    }

    async fn find_by_address(
        &self,
        business_id: Uuid,
        contact_id: Uuid,
        address: &MailingAddress,
    ) -> RepositoryResult<Option<CheckPayee>> {
        let key = address.match_key();
        Ok(self
            .payees
            .read()
            .await
            .values()
            .find(|p| same_payee(p, business_id, contact_id, &key))
            .cloned())
    }

    async fn create_payee(&self, payee: &CheckPayee) -> RepositoryResult<CheckPayee> {
        let key = payee.address.match_key();
        let mut payees = self.payees.write().await;
        if let Some(existing) = payees
            .values()
            .find(|p| same_payee(p, payee.business_id, payee.contact_id, &key))
        {
            return Ok(existing.clone());
        }
        payees.insert(payee.id, payee.clone());
        Ok(payee.clone())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTransferStore {
    transfers: Arc<RwLock<HashMap<Uuid, MoneyTransfer>>>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.transfers.read().await.len()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn insert(&self, transfer: &MoneyTransfer) -> RepositoryResult<MoneyTransfer> {
        let mut transfers = self.transfers.write().await;
        if transfers.contains_key(&transfer.id) {
            return Err(RepositoryError::Conflict(format!("transfer {}", transfer.id)));
        }
        transfers.insert(transfer.id, transfer.clone());
        Ok(transfer.clone())
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<MoneyTransfer>> {
        Ok(self.transfers.read().await.get(&id).cloned())
    }

    async fn get_by_bank_id(&self, bank_transfer_id: &str) -> RepositoryResult<Option<MoneyTransfer>> {
        Ok(self
            .transfers
            .read()
            .await
            .values()
            .find(|t| t.bank_transfer_id == bank_transfer_id)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: TransferStatus) -> RepositoryResult<MoneyTransfer> {
        let mut transfers = self.transfers.write().await;
        let transfer = transfers
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("transfer {}", id)))?;
        transfer.status = status;
        transfer.updated_at = Utc::now();
        Ok(transfer.clone())
    }
}

/// All three partitions in one map; the partition field says where a row
/// lives.
#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    rows: Arc<RwLock<HashMap<Uuid, StoredTransaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, partition: Partition) -> usize {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.transaction.partition == partition)
            .count()
    }

    pub async fn all(&self) -> Vec<StoredTransaction> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<Transaction> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&tx.id) {
            return Err(RepositoryError::Conflict(format!("transaction {}", tx.id)));
        }
        rows.insert(
            tx.id,
            StoredTransaction {
                transaction: tx.clone(),
                details: details.clone(),
            },
        );
        Ok(tx.clone())
    }

    async fn update_pending(&self, tx: &Transaction, details: &SideDetails) -> RepositoryResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&tx.id) {
            Some(row) if row.transaction.partition == Partition::Pending => {
                row.transaction = tx.clone();
                if details.card.is_some() {
                    row.details.card = details.card.clone();
                }
                if details.hold.is_some() {
                    row.details.hold = details.hold.clone();
                }
                Ok(())
            }
            _ => Err(RepositoryError::NotFound(format!("pending transaction {}", tx.id))),
        }
    }

    async fn move_to_terminal(
        &self,
        pending_id: Uuid,
        terminal: &Transaction,
        details: &SideDetails,
    ) -> RepositoryResult<Transaction> {
        let mut rows = self.rows.write().await;
        let pending = match rows.get(&pending_id) {
            Some(row) if row.transaction.partition == Partition::Pending => row.clone(),
            _ => {
                return Err(RepositoryError::NotFound(format!(
                    "pending transaction {}",
                    pending_id
                )))
            }
        };

        let mut merged = pending.details;
        if details.card.is_some() {
            merged.card = details.card.clone();
        }
        if details.hold.is_some() {
            merged.hold = details.hold.clone();
        }

        rows.remove(&pending_id);
        rows.insert(
            terminal.id,
            StoredTransaction {
                transaction: terminal.clone(),
                details: merged,
            },
        );
        Ok(terminal.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<StoredTransaction>> {
        let rows = self.rows.read().await;
        if let Some(row) = rows.get(&id) {
            return Ok(Some(row.clone()));
        }
        Ok(rows
            .values()
            .find(|row| row.transaction.pending_id == Some(id))
            .cloned())
    }

    async fn find_by_bank_id(&self, bank_transaction_id: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.transaction.bank.bank_transaction_id.as_deref() == Some(bank_transaction_id))
            .map(|row| row.transaction.clone()))
    }

    async fn find_pending_for_transfer(
        &self,
        money_transfer_id: Uuid,
        account_id: Uuid,
    ) -> RepositoryResult<Option<Transaction>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .map(|row| &row.transaction)
            .find(|tx| {
                tx.partition == Partition::Pending
                    && tx.links.money_transfer_id == Some(money_transfer_id)
                    && tx.bank.account_id == account_id
            })
            .cloned())
    }

    async fn list(&self, filter: &TransactionFilter) -> RepositoryResult<Vec<StoredTransaction>> {
        let mut rows: Vec<StoredTransaction> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| filter.matches(&row.transaction))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            b.transaction
                .bank
                .transaction_date
                .cmp(&a.transaction.bank.transaction_date)
                .then_with(|| b.transaction.id.cmp(&a.transaction.id))
        });

        Ok(rows
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }
}

/// What the scripted bank answers to the next execute call.
#[derive(Debug, Clone)]
pub struct ScriptedAnswer {
    pub status: String,
    pub failure_reasons: Vec<FailureReason>,
}

impl ScriptedAnswer {
    pub fn status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            failure_reasons: Vec::new(),
        }
    }

    pub fn declined(codes: &[(u32, &str)]) -> Self {
        Self {
            status: crate::bank::types::AUTO_DECLINED.to_string(),
            failure_reasons: codes
                .iter()
                .map(|(code, message)| FailureReason {
                    code: *code,
                    message: message.to_string(),
                })
                .collect(),
        }
    }
}

/// Bank backend that answers from a script and records every request.
/// Answers `PROCESSING` once the script runs out.
#[derive(Clone, Default)]
pub struct ScriptedBankBackend {
    script: Arc<Mutex<VecDeque<ScriptedAnswer>>>,
    update_script: Arc<Mutex<VecDeque<ScriptedAnswer>>>,
    executed: Arc<Mutex<Vec<ExecuteRequest>>>,
    statuses: Arc<RwLock<HashMap<String, ScriptedAnswer>>>,
    sequence: Arc<AtomicU64>,
    decline_threshold: u32,
}

impl ScriptedBankBackend {
    pub fn new(decline_threshold: u32) -> Self {
        Self {
            decline_threshold,
            ..Self::default()
        }
    }

    pub async fn push_answer(&self, answer: ScriptedAnswer) {
        self.script.lock().await.push_back(answer);
    }

    pub async fn executed(&self) -> Vec<ExecuteRequest> {
        self.executed.lock().await.clone()
    }

    /// Changes the status the bank reports for a transfer, as if it had
    /// moved on its own.
    pub async fn set_remote_status(&self, bank_transfer_id: &str, status: &str) {
        self.set_remote_answer(bank_transfer_id, ScriptedAnswer::status(status))
            .await;
    }

    pub async fn set_remote_answer(&self, bank_transfer_id: &str, answer: ScriptedAnswer) {
        self.statuses
            .write()
            .await
            .insert(bank_transfer_id.to_string(), answer);
    }

    /// Overrides what the bank answers to the next status update instead of
    /// accepting it.
    pub async fn push_update_answer(&self, answer: ScriptedAnswer) {
        self.update_script.lock().await.push_back(answer);
    }
}

#[async_trait]
impl BankBackend for ScriptedBankBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<MoneyTransfer, BankError> {
        self.executed.lock().await.push(request.clone());
        let answer = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedAnswer::status("PROCESSING"));

        let bank_transfer_id = format!("bt_{}", self.sequence.fetch_add(1, Ordering::SeqCst) + 1);
        self.statuses
            .write()
            .await
            .insert(bank_transfer_id.clone(), answer.clone());

        normalize_outcome(
            request,
            bank_transfer_id,
            &answer.status,
            Utc::now(),
            &answer.failure_reasons,
            self.decline_threshold,
        )
    }

    async fn get_transfer(&self, bank_transfer_id: &str) -> Result<TransferSnapshot, BankError> {
        let statuses = self.statuses.read().await;
        let answer = statuses
            .get(bank_transfer_id)
            .ok_or_else(|| BankError::TransferNotFound(bank_transfer_id.to_string()))?;
        snapshot(
            bank_transfer_id.to_string(),
            &answer.status,
            &answer.failure_reasons,
            self.decline_threshold,
        )
    }

    async fn update_transfer_status(
        &self,
        bank_transfer_id: &str,
        status: TransferStatus,
    ) -> Result<TransferSnapshot, BankError> {
        let mut statuses = self.statuses.write().await;
        let current = statuses
            .get_mut(bank_transfer_id)
            .ok_or_else(|| BankError::TransferNotFound(bank_transfer_id.to_string()))?;
        *current = self
            .update_script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedAnswer::status(transfer_status_to_partner(status)));

        snapshot(
            bank_transfer_id.to_string(),
            &current.status,
            &current.failure_reasons,
            self.decline_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BankRecord, CodeType, TransactionLinks, TransactionStatus, TransactionSubtype,
        TransactionType,
    };

    fn pending_tx(business_id: Uuid) -> Transaction {
        Transaction::new(
            business_id,
            BankRecord {
                bank_transaction_id: Some("btx-1".to_string()),
                account_id: Uuid::new_v4(),
                status: TransactionStatus::InProcess,
                category: TransactionType::Ach,
                subtype: TransactionSubtype::AchDebit,
                code_type: CodeType::DebitInProcess,
                amount: BigDecimal::from(-25),
                currency: "USD".to_string(),
                description: "ACH TO Vendor".to_string(),
                transaction_date: Utc::now(),
            },
            TransactionLinks::default(),
        )
    }

    #[tokio::test]
    async fn move_to_terminal_keeps_pending_reference() {
        let store = InMemoryTransactionStore::new();
        let pending = store
            .insert(&pending_tx(Uuid::new_v4()), &SideDetails::default())
            .await
            .unwrap();

        let mut bank = pending.bank.clone();
        bank.status = TransactionStatus::Posted;
        let terminal = pending.clone().into_terminal(bank);
        store
            .move_to_terminal(pending.id, &terminal, &SideDetails::default())
            .await
            .unwrap();

        assert_eq!(store.count(Partition::Pending).await, 0);
        assert_eq!(store.count(Partition::Posted).await, 1);
        let found = store.get_by_id(pending.id).await.unwrap().unwrap();
        assert_eq!(found.transaction.id, terminal.id);
        assert_eq!(found.transaction.pending_id, Some(pending.id));

        let again = store
            .move_to_terminal(pending.id, &terminal, &SideDetails::default())
            .await;
        assert!(matches!(again, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn payee_creation_is_idempotent_on_address() {
        let store = InMemoryPayeeStore::new();
        let business_id = Uuid::new_v4();
        let contact_id = Uuid::new_v4();
        let address = MailingAddress {
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        };

        let first = store
            .create_payee(&CheckPayee::new(business_id, contact_id, "Pat".to_string(), address.clone()))
            .await
            .unwrap();
        let mut shouting = address.clone();
        shouting.line1 = "1 MAIN ST ".to_string();
        let second = store
            .create_payee(&CheckPayee::new(business_id, contact_id, "Pat".to_string(), shouting))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn scripted_backend_follows_script() {
        let bank = ScriptedBankBackend::new(200);
        bank.push_answer(ScriptedAnswer::status("REVIEW")).await;

        let request = crate::bank::test_support::ach_push_request();
        let first = bank.execute(&request).await.unwrap();
        assert_eq!(first.status, TransferStatus::AgentReview);

        let second = bank.execute(&request).await.unwrap();
        assert_eq!(second.status, TransferStatus::InProcess);
        assert_eq!(bank.executed().await.len(), 2);

        let snapshot = bank
            .update_transfer_status(&first.bank_transfer_id, TransferStatus::Canceled)
            .await
            .unwrap();
        assert_eq!(snapshot.status, TransferStatus::Canceled);
        assert_eq!(
            bank.get_transfer(&first.bank_transfer_id).await.unwrap().status,
            TransferStatus::Canceled
        );
    }
}
