use bigdecimal::BigDecimal;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::{
    BankRecord, BankTransactionEvent, CodeType, Direction, MoneyTransfer, Partition, Rail,
    SideDetails, Transaction, TransactionLinks, TransactionStatus, TransactionSubtype,
    TransactionType,
};
use crate::error::AppError;
use crate::ports::{TransactionStore, TransferStore};
use crate::services::notifier::NotificationEmitter;
use crate::services::router::ResolvedEndpoint;
use crate::translation::{
    category_to_internal, classify, subtype_to_internal, transaction_status_to_internal,
};

/// Moves transactions between the pending, posted and declined partitions
/// as bank status events arrive.
#[derive(Clone)]
pub struct LifecycleService {
    transactions: Arc<dyn TransactionStore>,
    transfers: Arc<dyn TransferStore>,
    notifier: NotificationEmitter,
}

impl LifecycleService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        transfers: Arc<dyn TransferStore>,
        notifier: NotificationEmitter,
    ) -> Self {
        Self {
            transactions,
            transfers,
            notifier,
        }
    }

    pub async fn create_pending(
        &self,
        tx: Transaction,
        details: SideDetails,
    ) -> Result<Transaction, AppError> {
        if tx.partition != Partition::Pending {
            return Err(AppError::Validation(format!(
                "status {} does not belong to the pending partition",
                tx.bank.status
            )));
        }

        let stored = self.transactions.insert(&tx, &details).await?;
        self.notifier
            .on_transition(&stored, None, stored.bank.code_type)
            .await;
        Ok(stored)
    }

    /// Creates the in-process ledger entries for a transfer the bank has
    /// accepted: a debit on the source and a credit on the destination, each
    /// only when that side is a ledger account.
    pub async fn record_dispatch(
        &self,
        transfer: &MoneyTransfer,
        source: &ResolvedEndpoint,
        destination: &ResolvedEndpoint,
    ) -> Result<Vec<Transaction>, AppError> {
        let legs = [
            (source.ledger_account(), Direction::Debit, destination),
            (destination.ledger_account(), Direction::Credit, source),
        ];

        let mut created = Vec::new();
        for (account, direction, counterparty) in legs {
            let Some(account) = account else {
                continue;
            };

            if self
                .transactions
                .find_pending_for_transfer(transfer.id, account.id)
                .await?
                .is_some()
            {
                tracing::debug!(
                    transfer_id = %transfer.id,
                    account_id = %account.id,
                    "pending entry already recorded"
                );
                continue;
            }

            let (category, subtype) = rail_codes(transfer.rail, direction);
            let magnitude = transfer.amount.abs();
            let (amount, code_type, description) = match direction {
                Direction::Debit => (
                    -magnitude,
                    CodeType::DebitInProcess,
                    format!("{} TO {}", rail_label(transfer.rail), counterparty.display_name()),
                ),
                Direction::Credit => (
                    magnitude,
                    CodeType::CreditInProcess,
                    format!("{} FROM {}", rail_label(transfer.rail), counterparty.display_name()),
                ),
            };

            let tx = Transaction::new(
                transfer.business_id,
                BankRecord {
                    bank_transaction_id: None,
                    account_id: account.id,
                    status: TransactionStatus::InProcess,
                    category,
                    subtype,
                    code_type,
                    amount,
                    currency: transfer.currency.clone(),
                    description,
                    transaction_date: transfer.created_at,
                },
                TransactionLinks {
                    money_transfer_id: Some(transfer.id),
                    contact_id: transfer.contact_id(),
                    ..TransactionLinks::default()
                },
            );

            let stored = self
                .transactions
                .insert(&tx, &SideDetails::default())
                .await?;
            self.notifier
                .on_transition_with_request(&stored, None, code_type, transfer.payment_request_id)
                .await;

            tracing::info!(
                transfer_id = %transfer.id,
                transaction_id = %stored.id,
                account_id = %account.id,
                code_type = %code_type,
                "recorded in-process entry"
            );
            created.push(stored);
        }

        Ok(created)
    }

    /// Applies a bank status event and returns the partition the transaction
    /// ends up in. Terminal records never change: the same status again is a
    /// no-op and a different one is logged and ignored.
    pub async fn reclassify(&self, event: &BankTransactionEvent) -> Result<Partition, AppError> {
        let status = transaction_status_to_internal(&event.status)?;
        let category = category_to_internal(&event.category)?;
        let subtype = subtype_to_internal(&event.subtype)?;
        let code_type = classify(status, &event.amount, event.direction);

        let bank = BankRecord {
            bank_transaction_id: Some(event.transaction_id.clone()),
            account_id: event.account_id,
            status,
            category,
            subtype,
            code_type,
            amount: signed_amount(&event.amount, event.direction),
            currency: event.currency.clone(),
            description: event.description.clone(),
            transaction_date: event.occurred_at,
        };
        let details = SideDetails {
            card: event.card.clone(),
            hold: event.hold.clone(),
        };

        let Some(current) = self.find_existing(event).await? else {
            return self.insert_from_event(event, bank, details).await;
        };

        if current.business_id != event.business_id {
            tracing::warn!(
                transaction_id = %current.id,
                bank_transaction_id = %event.transaction_id,
                "bank event names another business"
            );
            return Err(AppError::Unauthorized(format!(
                "transaction {} belongs to another business",
                current.id
            )));
        }

        if current.partition != Partition::Pending {
            if current.bank.status == status {
                tracing::debug!(
                    transaction_id = %current.id,
                    status = %status,
                    "terminal status already applied"
                );
            } else {
                tracing::warn!(
                    transaction_id = %current.id,
                    current = %current.bank.status,
                    received = %status,
                    "ignoring status change on terminal transaction"
                );
            }
            return Ok(current.partition);
        }

        let previous = current.bank.code_type;
        let links = TransactionLinks {
            contact_id: current.links.contact_id.or(event.contact_id),
            ..current.links.clone()
        };

        if status.is_terminal() {
            let pending_id = current.id;
            let terminal = Transaction { links, ..current }.into_terminal(bank);
            let moved = self
                .transactions
                .move_to_terminal(pending_id, &terminal, &details)
                .await?;

            tracing::info!(
                pending_id = %pending_id,
                transaction_id = %moved.id,
                partition = %moved.partition,
                status = %status,
                "transaction reclassified"
            );
            return Ok(moved.partition);
        }

        let updated = Transaction {
            links,
            bank,
            updated_at: Utc::now(),
            ..current
        };
        self.transactions.update_pending(&updated, &details).await?;
        self.notifier
            .on_transition(&updated, Some(previous), code_type)
            .await;

        tracing::info!(
            transaction_id = %updated.id,
            status = %status,
            code_type = %code_type,
            "pending transaction updated"
        );
        Ok(Partition::Pending)
    }

    /// Matches by bank transaction id first, then adopts an engine-created
    /// pending entry for the same transfer and account.
    async fn find_existing(&self, event: &BankTransactionEvent) -> Result<Option<Transaction>, AppError> {
        if let Some(tx) = self
            .transactions
            .find_by_bank_id(&event.transaction_id)
            .await?
        {
            return Ok(Some(tx));
        }

        let Some(transfer) = self.transfer_for(event).await? else {
            return Ok(None);
        };

        let pending = self
            .transactions
            .find_pending_for_transfer(transfer.id, event.account_id)
            .await?;
        Ok(pending.filter(|tx| tx.bank.bank_transaction_id.is_none()))
    }

    async fn transfer_for(&self, event: &BankTransactionEvent) -> Result<Option<MoneyTransfer>, AppError> {
        match &event.transfer_id {
            Some(bank_transfer_id) => Ok(self.transfers.get_by_bank_id(bank_transfer_id).await?),
            None => Ok(None),
        }
    }

    async fn insert_from_event(
        &self,
        event: &BankTransactionEvent,
        bank: BankRecord,
        details: SideDetails,
    ) -> Result<Partition, AppError> {
        let money_transfer_id = self.transfer_for(event).await?.map(|t| t.id);
        let code_type = bank.code_type;
        let tx = Transaction::new(
            event.business_id,
            bank,
            TransactionLinks {
                money_transfer_id,
                contact_id: event.contact_id,
                ..TransactionLinks::default()
            },
        );

        let stored = self.transactions.insert(&tx, &details).await?;
        if stored.partition == Partition::Pending {
            self.notifier.on_transition(&stored, None, code_type).await;
        }

        tracing::info!(
            transaction_id = %stored.id,
            bank_transaction_id = %event.transaction_id,
            partition = %stored.partition,
            "transaction recorded from bank event"
        );
        Ok(stored.partition)
    }
}

/// An explicit direction decides the sign; otherwise the bank's sign stands.
fn signed_amount(amount: &BigDecimal, direction: Option<Direction>) -> BigDecimal {
    match direction {
        Some(Direction::Debit) => -amount.abs(),
        Some(Direction::Credit) => amount.abs(),
        None => amount.clone(),
    }
}

fn rail_codes(rail: Rail, direction: Direction) -> (TransactionType, TransactionSubtype) {
    use TransactionSubtype::*;

    let debit = direction == Direction::Debit;
    match rail {
        Rail::AchPush | Rail::AchPull => (TransactionType::Ach, if debit { AchDebit } else { AchCredit }),
        Rail::DebitPush => (
            TransactionType::Transfer,
            if debit { CardPushDebit } else { CardPushCredit },
        ),
        Rail::DebitPull => (
            TransactionType::Transfer,
            if debit { CardPullDebit } else { CardPullCredit },
        ),
        Rail::Check => (TransactionType::Check, if debit { CheckDebit } else { CheckCredit }),
    }
}

fn rail_label(rail: Rail) -> &'static str {
    match rail {
        Rail::AchPush | Rail::AchPull => "ACH",
        Rail::DebitPush => "CARD PUSH",
        Rail::DebitPull => "CARD PULL",
        Rail::Check => "CHECK",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_overrides_bank_sign() {
        let amount = BigDecimal::from(40);
        assert_eq!(signed_amount(&amount, Some(Direction::Debit)), BigDecimal::from(-40));
        assert_eq!(
            signed_amount(&BigDecimal::from(-40), Some(Direction::Credit)),
            BigDecimal::from(40)
        );
        assert_eq!(signed_amount(&BigDecimal::from(-40), None), BigDecimal::from(-40));
    }

    #[test]
    fn rail_codes_follow_direction() {
        assert_eq!(
            rail_codes(Rail::AchPush, Direction::Debit),
            (TransactionType::Ach, TransactionSubtype::AchDebit)
        );
        assert_eq!(
            rail_codes(Rail::DebitPull, Direction::Credit),
            (TransactionType::Transfer, TransactionSubtype::CardPullCredit)
        );
        assert_eq!(
            rail_codes(Rail::Check, Direction::Debit),
            (TransactionType::Check, TransactionSubtype::CheckDebit)
        );
    }
}
