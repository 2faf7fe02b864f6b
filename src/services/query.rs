use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    ContactSnapshot, DisplayParties, SideDetails, Transaction, TransactionFilter, TransactionView,
};
use crate::error::AppError;
use crate::ports::{AccountDirectory, ContactDirectory, StoredTransaction, TransactionStore};

/// Read side of the transaction partitions.
#[derive(Clone)]
pub struct TransactionQueryService {
    transactions: Arc<dyn TransactionStore>,
    accounts: Arc<dyn AccountDirectory>,
    contacts: Arc<dyn ContactDirectory>,
}

/// Per-request lookups, so a page of transactions for one account asks the
/// directories once.
#[derive(Default)]
struct LookupCache {
    accounts: HashMap<Uuid, Option<String>>,
    contacts: HashMap<Uuid, Option<ContactSnapshot>>,
}

impl TransactionQueryService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        accounts: Arc<dyn AccountDirectory>,
        contacts: Arc<dyn ContactDirectory>,
    ) -> Self {
        Self {
            transactions,
            accounts,
            contacts,
        }
    }

    pub async fn list(&self, filter: TransactionFilter) -> Result<Vec<TransactionView>, AppError> {
        let mut filter = filter.normalized();
        if let Some(text) = &filter.search {
            filter.search_contact_ids = self
                .contacts
                .search(filter.business_id, text)
                .await?
                .into_iter()
                .map(|contact| contact.id)
                .collect();
        }

        let rows = self.transactions.list(&filter).await?;
        tracing::debug!(
            business_id = %filter.business_id,
            rows = rows.len(),
            "listed transactions"
        );

        let mut cache = LookupCache::default();
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(self.view(row, &mut cache).await?);
        }
        Ok(views)
    }

    /// Fetches by id; a pending id also finds the record it became.
    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<TransactionView, AppError> {
        let stored = self
            .transactions
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", id)))?;

        if stored.transaction.business_id != business_id {
            return Err(AppError::Unauthorized(format!(
                "transaction {} belongs to another business",
                id
            )));
        }

        self.view(stored, &mut LookupCache::default()).await
    }

    /// Operator lookup without the business scope.
    pub async fn find(&self, id: Uuid) -> Result<Option<TransactionView>, AppError> {
        match self.transactions.get_by_id(id).await? {
            Some(stored) => Ok(Some(self.view(stored, &mut LookupCache::default()).await?)),
            None => Ok(None),
        }
    }

    async fn view(&self, stored: StoredTransaction, cache: &mut LookupCache) -> Result<TransactionView, AppError> {
        let StoredTransaction {
            transaction,
            details,
        } = stored;

        let account_id = transaction.bank.account_id;
        if !cache.accounts.contains_key(&account_id) {
            let name = self
                .accounts
                .get_account(account_id)
                .await?
                .map(|account| account.name);
            cache.accounts.insert(account_id, name);
        }

        let contact = match transaction.links.contact_id {
            Some(contact_id) => {
                if !cache.contacts.contains_key(&contact_id) {
                    let found = self.contacts.get_contact(contact_id).await?;
                    cache.contacts.insert(contact_id, found);
                }
                cache.contacts.get(&contact_id).cloned().flatten()
            }
            None => None,
        };

        let account_name = cache.accounts.get(&account_id).cloned().flatten();
        let display = display_parties(
            &transaction,
            &details,
            account_name.as_deref(),
            contact.as_ref().map(|c| c.name.as_str()),
        );

        Ok(TransactionView {
            transaction,
            details,
            contact,
            display,
        })
    }
}

/// Human-readable parties. The bank description wins (`... FROM x`,
/// `... TO x`), then the card merchant, then the account and contact names
/// placed by the sign of the amount.
pub fn display_parties(
    tx: &Transaction,
    details: &SideDetails,
    account_name: Option<&str>,
    contact_name: Option<&str>,
) -> DisplayParties {
    let description = tx.bank.description.as_str();
    let is_debit = tx.bank.amount < BigDecimal::from(0);
    let mut source = counterparty_after(description, " FROM ");
    let mut destination = counterparty_after(description, " TO ");

    if destination.is_none() {
        destination = details
            .card
            .as_ref()
            .and_then(|card| card.merchant_name.clone())
            .filter(|_| is_debit);
    }

    let (own_side, other_side) = if is_debit {
        (&mut source, &mut destination)
    } else {
        (&mut destination, &mut source)
    };
    if own_side.is_none() {
        *own_side = account_name.map(str::to_string);
    }
    if other_side.is_none() {
        *other_side = contact_name.map(str::to_string);
    }

    DisplayParties {
        source_display: source,
        destination_display: destination,
    }
}

/// Text following `marker`, up to the next FROM/TO marker.
fn counterparty_after(description: &str, marker: &str) -> Option<String> {
    let padded = format!(" {}", description);
    let upper = padded.to_ascii_uppercase();
    let start = upper.find(marker)? + marker.len();

    let rest = &padded[start..];
    let rest_upper = &upper[start..];
    let end = [" FROM ", " TO "]
        .iter()
        .filter_map(|next| rest_upper.find(next))
        .min()
        .unwrap_or(rest.len());

    let name = rest[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
