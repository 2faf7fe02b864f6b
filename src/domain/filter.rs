use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::transaction::{Partition, Transaction};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Query over the transaction partitions of one business.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(skip)]
    pub business_id: Uuid,
    pub partition: Option<Partition>,
    pub account_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<BigDecimal>,
    pub max_amount: Option<BigDecimal>,
    pub search: Option<String>,
    /// Contacts whose name matched `search`, resolved before the store runs.
    #[serde(skip)]
    pub search_contact_ids: Vec<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub fn for_business(business_id: Uuid) -> Self {
        Self {
            business_id,
            ..Default::default()
        }
    }

    /// Bounds compare against absolute amounts; reversed bounds are swapped
    /// and a blank search is dropped.
    pub fn normalized(mut self) -> Self {
        self.min_amount = self.min_amount.map(|v| v.abs());
        self.max_amount = self.max_amount.map(|v| v.abs());
        if let (Some(min), Some(max)) = (&self.min_amount, &self.max_amount) {
            if min > max {
                std::mem::swap(&mut self.min_amount, &mut self.max_amount);
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                self.start_date = Some(end);
                self.end_date = Some(start);
            }
        }
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn partitions(&self) -> Vec<Partition> {
        match self.partition {
            Some(partition) => vec![partition],
            None => Partition::ALL.to_vec(),
        }
    }

    /// In-process evaluation of the filter, used by stores that cannot push
    /// it down to SQL.
    pub fn matches(&self, tx: &Transaction) -> bool {
        if tx.business_id != self.business_id {
            return false;
        }
        if !self.partitions().contains(&tx.partition) {
            return false;
        }
        if let Some(account_id) = self.account_id {
            if tx.bank.account_id != account_id {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if tx.bank.transaction_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if tx.bank.transaction_date > end {
                return false;
            }
        }
        let magnitude = tx.bank.amount.abs();
        if let Some(min) = &self.min_amount {
            if &magnitude < min {
                return false;
            }
        }
        if let Some(max) = &self.max_amount {
            if &magnitude > max {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_description = tx.bank.description.to_lowercase().contains(&needle);
            let in_subtype = tx.bank.subtype.as_str().to_lowercase().contains(&needle);
            let in_contact = tx
                .links
                .contact_id
                .map(|id| self.search_contact_ids.contains(&id))
                .unwrap_or(false);
            if !(in_description || in_subtype || in_contact) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn swaps_reversed_amount_bounds() {
        let filter = TransactionFilter {
            min_amount: Some(BigDecimal::from(500)),
            max_amount: Some(BigDecimal::from(100)),
            ..Default::default()
        }
        .normalized();

        assert_eq!(filter.min_amount, Some(BigDecimal::from(100)));
        assert_eq!(filter.max_amount, Some(BigDecimal::from(500)));
    }

    #[test]
    fn bounds_are_absolute() {
        let filter = TransactionFilter {
            min_amount: Some(BigDecimal::from_str("-20.5").unwrap()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(filter.min_amount, Some(BigDecimal::from_str("20.5").unwrap()));
    }

    #[test]
    fn blank_search_is_dropped() {
        let filter = TransactionFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(filter.search.is_none());
    }

    #[test]
    fn page_size_is_clamped() {
        let filter = TransactionFilter {
            limit: Some(10_000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
    }
}
