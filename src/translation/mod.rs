//! Translation between the internal status/category/subtype vocabulary and
//! the partner bank's wire codes.
//!
//! Every table is total in both directions:
//! - a partner code the bank shares with us maps to exactly one internal value;
//! - a partner code only the bank knows maps to the internal `Unspecified`;
//! - an internal value the bank has no code for maps to [`PARTNER_UNSPECIFIED`];
//! - a partner code missing from the table is a [`TranslationGap`], never a
//!   silent default.

mod code_type;
mod tables;

pub use code_type::classify;
pub use tables::{
    TRANSACTION_CATEGORIES, TRANSACTION_STATUSES, TRANSACTION_SUBTYPES, TRANSFER_STATUSES,
};

use std::fmt::Debug;
use thiserror::Error;

use crate::domain::{TransactionStatus, TransactionSubtype, TransactionType, TransferStatus};

/// Partner-side sentinel for internal values the bank has no code for.
pub const PARTNER_UNSPECIFIED: &str = "UNSPECIFIED";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unmapped partner {table} code '{code}'")]
pub struct TranslationGap {
    pub table: &'static str,
    pub code: String,
}

/// One bidirectional mapping, stored as data.
pub struct CodeTable<T: 'static> {
    name: &'static str,
    shared: &'static [(T, &'static str)],
    partner_only: &'static [&'static str],
    internal_only: &'static [T],
    unspecified: T,
}

impl<T> CodeTable<T>
where
    T: Copy + PartialEq + Debug,
{
    pub const fn new(
        name: &'static str,
        shared: &'static [(T, &'static str)],
        partner_only: &'static [&'static str],
        internal_only: &'static [T],
        unspecified: T,
    ) -> Self {
        Self {
            name,
            shared,
            partner_only,
            internal_only,
            unspecified,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Codes both sides understand.
    pub fn shared(&self) -> &'static [(T, &'static str)] {
        self.shared
    }

    pub fn partner_only(&self) -> &'static [&'static str] {
        self.partner_only
    }

    pub fn internal_only(&self) -> &'static [T] {
        self.internal_only
    }

    pub fn unspecified(&self) -> T {
        self.unspecified
    }

    /// Partner code to internal value.
    pub fn to_internal(&self, code: &str) -> Result<T, TranslationGap> {
        let code = code.trim();
        if let Some((internal, _)) = self.shared.iter().find(|(_, partner)| *partner == code) {
            return Ok(*internal);
        }
        if code == PARTNER_UNSPECIFIED || self.partner_only.contains(&code) {
            tracing::debug!(table = self.name, code, "partner-only code mapped to unspecified");
            return Ok(self.unspecified);
        }
        tracing::warn!(table = self.name, code, "translation gap: partner code not in table");
        Err(TranslationGap {
            table: self.name,
            code: code.to_string(),
        })
    }

    /// Internal value to partner code.
    pub fn to_partner(&self, value: T) -> &'static str {
        self.shared
            .iter()
            .find(|(internal, _)| *internal == value)
            .map(|(_, partner)| *partner)
            .unwrap_or(PARTNER_UNSPECIFIED)
    }
}

pub fn transfer_status_to_internal(code: &str) -> Result<TransferStatus, TranslationGap> {
    TRANSFER_STATUSES.to_internal(code)
}

pub fn transfer_status_to_partner(status: TransferStatus) -> &'static str {
    TRANSFER_STATUSES.to_partner(status)
}

pub fn transaction_status_to_internal(code: &str) -> Result<TransactionStatus, TranslationGap> {
    TRANSACTION_STATUSES.to_internal(code)
}

pub fn transaction_status_to_partner(status: TransactionStatus) -> &'static str {
    TRANSACTION_STATUSES.to_partner(status)
}

pub fn category_to_internal(code: &str) -> Result<TransactionType, TranslationGap> {
    TRANSACTION_CATEGORIES.to_internal(code)
}

pub fn category_to_partner(category: TransactionType) -> &'static str {
    TRANSACTION_CATEGORIES.to_partner(category)
}

pub fn subtype_to_internal(code: &str) -> Result<TransactionSubtype, TranslationGap> {
    TRANSACTION_SUBTYPES.to_internal(code)
}

pub fn subtype_to_partner(subtype: TransactionSubtype) -> &'static str {
    TRANSACTION_SUBTYPES.to_partner(subtype)
}
