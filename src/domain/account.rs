//! Parties a transfer can move money between.
//! Accounts, cards and check payees are owned by collaborator services; the
//! engine only needs the fields below to route, validate and dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a business account is used for. Drives the push/pull decision for
/// account-to-account transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountUsage {
    Primary,
    Clearing,
    External,
    Contact,
    Merchant,
}

impl AccountUsage {
    pub const ALL: [AccountUsage; 5] = [
        AccountUsage::Primary,
        AccountUsage::Clearing,
        AccountUsage::External,
        AccountUsage::Contact,
        AccountUsage::Merchant,
    ];

    /// Accounts held at the partner bank that carry a posted balance.
    pub fn is_ledger(&self) -> bool {
        matches!(self, AccountUsage::Primary | AccountUsage::Clearing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountUsage::Primary => "primary",
            AccountUsage::Clearing => "clearing",
            AccountUsage::External => "external",
            AccountUsage::Contact => "contact",
            AccountUsage::Merchant => "merchant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|usage| usage.as_str() == value)
    }
}

impl fmt::Display for AccountUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an account came to be known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOrigin {
    /// Opened at the partner bank.
    Bank,
    /// Linked through a third-party account-data aggregator.
    Aggregator,
    /// Entered by hand (routing + account number).
    Manual,
}

impl AccountOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountOrigin::Bank => "bank",
            AccountOrigin::Aggregator => "aggregator",
            AccountOrigin::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bank" => Some(AccountOrigin::Bank),
            "aggregator" => Some(AccountOrigin::Aggregator),
            "manual" => Some(AccountOrigin::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub business_id: Uuid,
    /// Identifier of the account on the partner bank side.
    pub bank_account_id: String,
    pub name: String,
    pub usage: AccountUsage,
    pub origin: AccountOrigin,
    pub contact_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedCard {
    pub id: Uuid,
    pub business_id: Uuid,
    /// Partner-side card token. The PAN never reaches this service.
    pub bank_card_id: String,
    pub last4: String,
    pub holder_name: String,
    pub contact_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl MailingAddress {
    /// Canonical form used to detect an existing payee for the same address.
    pub fn match_key(&self) -> String {
        let parts = [
            self.line1.as_str(),
            self.line2.as_deref().unwrap_or(""),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
        ];
        parts
            .iter()
            .map(|part| {
                part.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase()
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckPayee {
    pub id: Uuid,
    pub business_id: Uuid,
    pub contact_id: Uuid,
    pub name: String,
    pub address: MailingAddress,
}

impl CheckPayee {
    pub fn new(business_id: Uuid, contact_id: Uuid, name: String, address: MailingAddress) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_id,
            contact_id,
            name,
            address,
        }
    }
}

/// Read-only view of a business contact, joined onto transactions at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}
