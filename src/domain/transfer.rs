//! Money transfer domain entity.
//! A single settlement instruction and its outcome at the partner bank.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::MailingAddress;

/// The only settlement currency supported.
pub const SUPPORTED_CURRENCY: &str = "USD";

/// Kind of party on either side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Account,
    Card,
    Payee,
}

impl EndpointType {
    pub const ALL: [EndpointType; 3] = [EndpointType::Account, EndpointType::Card, EndpointType::Payee];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Account => "account",
            EndpointType::Card => "card",
            EndpointType::Payee => "payee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EndpointType,
}

/// Settlement mechanism chosen for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rail {
    AchPush,
    AchPull,
    DebitPush,
    DebitPull,
    Check,
}

impl Rail {
    pub const ALL: [Rail; 5] = [
        Rail::AchPush,
        Rail::AchPull,
        Rail::DebitPush,
        Rail::DebitPull,
        Rail::Check,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rail::AchPush => "ach_push",
            Rail::AchPull => "ach_pull",
            Rail::DebitPush => "debit_push",
            Rail::DebitPull => "debit_pull",
            Rail::Check => "check",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rail| rail.as_str() == value)
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granular reason attached by the bank to an auto-declined transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub code: u32,
    pub message: String,
}

/// Internal money transfer status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    InProcess,
    Posted,
    AgentReview,
    Canceled,
    BankError,
    Unspecified,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 6] = [
        TransferStatus::InProcess,
        TransferStatus::Posted,
        TransferStatus::AgentReview,
        TransferStatus::Canceled,
        TransferStatus::BankError,
        TransferStatus::Unspecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::InProcess => "in_process",
            TransferStatus::Posted => "posted",
            TransferStatus::AgentReview => "agent_review",
            TransferStatus::Canceled => "canceled",
            TransferStatus::BankError => "bank_error",
            TransferStatus::Unspecified => "unspecified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Posted | TransferStatus::Canceled | TransferStatus::BankError
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the transfer is made on behalf of. Exactly one applies per transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutingContext {
    /// Peer payment to or from a business contact.
    Contact { contact_id: Uuid },
    /// Movement between the business's own accounts and cards.
    BusinessInternal,
}

impl RoutingContext {
    pub fn from_contact(contact_id: Option<Uuid>) -> Self {
        match contact_id {
            Some(contact_id) => RoutingContext::Contact { contact_id },
            None => RoutingContext::BusinessInternal,
        }
    }

    pub fn contact_id(&self) -> Option<Uuid> {
        match self {
            RoutingContext::Contact { contact_id } => Some(*contact_id),
            RoutingContext::BusinessInternal => None,
        }
    }

    pub fn is_contact(&self) -> bool {
        matches!(self, RoutingContext::Contact { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyTransfer {
    pub id: Uuid,
    pub bank_transfer_id: String,
    pub business_id: Uuid,
    pub source: EndpointRef,
    pub destination: EndpointRef,
    pub rail: Rail,
    pub amount: BigDecimal,
    pub currency: String,
    pub notes: Option<String>,
    pub context: RoutingContext,
    pub payment_request_id: Option<Uuid>,
    pub interest_id: Option<Uuid>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MoneyTransfer {
    /// Builds the domain record for a request the bank accepted. Both bank
    /// backends go through here so their results are populated the same way.
    pub fn from_dispatch(
        request: &ExecuteRequest,
        bank_transfer_id: String,
        status: TransferStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: request.transfer_id,
            bank_transfer_id,
            business_id: request.business_id,
            source: request.source.endpoint,
            destination: request.destination.endpoint,
            rail: request.rail,
            amount: request.amount.clone(),
            currency: request.currency.clone(),
            notes: request.notes.clone(),
            context: request.context,
            payment_request_id: request.payment_request_id,
            interest_id: request.interest_id,
            status,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn contact_id(&self) -> Option<Uuid> {
        self.context.contact_id()
    }
}

/// Agent decision on a transfer held for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    /// Status the transfer is moved to at the bank.
    pub fn target_status(&self) -> TransferStatus {
        match self {
            ReviewDecision::Approve => TransferStatus::InProcess,
            ReviewDecision::Reject => TransferStatus::Canceled,
        }
    }
}

/// Transfer intent as submitted by a caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub business_id: Uuid,
    pub source_id: Option<Uuid>,
    pub source_type: EndpointType,
    pub destination_id: Option<Uuid>,
    pub destination_type: EndpointType,
    /// Mailing address for a check when no payee id is given.
    pub check_address: Option<MailingAddress>,
    pub amount: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub notes: Option<String>,
    pub contact_id: Option<Uuid>,
    pub payment_request_id: Option<Uuid>,
    pub interest_id: Option<Uuid>,
    /// Card verification value, required when pulling from a card.
    pub cvv: Option<String>,
}

fn default_currency() -> String {
    SUPPORTED_CURRENCY.to_string()
}

/// Bank-side description of one party of an execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartyDetails {
    Account { bank_account_id: String, name: String },
    Card { bank_card_id: String, holder_name: String },
    Payee { name: String, address: MailingAddress },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub endpoint: EndpointRef,
    pub details: PartyDetails,
}

/// Fully resolved instruction handed to a bank backend.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub transfer_id: Uuid,
    pub business_id: Uuid,
    pub rail: Rail,
    pub source: Party,
    pub destination: Party,
    pub amount: BigDecimal,
    pub currency: String,
    pub notes: Option<String>,
    pub context: RoutingContext,
    pub payment_request_id: Option<Uuid>,
    pub interest_id: Option<Uuid>,
    pub cvv: Option<String>,
}
