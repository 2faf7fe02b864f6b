//! Transaction domain entity.
//! Pending, posted and declined transactions share one shape; the partition
//! says which record set a transaction currently lives in.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::ContactSnapshot;

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.as_str() == value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Record set a transaction lives in.
    pub enum Partition {
        Pending => "pending",
        Posted => "posted",
        Declined => "declined",
    }
}

impl Partition {
    pub fn table_name(&self) -> &'static str {
        match self {
            Partition::Pending => "pending_transactions",
            Partition::Posted => "posted_transactions",
            Partition::Declined => "declined_transactions",
        }
    }
}

labelled_enum! {
    /// Internal transaction status as reported by the bank.
    pub enum TransactionStatus {
        Authorized => "authorized",
        AuthReversed => "authReversed",
        AuthExpired => "authExpired",
        HoldSet => "holdSet",
        HoldReleased => "holdReleased",
        Validation => "validation",
        Review => "review",
        BankProcessing => "bankProcessing",
        Scheduled => "scheduled",
        InProcess => "inProcess",
        Posted => "posted",
        Declined => "declined",
        Canceled => "canceled",
        BankError => "bankError",
        Unspecified => "unspecified",
    }
}

impl TransactionStatus {
    /// Partition a transaction with this status belongs in.
    pub fn partition(&self) -> Partition {
        match self {
            TransactionStatus::Posted => Partition::Posted,
            TransactionStatus::Declined
            | TransactionStatus::Canceled
            | TransactionStatus::BankError => Partition::Declined,
            _ => Partition::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.partition() != Partition::Pending
    }
}

labelled_enum! {
    /// Transaction category.
    pub enum TransactionType {
        Ach => "ach",
        Transfer => "transfer",
        Deposit => "deposit",
        Purchase => "purchase",
        Withdrawal => "withdrawal",
        Fee => "fee",
        Interest => "interest",
        Check => "check",
        Refund => "refund",
        Adjustment => "adjustment",
        Unspecified => "unspecified",
    }
}

labelled_enum! {
    /// Fine-grained rail and direction.
    pub enum TransactionSubtype {
        AchCredit => "achCredit",
        AchDebit => "achDebit",
        CardPushCredit => "cardPushCredit",
        CardPushDebit => "cardPushDebit",
        CardPullCredit => "cardPullCredit",
        CardPullDebit => "cardPullDebit",
        CheckCredit => "checkCredit",
        CheckDebit => "checkDebit",
        IntrabankCredit => "intrabankCredit",
        IntrabankDebit => "intrabankDebit",
        PurchaseDebit => "purchaseDebit",
        PurchaseReturnCredit => "purchaseReturnCredit",
        AtmWithdrawal => "atmWithdrawal",
        FeeDebit => "feeDebit",
        InterestCredit => "interestCredit",
        Unspecified => "unspecified",
    }
}

labelled_enum! {
    /// Lifecycle code attached to a transaction.
    pub enum CodeType {
        AuthApproved => "authApproved",
        AuthReversed => "authReversed",
        AuthExpired => "authExpired",
        HoldSet => "holdSet",
        HoldReleased => "holdReleased",
        ValidationPending => "validationPending",
        ReviewPending => "reviewPending",
        BankProcessing => "bankProcessing",
        Scheduled => "scheduled",
        DebitInProcess => "debitInProcess",
        CreditInProcess => "creditInProcess",
        DebitPosted => "debitPosted",
        CreditPosted => "creditPosted",
        Declined => "declined",
        Canceled => "canceled",
        BankError => "bankError",
        Unspecified => "unspecified",
    }
}

impl CodeType {
    pub fn is_in_process(&self) -> bool {
        matches!(self, CodeType::DebitInProcess | CodeType::CreditInProcess)
    }

    pub fn is_debit(&self) -> bool {
        matches!(self, CodeType::DebitInProcess | CodeType::DebitPosted)
    }
}

/// Explicit money direction when the bank supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Debit,
    Credit,
}

/// Bank-facing fields of a transaction, shared by every partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    pub bank_transaction_id: Option<String>,
    pub account_id: Uuid,
    pub status: TransactionStatus,
    pub category: TransactionType,
    pub subtype: TransactionSubtype,
    pub code_type: CodeType,
    /// Signed: negative leaves the account, positive enters it.
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}

/// References to records owned by other services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionLinks {
    pub money_transfer_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub dispute_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
}

/// A business transaction: the bank record plus business-side linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub partition: Partition,
    pub business_id: Uuid,
    /// Id the transaction had while pending, kept on posted/declined records.
    pub pending_id: Option<Uuid>,
    pub links: TransactionLinks,
    pub bank: BankRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(business_id: Uuid, bank: BankRecord, links: TransactionLinks) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            partition: bank.status.partition(),
            business_id,
            pending_id: None,
            links,
            bank,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this pending transaction as it will live in its terminal
    /// partition: fresh id, pending id carried as a cross-reference.
    pub fn into_terminal(self, bank: BankRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            partition: bank.status.partition(),
            pending_id: Some(self.id),
            bank,
            updated_at: now,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetail {
    pub card_id: Option<Uuid>,
    pub last4: String,
    pub merchant_name: Option<String>,
    pub merchant_category_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldDetail {
    pub hold_id: String,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Side records stored 1:1 with a transaction in their own tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideDetails {
    pub card: Option<CardDetail>,
    pub hold: Option<HoldDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayParties {
    pub source_display: Option<String>,
    pub destination_display: Option<String>,
}

/// Transaction as returned to callers, with side records joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub details: SideDetails,
    pub contact: Option<ContactSnapshot>,
    pub display: DisplayParties,
}
