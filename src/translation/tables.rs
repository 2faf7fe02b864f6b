//! Partner bank vocabulary, version 2 of the bank's transfer and transaction
//! APIs. Column values in the transaction tables use the internal labels;
//! only the webhook and dispatch payloads carry these codes.

use super::CodeTable;
use crate::domain::{TransactionStatus, TransactionSubtype, TransactionType, TransferStatus};

pub static TRANSFER_STATUSES: CodeTable<TransferStatus> = CodeTable::new(
    "transfer_status",
    &[
        (TransferStatus::InProcess, "PROCESSING"),
        (TransferStatus::Posted, "COMPLETED"),
        (TransferStatus::AgentReview, "REVIEW"),
        (TransferStatus::Canceled, "CANCELED"),
        (TransferStatus::BankError, "FAILED"),
    ],
    // Auto-declines are turned into errors by the dispatch path before they
    // reach the status table.
    &["AUTO_DECLINED"],
    &[],
    TransferStatus::Unspecified,
);

pub static TRANSACTION_STATUSES: CodeTable<TransactionStatus> = CodeTable::new(
    "transaction_status",
    &[
        (TransactionStatus::Authorized, "AUTHORIZED"),
        (TransactionStatus::AuthReversed, "AUTH_REVERSED"),
        (TransactionStatus::AuthExpired, "AUTH_EXPIRED"),
        (TransactionStatus::HoldSet, "HOLD_SET"),
        (TransactionStatus::HoldReleased, "HOLD_RELEASED"),
        (TransactionStatus::Validation, "VALIDATION"),
        (TransactionStatus::Review, "REVIEW"),
        (TransactionStatus::BankProcessing, "BANK_PROCESSING"),
        (TransactionStatus::Scheduled, "SCHEDULED"),
        (TransactionStatus::InProcess, "IN_PROCESS"),
        (TransactionStatus::Posted, "POSTED"),
        (TransactionStatus::Declined, "DECLINED"),
        (TransactionStatus::Canceled, "CANCELED"),
        (TransactionStatus::BankError, "ERROR"),
    ],
    &["RETURNED"],
    &[],
    TransactionStatus::Unspecified,
);

pub static TRANSACTION_CATEGORIES: CodeTable<TransactionType> = CodeTable::new(
    "transaction_category",
    &[
        (TransactionType::Ach, "ACH"),
        (TransactionType::Transfer, "TRANSFER"),
        (TransactionType::Deposit, "DEPOSIT"),
        (TransactionType::Purchase, "CARD_PURCHASE"),
        (TransactionType::Withdrawal, "ATM"),
        (TransactionType::Fee, "FEE"),
        (TransactionType::Interest, "INTEREST"),
        (TransactionType::Check, "CHECK"),
        (TransactionType::Refund, "REFUND"),
    ],
    &["WIRE"],
    &[TransactionType::Adjustment],
    TransactionType::Unspecified,
);

pub static TRANSACTION_SUBTYPES: CodeTable<TransactionSubtype> = CodeTable::new(
    "transaction_subtype",
    &[
        (TransactionSubtype::AchCredit, "ACH_CREDIT"),
        (TransactionSubtype::AchDebit, "ACH_DEBIT"),
        (TransactionSubtype::CardPushCredit, "DEBIT_PUSH_CREDIT"),
        (TransactionSubtype::CardPushDebit, "DEBIT_PUSH_DEBIT"),
        (TransactionSubtype::CardPullCredit, "DEBIT_PULL_CREDIT"),
        (TransactionSubtype::CardPullDebit, "DEBIT_PULL_DEBIT"),
        (TransactionSubtype::CheckCredit, "CHECK_CREDIT"),
        (TransactionSubtype::CheckDebit, "CHECK_DEBIT"),
        (TransactionSubtype::IntrabankCredit, "BOOK_CREDIT"),
        (TransactionSubtype::IntrabankDebit, "BOOK_DEBIT"),
        (TransactionSubtype::PurchaseDebit, "POS_DEBIT"),
        (TransactionSubtype::PurchaseReturnCredit, "POS_RETURN_CREDIT"),
        (TransactionSubtype::AtmWithdrawal, "ATM_DEBIT"),
        (TransactionSubtype::FeeDebit, "FEE_DEBIT"),
        (TransactionSubtype::InterestCredit, "INTEREST_CREDIT"),
    ],
    &["RTP_CREDIT", "WIRE_CREDIT", "WIRE_DEBIT"],
    &[],
    TransactionSubtype::Unspecified,
);
