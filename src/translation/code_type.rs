use bigdecimal::BigDecimal;

use crate::domain::{CodeType, Direction, TransactionStatus};

/// Derives the lifecycle code of a transaction.
///
/// Posted and in-process statuses are direction-driven: the bank's explicit
/// direction wins, otherwise a negative amount is a debit. Every other
/// non-terminal status picks its pending code from the status alone, whatever
/// the sign of the amount.
pub fn classify(status: TransactionStatus, amount: &BigDecimal, direction: Option<Direction>) -> CodeType {
    let is_debit = || match direction {
        Some(Direction::Debit) => true,
        Some(Direction::Credit) => false,
        None => amount < &BigDecimal::from(0),
    };

    match status {
        TransactionStatus::Posted => {
            if is_debit() {
                CodeType::DebitPosted
            } else {
                CodeType::CreditPosted
            }
        }
        TransactionStatus::InProcess => {
            if is_debit() {
                CodeType::DebitInProcess
            } else {
                CodeType::CreditInProcess
            }
        }
        TransactionStatus::Authorized => CodeType::AuthApproved,
        TransactionStatus::AuthReversed => CodeType::AuthReversed,
        TransactionStatus::AuthExpired => CodeType::AuthExpired,
        TransactionStatus::HoldSet => CodeType::HoldSet,
        TransactionStatus::HoldReleased => CodeType::HoldReleased,
        TransactionStatus::Validation => CodeType::ValidationPending,
        TransactionStatus::Review => CodeType::ReviewPending,
        TransactionStatus::BankProcessing => CodeType::BankProcessing,
        TransactionStatus::Scheduled => CodeType::Scheduled,
        TransactionStatus::Declined => CodeType::Declined,
        TransactionStatus::Canceled => CodeType::Canceled,
        TransactionStatus::BankError => CodeType::BankError,
        TransactionStatus::Unspecified => CodeType::Unspecified,
    }
}
