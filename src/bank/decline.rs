//! Choosing the user-visible reason for an auto-declined transfer.
//!
//! The bank attaches every rule that fired. Codes at or below the severity
//! threshold are informational; among the rest the lowest code is the most
//! specific one and is the one shown to the user, wherever it sits in the list.

use super::types::FailureReason;
use super::BankError;

pub const DEFAULT_DECLINE_THRESHOLD: u32 = 200;

const GENERIC_DECLINE_MESSAGE: &str = "Transfer was declined by the bank";

pub fn select_decline_reason(reasons: &[FailureReason], threshold: u32) -> Option<&FailureReason> {
    reasons
        .iter()
        .filter(|reason| reason.code > threshold)
        .min_by_key(|reason| reason.code)
}

/// What the user is told about an auto-declined transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decline {
    pub code: Option<u32>,
    pub message: String,
}

impl From<Decline> for BankError {
    fn from(decline: Decline) -> Self {
        BankError::Rejected {
            code: decline.code,
            message: decline.message,
        }
    }
}

pub fn decline(reasons: &[FailureReason], threshold: u32) -> Decline {
    match select_decline_reason(reasons, threshold) {
        Some(reason) => Decline {
            code: Some(reason.code),
            message: reason.message.clone(),
        },
        None => {
            tracing::warn!(
                reason_count = reasons.len(),
                threshold,
                "auto-decline carried no reason above threshold"
            );
            Decline {
                code: None,
                message: GENERIC_DECLINE_MESSAGE.to_string(),
            }
        }
    }
}

/// Error for an auto-declined transfer.
pub fn decline_error(reasons: &[FailureReason], threshold: u32) -> BankError {
    decline(reasons, threshold).into()
}
