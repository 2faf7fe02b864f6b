//! Bank dispatch: one interface, two backends.
//!
//! [`PartnerBankClient`] talks to the partner bank's transfer API directly;
//! [`RemoteTransferClient`] delegates to the internal transfer service. Which
//! one a process uses is decided once when it is constructed.

pub mod client;
pub mod decline;
pub mod remote;
pub mod types;

pub use client::PartnerBankClient;
pub use decline::{decline, decline_error, select_decline_reason, Decline, DEFAULT_DECLINE_THRESHOLD};
pub use remote::RemoteTransferClient;
pub use types::FailureReason;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ExecuteRequest, MoneyTransfer, TransferStatus};
use crate::translation::{transfer_status_to_internal, TranslationGap};

#[derive(Error, Debug)]
pub enum BankError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Transfer declined: {message}")]
    Rejected { code: Option<u32>, message: String },
    #[error("Transfer not found at bank: {0}")]
    TransferNotFound(String),
    #[error("Invalid response from bank: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
    #[error(transparent)]
    Translation(#[from] TranslationGap),
}

/// Which backend executes transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Partner,
    Remote,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "partner" | "legacy" => Some(BackendKind::Partner),
            "remote" | "service" => Some(BackendKind::Remote),
            _ => None,
        }
    }
}

/// Current state of a transfer as the bank sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSnapshot {
    pub bank_transfer_id: String,
    pub status: TransferStatus,
    /// Set when the bank auto-declined the transfer.
    pub decline: Option<Decline>,
}

#[async_trait]
pub trait BankBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Executes the request on the rail it carries.
    async fn execute(&self, request: &ExecuteRequest) -> Result<MoneyTransfer, BankError>;

    async fn get_transfer(&self, bank_transfer_id: &str) -> Result<TransferSnapshot, BankError>;

    async fn update_transfer_status(
        &self,
        bank_transfer_id: &str,
        status: TransferStatus,
    ) -> Result<TransferSnapshot, BankError>;
}

/// Turns a bank answer into a [`MoneyTransfer`]. Both backends funnel their
/// responses through here so they agree on statuses and declines.
pub(crate) fn normalize_outcome(
    request: &ExecuteRequest,
    bank_transfer_id: String,
    status_code: &str,
    created_at: DateTime<Utc>,
    failure_reasons: &[FailureReason],
    decline_threshold: u32,
) -> Result<MoneyTransfer, BankError> {
    if status_code.trim() == types::AUTO_DECLINED {
        return Err(decline_error(failure_reasons, decline_threshold));
    }

    let status = transfer_status_to_internal(status_code)?;
    Ok(MoneyTransfer::from_dispatch(request, bank_transfer_id, status, created_at))
}

/// Reads the bank's status for a transfer that already exists. An
/// auto-decline settles it as canceled and keeps the selected reason.
pub fn snapshot(
    bank_transfer_id: String,
    status_code: &str,
    failure_reasons: &[FailureReason],
    decline_threshold: u32,
) -> Result<TransferSnapshot, BankError> {
    if status_code.trim() == types::AUTO_DECLINED {
        return Ok(TransferSnapshot {
            bank_transfer_id,
            status: TransferStatus::Canceled,
            decline: Some(decline(failure_reasons, decline_threshold)),
        });
    }

    Ok(TransferSnapshot {
        bank_transfer_id,
        status: transfer_status_to_internal(status_code)?,
        decline: None,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use crate::domain::{
        EndpointRef, EndpointType, ExecuteRequest, Party, PartyDetails, Rail, RoutingContext,
    };

    pub fn ach_push_request() -> ExecuteRequest {
        ExecuteRequest {
            transfer_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            rail: Rail::AchPush,
            source: Party {
                endpoint: EndpointRef {
                    id: Uuid::new_v4(),
                    kind: EndpointType::Account,
                },
                details: PartyDetails::Account {
                    bank_account_id: "acct_src".to_string(),
                    name: "Operating".to_string(),
                },
            },
            destination: Party {
                endpoint: EndpointRef {
                    id: Uuid::new_v4(),
                    kind: EndpointType::Account,
                },
                details: PartyDetails::Account {
                    bank_account_id: "acct_dst".to_string(),
                    name: "Vendor".to_string(),
                },
            },
            amount: BigDecimal::from(500),
            currency: "USD".to_string(),
            notes: Some("invoice 42".to_string()),
            context: RoutingContext::BusinessInternal,
            payment_request_id: None,
            interest_id: None,
            cvv: None,
        }
    }
}
