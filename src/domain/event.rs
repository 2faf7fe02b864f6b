//! Events crossing the service boundary: status pushes from the partner bank
//! and the pending-transfer message published to the notification queue.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{CardDetail, CodeType, Direction, HoldDetail};
use super::transfer::FailureReason;

/// Status push received from the partner bank. Codes are kept in the bank's
/// own vocabulary until the translator has looked at them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BankEvent {
    #[serde(rename = "transaction.status")]
    Transaction(BankTransactionEvent),
    #[serde(rename = "transfer.status")]
    Transfer(BankTransferEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransactionEvent {
    pub transaction_id: String,
    /// Bank transfer this transaction settles, when it belongs to one.
    pub transfer_id: Option<String>,
    pub business_id: Uuid,
    pub account_id: Uuid,
    pub status: String,
    pub category: String,
    #[serde(rename = "type")]
    pub subtype: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub direction: Option<Direction>,
    #[serde(default)]
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub contact_id: Option<Uuid>,
    pub card: Option<CardDetail>,
    pub hold: Option<HoldDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransferEvent {
    pub transfer_id: String,
    pub status: String,
    /// Present when the bank auto-declined the transfer.
    #[serde(default)]
    pub failure_reasons: Vec<FailureReason>,
}

pub const PENDING_TRANSFER_EVENT_VERSION: &str = "v1";

/// Message published when a transaction enters an in-process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransferEvent {
    pub version: String,
    pub event_id: Uuid,
    /// Owning business.
    pub entity_id: Uuid,
    pub bank_name: String,
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    /// Ledger-facing sign: negative for debits.
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub code_type: CodeType,
    pub contact_id: Option<Uuid>,
    pub money_transfer_id: Option<Uuid>,
    pub money_request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_transaction_event() {
        let raw = serde_json::json!({
            "event_type": "transaction.status",
            "transaction_id": "btx-9",
            "transfer_id": null,
            "business_id": Uuid::nil(),
            "account_id": Uuid::nil(),
            "status": "POSTED",
            "category": "ACH",
            "type": "ACH_CREDIT",
            "amount": "12.00",
            "currency": "USD",
            "direction": "CREDIT",
            "description": "ACH CREDIT FROM ACME",
            "occurred_at": "2024-03-01T10:00:00Z",
            "contact_id": null,
            "card": null,
            "hold": null
        });

        match serde_json::from_value::<BankEvent>(raw).expect("decodes") {
            BankEvent::Transaction(event) => {
                assert_eq!(event.subtype, "ACH_CREDIT");
                assert_eq!(event.direction, Some(Direction::Credit));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn decodes_transfer_event() {
        let raw = r#"{"event_type":"transfer.status","transfer_id":"bt-1","status":"COMPLETED"}"#;
        let event: BankEvent = serde_json::from_str(raw).expect("decodes");
        assert!(matches!(event, BankEvent::Transfer(ref e) if e.status == "COMPLETED"));
    }

    #[test]
    fn decodes_transfer_decline_with_reasons() {
        let raw = r#"{"event_type":"transfer.status","transfer_id":"bt-2","status":"AUTO_DECLINED",
            "failure_reasons":[{"code":310,"message":"velocity limit"}]}"#;
        match serde_json::from_str::<BankEvent>(raw).expect("decodes") {
            BankEvent::Transfer(event) => {
                assert_eq!(event.failure_reasons.len(), 1);
                assert_eq!(event.failure_reasons[0].code, 310);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
