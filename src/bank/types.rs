//! Request and response bodies of the partner bank transfer API (v2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{MailingAddress, Party, PartyDetails, Rail};

/// Partner status code for a transfer the bank refused outright.
pub const AUTO_DECLINED: &str = "AUTO_DECLINED";

pub use crate::domain::FailureReason;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerAddress {
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl From<&MailingAddress> for PartnerAddress {
    fn from(address: &MailingAddress) -> Self {
        Self {
            street1: address.line1.clone(),
            street2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip: address.postal_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerParty {
    Account { account_id: String, name: String },
    Card { card_token: String, name: String },
    Payee { name: String, address: PartnerAddress },
}

impl From<&Party> for PartnerParty {
    fn from(party: &Party) -> Self {
        match &party.details {
            PartyDetails::Account { bank_account_id, name } => PartnerParty::Account {
                account_id: bank_account_id.clone(),
                name: name.clone(),
            },
            PartyDetails::Card { bank_card_id, holder_name } => PartnerParty::Card {
                card_token: bank_card_id.clone(),
                name: holder_name.clone(),
            },
            PartyDetails::Payee { name, address } => PartnerParty::Payee {
                name: name.clone(),
                address: address.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerTransferRequest {
    pub reference_id: Uuid,
    pub amount: String,
    pub currency: String,
    pub memo: Option<String>,
    pub source: PartnerParty,
    pub destination: PartnerParty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerTransfer {
    pub id: String,
    pub reference_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub failure_reasons: Vec<FailureReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerStatusUpdate {
    pub status: String,
}

/// Execution endpoint for each rail.
pub fn rail_path(rail: Rail) -> &'static str {
    match rail {
        Rail::AchPush => "v2/transfers/ach/push",
        Rail::AchPull => "v2/transfers/ach/pull",
        Rail::DebitPush => "v2/transfers/debit/push",
        Rail::DebitPull => "v2/transfers/debit/pull",
        Rail::Check => "v2/transfers/checks",
    }
}
