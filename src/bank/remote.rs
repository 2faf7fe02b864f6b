//! Backend that delegates execution to the internal transfer service.
//! The service fronts the same partner bank and answers in the partner's
//! status vocabulary, wrapped in its own envelope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::types::FailureReason;
use super::{normalize_outcome, snapshot, BankBackend, BankError, TransferSnapshot};
use crate::domain::{ExecuteRequest, MoneyTransfer, PartyDetails, Rail, TransferStatus};
use crate::translation::transfer_status_to_partner;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransferBody<'a> {
    reference_id: Uuid,
    business_id: Uuid,
    rail: Rail,
    amount: String,
    currency: &'a str,
    memo: Option<&'a str>,
    source: &'a PartyDetails,
    destination: &'a PartyDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    cvv: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTransfer {
    bank_transfer_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferEnvelope {
    transfer: RemoteTransfer,
    #[serde(default)]
    decline_reasons: Vec<FailureReason>,
}

#[derive(Clone)]
pub struct RemoteTransferClient {
    client: Client,
    base_url: String,
    decline_threshold: u32,
}

impl RemoteTransferClient {
    pub fn new(base_url: String, decline_threshold: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            decline_threshold,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/internal/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn read_envelope(&self, response: reqwest::Response, what: &str) -> Result<TransferEnvelope, BankError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BankError::TransferNotFound(what.to_string()));
        }
        if !response.status().is_success() {
            return Err(BankError::InvalidResponse(format!(
                "transfer service returned {} for {}",
                response.status(),
                what
            )));
        }
        Ok(response.json::<TransferEnvelope>().await?)
    }
}

#[async_trait]
impl BankBackend for RemoteTransferClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<MoneyTransfer, BankError> {
        let body = CreateTransferBody {
            reference_id: request.transfer_id,
            business_id: request.business_id,
            rail: request.rail,
            amount: request.amount.to_string(),
            currency: &request.currency,
            memo: request.notes.as_deref(),
            source: &request.source.details,
            destination: &request.destination.details,
            cvv: request.cvv.as_deref(),
        };

        let response = self.client.post(self.url("transfers")).json(&body).send().await?;
        let envelope = self.read_envelope(response, "create transfer").await?;

        tracing::info!(
            transfer_id = %request.transfer_id,
            bank_transfer_id = %envelope.transfer.bank_transfer_id,
            rail = %request.rail,
            status = %envelope.transfer.status,
            "transfer service answered transfer"
        );

        normalize_outcome(
            request,
            envelope.transfer.bank_transfer_id,
            &envelope.transfer.status,
            envelope.transfer.created_at,
            &envelope.decline_reasons,
            self.decline_threshold,
        )
    }

    async fn get_transfer(&self, bank_transfer_id: &str) -> Result<TransferSnapshot, BankError> {
        let response = self
            .client
            .get(self.url(&format!("transfers/{}", bank_transfer_id)))
            .send()
            .await?;
        let envelope = self.read_envelope(response, bank_transfer_id).await?;
        snapshot(
            envelope.transfer.bank_transfer_id,
            &envelope.transfer.status,
            &envelope.decline_reasons,
            self.decline_threshold,
        )
    }

    async fn update_transfer_status(
        &self,
        bank_transfer_id: &str,
        status: TransferStatus,
    ) -> Result<TransferSnapshot, BankError> {
        let response = self
            .client
            .post(self.url(&format!("transfers/{}/status", bank_transfer_id)))
            .json(&StatusBody {
                status: transfer_status_to_partner(status),
            })
            .send()
            .await?;
        let envelope = self.read_envelope(response, bank_transfer_id).await?;
        snapshot(
            envelope.transfer.bank_transfer_id,
            &envelope.transfer.status,
            &envelope.decline_reasons,
            self.decline_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = RemoteTransferClient::new("http://transfers.internal/".to_string(), 200);
        assert_eq!(client.url("transfers"), "http://transfers.internal/internal/v1/transfers");
    }

    #[test]
    fn test_envelope_without_reasons() {
        let envelope: TransferEnvelope = serde_json::from_str(
            r#"{"transfer":{"bankTransferId":"bt_7","status":"REVIEW","createdAt":"2024-05-01T12:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.transfer.bank_transfer_id, "bt_7");
        assert!(envelope.decline_reasons.is_empty());
    }
}
