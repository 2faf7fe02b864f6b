use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::types::{rail_path, PartnerStatusUpdate, PartnerTransfer, PartnerTransferRequest};
use super::{normalize_outcome, snapshot, BankBackend, BankError, TransferSnapshot};
use crate::domain::{ExecuteRequest, MoneyTransfer, TransferStatus};
use crate::translation::transfer_status_to_partner;

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// HTTP client for the partner bank's transfer API.
#[derive(Clone)]
pub struct PartnerBankClient {
    client: Client,
    base_url: String,
    api_key: String,
    decline_threshold: u32,
    circuit_breaker: Breaker,
}

impl PartnerBankClient {
    /// Creates a new PartnerBankClient with the default circuit breaker
    pub fn new(base_url: String, api_key: String, decline_threshold: u32) -> Self {
        Self::with_circuit_breaker(base_url, api_key, decline_threshold, 3, 60)
    }

    /// Creates a new PartnerBankClient with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        api_key: String,
        decline_threshold: u32,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        PartnerBankClient {
            client,
            base_url,
            api_key,
            decline_threshold,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<B, T>(&self, method: Method, path: String, body: Option<&B>) -> Result<T, BankError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(&path);
        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let result = self
            .circuit_breaker
            .call(async move {
                let response = builder.send().await?;

                if response.status() == StatusCode::NOT_FOUND {
                    return Err(BankError::TransferNotFound(path));
                }
                if !response.status().is_success() {
                    return Err(BankError::InvalidResponse(format!(
                        "{} returned {}",
                        path,
                        response.status()
                    )));
                }

                Ok(response.json::<T>().await?)
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(BankError::CircuitBreakerOpen(
                "Partner bank circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[async_trait]
impl BankBackend for PartnerBankClient {
    fn name(&self) -> &'static str {
        "partner"
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<MoneyTransfer, BankError> {
        let body = PartnerTransferRequest {
            reference_id: request.transfer_id,
            amount: request.amount.to_string(),
            currency: request.currency.clone(),
            memo: request.notes.clone(),
            source: (&request.source).into(),
            destination: (&request.destination).into(),
            cvv: request.cvv.clone(),
        };

        let response: PartnerTransfer = self
            .send(Method::POST, rail_path(request.rail).to_string(), Some(&body))
            .await?;

        tracing::info!(
            transfer_id = %request.transfer_id,
            bank_transfer_id = %response.id,
            rail = %request.rail,
            status = %response.status,
            "partner bank answered transfer"
        );

        normalize_outcome(
            request,
            response.id,
            &response.status,
            response.created_at,
            &response.failure_reasons,
            self.decline_threshold,
        )
    }

    async fn get_transfer(&self, bank_transfer_id: &str) -> Result<TransferSnapshot, BankError> {
        let response: PartnerTransfer = self
            .send::<(), _>(Method::GET, format!("v2/transfers/{}", bank_transfer_id), None)
            .await?;
        snapshot(
            response.id,
            &response.status,
            &response.failure_reasons,
            self.decline_threshold,
        )
    }

    async fn update_transfer_status(
        &self,
        bank_transfer_id: &str,
        status: TransferStatus,
    ) -> Result<TransferSnapshot, BankError> {
        let body = PartnerStatusUpdate {
            status: transfer_status_to_partner(status).to_string(),
        };
        let response: PartnerTransfer = self
            .send(
                Method::PATCH,
                format!("v2/transfers/{}", bank_transfer_id),
                Some(&body),
            )
            .await?;
        snapshot(
            response.id,
            &response.status,
            &response.failure_reasons,
            self.decline_threshold,
        )
    }
}
