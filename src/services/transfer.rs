use std::sync::Arc;
use uuid::Uuid;

use crate::bank::{snapshot, BankBackend, BankError, TransferSnapshot};
use crate::domain::{
    BankTransferEvent, EndpointType, ExecuteRequest, MoneyTransfer, ReviewDecision,
    RoutingContext, TransferRequest, TransferStatus,
};
use crate::error::AppError;
use crate::ports::TransferStore;
use crate::services::lifecycle::LifecycleService;
use crate::services::router::{RoutePlan, TransferRouter};
use crate::services::validator::LimitValidator;
use crate::validation::{
    require_id, sanitize_string, validate_currency, validate_cvv, validate_notes,
    validate_positive_amount,
};

/// Submits transfer intents: validate, route, check limits, dispatch,
/// persist, and record the in-process ledger entries.
#[derive(Clone)]
pub struct TransferService {
    router: TransferRouter,
    validator: LimitValidator,
    backend: Arc<dyn BankBackend>,
    transfers: Arc<dyn TransferStore>,
    lifecycle: LifecycleService,
    decline_threshold: u32,
}

impl TransferService {
    pub fn new(
        router: TransferRouter,
        validator: LimitValidator,
        backend: Arc<dyn BankBackend>,
        transfers: Arc<dyn TransferStore>,
        lifecycle: LifecycleService,
        decline_threshold: u32,
    ) -> Self {
        Self {
            router,
            validator,
            backend,
            transfers,
            lifecycle,
            decline_threshold,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn submit(&self, request: TransferRequest) -> Result<MoneyTransfer, AppError> {
        validate_request(&request)?;

        let plan = self.router.route(&request).await?;
        let context = RoutingContext::from_contact(request.contact_id);
        self.validator
            .check(&plan.source, &plan.destination, &request.amount, context)
            .await?;

        let execute = build_execute_request(&request, &plan, context);
        let transfer = match self.backend.execute(&execute).await {
            Ok(transfer) => transfer,
            Err(e) => {
                tracing::warn!(
                    transfer_id = %execute.transfer_id,
                    backend = self.backend.name(),
                    rail = %plan.rail,
                    error = %e,
                    "transfer dispatch failed"
                );
                return Err(e.into());
            }
        };

        let stored = self.transfers.insert(&transfer).await.map_err(|e| {
            tracing::error!(
                transfer_id = %transfer.id,
                bank_transfer_id = %transfer.bank_transfer_id,
                error = %e,
                "bank accepted transfer but it could not be stored"
            );
            AppError::from(e)
        })?;

        tracing::info!(
            transfer_id = %stored.id,
            bank_transfer_id = %stored.bank_transfer_id,
            backend = self.backend.name(),
            rail = %stored.rail,
            status = %stored.status,
            "transfer dispatched"
        );

        if stored.status == TransferStatus::InProcess {
            self.lifecycle
                .record_dispatch(&stored, &plan.source, &plan.destination)
                .await?;
        }

        Ok(stored)
    }

    pub async fn get(&self, business_id: Uuid, id: Uuid) -> Result<MoneyTransfer, AppError> {
        let transfer = self
            .transfers
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transfer {}", id)))?;

        if transfer.business_id != business_id {
            return Err(AppError::Unauthorized(format!(
                "transfer {} belongs to another business",
                id
            )));
        }
        Ok(transfer)
    }

    /// Agent close-out of a transfer the bank flagged for review. If the bank
    /// declines an approval the transfer is settled as canceled and the
    /// bank's reason is returned as the error.
    pub async fn close_review(
        &self,
        business_id: Uuid,
        id: Uuid,
        decision: ReviewDecision,
    ) -> Result<MoneyTransfer, AppError> {
        let transfer = self.get(business_id, id).await?;
        if transfer.status != TransferStatus::AgentReview {
            return Err(AppError::Validation(format!(
                "transfer {} is {}, only transfers in review can be closed out",
                id, transfer.status
            )));
        }

        let snapshot = self
            .backend
            .update_transfer_status(&transfer.bank_transfer_id, decision.target_status())
            .await?;

        tracing::info!(
            transfer_id = %id,
            decision = ?decision,
            status = %snapshot.status,
            "review closed"
        );
        let decline = snapshot.decline.clone();
        let updated = self.apply_snapshot(transfer, snapshot).await?;
        match decline {
            Some(decline) => Err(BankError::from(decline).into()),
            None => Ok(updated),
        }
    }

    /// Re-reads a transfer from the bank and applies its current status.
    pub async fn sync_transfer(&self, id: Uuid) -> Result<MoneyTransfer, AppError> {
        let transfer = self
            .transfers
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transfer {}", id)))?;

        let snapshot = self.backend.get_transfer(&transfer.bank_transfer_id).await?;
        self.apply_snapshot(transfer, snapshot).await
    }

    /// Applies a `transfer.status` push from the bank.
    pub async fn apply_transfer_event(&self, event: &BankTransferEvent) -> Result<MoneyTransfer, AppError> {
        let snapshot = snapshot(
            event.transfer_id.clone(),
            &event.status,
            &event.failure_reasons,
            self.decline_threshold,
        )?;
        let transfer = self
            .transfers
            .get_by_bank_id(&event.transfer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bank transfer {}", event.transfer_id)))?;

        self.apply_snapshot(transfer, snapshot).await
    }

    async fn apply_snapshot(
        &self,
        transfer: MoneyTransfer,
        snapshot: TransferSnapshot,
    ) -> Result<MoneyTransfer, AppError> {
        if let Some(decline) = &snapshot.decline {
            tracing::warn!(
                transfer_id = %transfer.id,
                bank_transfer_id = %snapshot.bank_transfer_id,
                code = ?decline.code,
                reason = %decline.message,
                "bank declined transfer"
            );
        }
        self.apply_status(transfer, snapshot.status).await
    }

    async fn apply_status(
        &self,
        transfer: MoneyTransfer,
        status: TransferStatus,
    ) -> Result<MoneyTransfer, AppError> {
        if status == TransferStatus::Unspecified {
            tracing::warn!(
                transfer_id = %transfer.id,
                current = %transfer.status,
                "bank status has no internal meaning, keeping current status"
            );
            return Ok(transfer);
        }
        if transfer.status == status {
            tracing::debug!(transfer_id = %transfer.id, status = %status, "transfer status unchanged");
            return Ok(transfer);
        }
        if transfer.status.is_terminal() {
            tracing::warn!(
                transfer_id = %transfer.id,
                current = %transfer.status,
                received = %status,
                "ignoring status change on settled transfer"
            );
            return Ok(transfer);
        }

        let updated = self.transfers.update_status(transfer.id, status).await?;
        tracing::info!(
            transfer_id = %updated.id,
            from = %transfer.status,
            to = %status,
            "transfer status updated"
        );

        if status == TransferStatus::InProcess {
            let source = self
                .router
                .load_endpoint(updated.business_id, &updated.source)
                .await?;
            let destination = self
                .router
                .load_endpoint(updated.business_id, &updated.destination)
                .await?;
            self.lifecycle
                .record_dispatch(&updated, &source, &destination)
                .await?;
        }

        Ok(updated)
    }
}

/// Field checks that need no collaborator. Everything here fails before any
/// lookup or network call.
fn validate_request(request: &TransferRequest) -> Result<(), AppError> {
    require_id("source_id", request.source_id)?;
    if request.destination_type != EndpointType::Payee {
        require_id("destination_id", request.destination_id)?;
    }
    validate_positive_amount(&request.amount)?;
    validate_currency(&request.currency)?;
    validate_notes(request.notes.as_deref())?;
    if request.source_type == EndpointType::Card {
        validate_cvv(request.cvv.as_deref())?;
    }
    Ok(())
}

fn build_execute_request(
    request: &TransferRequest,
    plan: &RoutePlan,
    context: RoutingContext,
) -> ExecuteRequest {
    let cvv = match plan.source.kind() {
        EndpointType::Card => request.cvv.clone(),
        _ => None,
    };

    ExecuteRequest {
        transfer_id: Uuid::new_v4(),
        business_id: request.business_id,
        rail: plan.rail,
        source: plan.source.party(),
        destination: plan.destination.party(),
        amount: request.amount.clone(),
        currency: request.currency.trim().to_ascii_uppercase(),
        notes: request
            .notes
            .as_deref()
            .map(sanitize_string)
            .filter(|notes| !notes.is_empty()),
        context,
        payment_request_id: request.payment_request_id,
        interest_id: request.interest_id,
        cvv,
    }
}
