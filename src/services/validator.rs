use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::domain::{AccountOrigin, RoutingContext};
use crate::error::AppError;
use crate::ports::AccountDirectory;
use crate::services::router::ResolvedEndpoint;

/// Funds and limit checks run before a transfer is dispatched.
#[derive(Clone)]
pub struct LimitValidator {
    accounts: Arc<dyn AccountDirectory>,
    aggregator_limit: BigDecimal,
}

impl LimitValidator {
    pub fn new(accounts: Arc<dyn AccountDirectory>, aggregator_limit: BigDecimal) -> Self {
        Self {
            accounts,
            aggregator_limit,
        }
    }

    pub fn aggregator_limit(&self) -> &BigDecimal {
        &self.aggregator_limit
    }

    pub async fn check(
        &self,
        source: &ResolvedEndpoint,
        destination: &ResolvedEndpoint,
        amount: &BigDecimal,
        context: RoutingContext,
    ) -> Result<(), AppError> {
        self.check_balance(source, amount).await?;
        self.check_aggregator_limit(source, destination, amount, context)
    }

    /// Cards are pulled, not drawn from a ledger, and external accounts have
    /// no balance at the partner bank; only ledger sources are checked.
    async fn check_balance(&self, source: &ResolvedEndpoint, amount: &BigDecimal) -> Result<(), AppError> {
        let account = match source {
            ResolvedEndpoint::Account(account) if account.usage.is_ledger() => account,
            _ => return Ok(()),
        };

        let available = self
            .accounts
            .posted_balance(account.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("balance for account {}", account.id)))?;

        if &available < amount {
            tracing::info!(
                account_id = %account.id,
                requested = %amount,
                available = %available,
                "transfer rejected for insufficient funds"
            );
            return Err(AppError::InsufficientFunds {
                requested: amount.clone(),
                available,
            });
        }

        Ok(())
    }

    fn check_aggregator_limit(
        &self,
        source: &ResolvedEndpoint,
        destination: &ResolvedEndpoint,
        amount: &BigDecimal,
        context: RoutingContext,
    ) -> Result<(), AppError> {
        if context.is_contact() {
            return Ok(());
        }

        let touches_aggregator = [source, destination].iter().any(|endpoint| {
            matches!(endpoint, ResolvedEndpoint::Account(account) if account.origin == AccountOrigin::Aggregator)
        });

        if touches_aggregator && amount > &self.aggregator_limit {
            tracing::info!(
                requested = %amount,
                limit = %self.aggregator_limit,
                "transfer rejected above aggregator limit"
            );
            return Err(AppError::LimitExceeded {
                requested: amount.clone(),
                limit: self.aggregator_limit.clone(),
            });
        }

        Ok(())
    }
}
