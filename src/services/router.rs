use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    AccountUsage, BankAccount, CheckPayee, ContactSnapshot, EndpointRef, EndpointType, LinkedCard,
    MailingAddress, Party, PartyDetails, Rail, TransferRequest,
};
use crate::error::AppError;
use crate::ports::{AccountDirectory, ContactDirectory, PayeeStore};
use crate::validation::{require_id, validate_address};

/// Picks the rail for a source/destination pair.
///
/// `source_usage` is only consulted for account-to-account transfers, where
/// it separates a push from the business's own ledger from a pull out of a
/// linked account. An account-to-account pair without a usage has no rail.
pub fn resolve(
    source_type: EndpointType,
    destination_type: EndpointType,
    source_usage: Option<AccountUsage>,
) -> Result<Rail, AppError> {
    use EndpointType::*;

    let rail = match (source_type, destination_type, source_usage) {
        (Account, Account, Some(AccountUsage::Primary | AccountUsage::Clearing)) => Some(Rail::AchPush),
        (
            Account,
            Account,
            Some(AccountUsage::External | AccountUsage::Contact | AccountUsage::Merchant),
        ) => Some(Rail::AchPull),
        (Account, Card, _) => Some(Rail::DebitPush),
        (Account, Payee, _) => Some(Rail::Check),
        (Card, Account, _) => Some(Rail::DebitPull),
        _ => None,
    };

    rail.ok_or(AppError::UnsupportedRoute {
        from: source_type,
        to: destination_type,
    })
}

/// A transfer endpoint loaded from its directory.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEndpoint {
    Account(BankAccount),
    Card(LinkedCard),
    Payee(CheckPayee),
}

impl ResolvedEndpoint {
    pub fn kind(&self) -> EndpointType {
        match self {
            ResolvedEndpoint::Account(_) => EndpointType::Account,
            ResolvedEndpoint::Card(_) => EndpointType::Card,
            ResolvedEndpoint::Payee(_) => EndpointType::Payee,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ResolvedEndpoint::Account(account) => account.id,
            ResolvedEndpoint::Card(card) => card.id,
            ResolvedEndpoint::Payee(payee) => payee.id,
        }
    }

    pub fn business_id(&self) -> Uuid {
        match self {
            ResolvedEndpoint::Account(account) => account.business_id,
            ResolvedEndpoint::Card(card) => card.business_id,
            ResolvedEndpoint::Payee(payee) => payee.business_id,
        }
    }

    /// The account when this endpoint is one the bank keeps a ledger for.
    pub fn ledger_account(&self) -> Option<&BankAccount> {
        match self {
            ResolvedEndpoint::Account(account) if account.usage.is_ledger() => Some(account),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ResolvedEndpoint::Account(account) => &account.name,
            ResolvedEndpoint::Card(card) => &card.holder_name,
            ResolvedEndpoint::Payee(payee) => &payee.name,
        }
    }

    pub fn party(&self) -> Party {
        let details = match self {
            ResolvedEndpoint::Account(account) => PartyDetails::Account {
                bank_account_id: account.bank_account_id.clone(),
                name: account.name.clone(),
            },
            ResolvedEndpoint::Card(card) => PartyDetails::Card {
                bank_card_id: card.bank_card_id.clone(),
                holder_name: card.holder_name.clone(),
            },
            ResolvedEndpoint::Payee(payee) => PartyDetails::Payee {
                name: payee.name.clone(),
                address: payee.address.clone(),
            },
        };

        Party {
            endpoint: EndpointRef {
                id: self.id(),
                kind: self.kind(),
            },
            details,
        }
    }
}

/// Outcome of routing: the rail plus both loaded endpoints.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub rail: Rail,
    pub source: ResolvedEndpoint,
    pub destination: ResolvedEndpoint,
}

/// Loads transfer endpoints, checks ownership and decides the rail.
#[derive(Clone)]
pub struct TransferRouter {
    accounts: Arc<dyn AccountDirectory>,
    contacts: Arc<dyn ContactDirectory>,
    payees: Arc<dyn PayeeStore>,
}

impl TransferRouter {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        contacts: Arc<dyn ContactDirectory>,
        payees: Arc<dyn PayeeStore>,
    ) -> Self {
        Self {
            accounts,
            contacts,
            payees,
        }
    }

    /// The rail is decided from the source alone before the destination is
    /// loaded, so an unsupported pair never creates a payee.
    pub async fn route(&self, request: &TransferRequest) -> Result<RoutePlan, AppError> {
        if let Some(contact_id) = request.contact_id {
            self.contact(request.business_id, contact_id).await?;
        }

        let source_id = require_id("source_id", request.source_id)?;
        let source = self
            .load(request.business_id, source_id, request.source_type)
            .await?;

        let source_usage = match &source {
            ResolvedEndpoint::Account(account) => Some(account.usage),
            _ => None,
        };
        let rail = resolve(request.source_type, request.destination_type, source_usage)?;

        let destination = if rail == Rail::Check {
            ResolvedEndpoint::Payee(self.check_payee(request).await?)
        } else {
            let destination_id = require_id("destination_id", request.destination_id)?;
            self.load(request.business_id, destination_id, request.destination_type)
                .await?
        };

        tracing::debug!(
            business_id = %request.business_id,
            rail = %rail,
            source_id = %source.id(),
            destination_id = %destination.id(),
            "transfer routed"
        );

        Ok(RoutePlan {
            rail,
            source,
            destination,
        })
    }

    /// Reloads an endpoint recorded on a transfer.
    pub async fn load_endpoint(
        &self,
        business_id: Uuid,
        endpoint: &EndpointRef,
    ) -> Result<ResolvedEndpoint, AppError> {
        self.load(business_id, endpoint.id, endpoint.kind).await
    }

    async fn load(
        &self,
        business_id: Uuid,
        id: Uuid,
        kind: EndpointType,
    ) -> Result<ResolvedEndpoint, AppError> {
        let endpoint = match kind {
            EndpointType::Account => self.accounts.get_account(id).await?.map(ResolvedEndpoint::Account),
            EndpointType::Card => self.accounts.get_card(id).await?.map(ResolvedEndpoint::Card),
            EndpointType::Payee => self.payees.get_payee(id).await?.map(ResolvedEndpoint::Payee),
        }
        .ok_or_else(|| AppError::NotFound(format!("{} {}", kind, id)))?;

        if endpoint.business_id() != business_id {
            return Err(AppError::Unauthorized(format!(
                "{} {} belongs to another business",
                kind, id
            )));
        }

        Ok(endpoint)
    }

    /// Returns the payee for a check transfer. An explicit destination id is
    /// used as-is; otherwise the payee is looked up by contact and mailing
    /// address and created when missing.
    async fn check_payee(&self, request: &TransferRequest) -> Result<CheckPayee, AppError> {
        if let Some(destination_id) = request.destination_id {
            return match self
                .load(request.business_id, destination_id, EndpointType::Payee)
                .await?
            {
                ResolvedEndpoint::Payee(payee) => Ok(payee),
                _ => Err(AppError::Internal("payee lookup returned another endpoint".to_string())),
            };
        }

        let contact_id = require_id("contact_id", request.contact_id)?;
        let address = request
            .check_address
            .as_ref()
            .ok_or_else(|| AppError::Validation("check_address: required for a check".to_string()))?;
        validate_address(address)?;

        self.find_or_create_payee(request.business_id, contact_id, address)
            .await
    }

    async fn contact(&self, business_id: Uuid, contact_id: Uuid) -> Result<ContactSnapshot, AppError> {
        let contact = self
            .contacts
            .get_contact(contact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contact {}", contact_id)))?;
        if contact.business_id != business_id {
            return Err(AppError::Unauthorized(format!(
                "contact {} belongs to another business",
                contact_id
            )));
        }
        Ok(contact)
    }

    pub async fn find_or_create_payee(
        &self,
        business_id: Uuid,
        contact_id: Uuid,
        address: &MailingAddress,
    ) -> Result<CheckPayee, AppError> {
        if let Some(existing) = self
            .payees
            .find_by_address(business_id, contact_id, address)
            .await?
        {
            return Ok(existing);
        }

        let contact = self.contact(business_id, contact_id).await?;

        let payee = self
            .payees
            .create_payee(&CheckPayee::new(business_id, contact_id, contact.name, address.clone()))
            .await?;

        tracing::info!(
            business_id = %business_id,
            contact_id = %contact_id,
            payee_id = %payee.id,
            "created check payee"
        );

        Ok(payee)
    }
}
