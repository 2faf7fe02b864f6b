//! Pending-transfer notifications.
//!
//! A transaction entering debit- or credit-in-process publishes one
//! [`PendingTransferEvent`] to the notification queue. Publishing is
//! fire-and-forget: a failure is logged and never reaches the caller.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{CodeType, PendingTransferEvent, Transaction, PENDING_TRANSFER_EVENT_VERSION};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &PendingTransferEvent) -> anyhow::Result<()>;
}

/// Pushes JSON events onto a Redis list.
#[derive(Clone)]
pub struct RedisQueuePublisher {
    redis_client: redis::Client,
    queue: String,
}

impl RedisQueuePublisher {
    pub fn new(redis_url: &str, queue: impl Into<String>) -> anyhow::Result<Self> {
        let redis_client = redis::Client::open(redis_url)?;
        Ok(Self {
            redis_client,
            queue: queue.into(),
        })
    }
}

#[async_trait]
impl EventPublisher for RedisQueuePublisher {
    async fn publish(&self, event: &PendingTransferEvent) -> anyhow::Result<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(event)?;
        let _: i64 = conn.rpush(&self.queue, payload).await?;
        Ok(())
    }
}

/// Keeps published events in memory. Used in tests and when no queue is
/// configured.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    events: Arc<Mutex<Vec<PendingTransferEvent>>>,
    fail: bool,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn events(&self) -> Vec<PendingTransferEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, event: &PendingTransferEvent) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("queue unavailable");
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationEmitter {
    publisher: Arc<dyn EventPublisher>,
    bank_name: String,
}

impl NotificationEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>, bank_name: impl Into<String>) -> Self {
        Self {
            publisher,
            bank_name: bank_name.into(),
        }
    }

    /// Builds the event for `tx` when the move from `previous` to `current`
    /// enters an in-process code.
    pub fn event_for(
        &self,
        tx: &Transaction,
        previous: Option<CodeType>,
        current: CodeType,
    ) -> Option<PendingTransferEvent> {
        if !current.is_in_process() || previous == Some(current) {
            return None;
        }

        let magnitude = tx.bank.amount.abs();
        let amount = if current.is_debit() { -magnitude } else { magnitude };

        Some(PendingTransferEvent {
            version: PENDING_TRANSFER_EVENT_VERSION.to_string(),
            event_id: Uuid::new_v4(),
            entity_id: tx.business_id,
            bank_name: self.bank_name.clone(),
            account_id: tx.bank.account_id,
            transaction_id: tx.id,
            amount,
            currency: tx.bank.currency.clone(),
            status: tx.bank.status.as_str().to_string(),
            code_type: current,
            contact_id: tx.links.contact_id,
            money_transfer_id: tx.links.money_transfer_id,
            money_request_id: None,
            created_at: Utc::now(),
        })
    }

    pub async fn on_transition(&self, tx: &Transaction, previous: Option<CodeType>, current: CodeType) {
        self.on_transition_with_request(tx, previous, current, None).await
    }

    /// [`on_transition`](Self::on_transition) for transactions created from a
    /// transfer that answers a money request.
    pub async fn on_transition_with_request(
        &self,
        tx: &Transaction,
        previous: Option<CodeType>,
        current: CodeType,
        money_request_id: Option<Uuid>,
    ) {
        let Some(mut event) = self.event_for(tx, previous, current) else {
            return;
        };
        event.money_request_id = money_request_id;

        match self.publisher.publish(&event).await {
            Ok(()) => tracing::info!(
                transaction_id = %tx.id,
                account_id = %event.account_id,
                code_type = %current,
                amount = %event.amount,
                "published pending transfer event"
            ),
            Err(e) => tracing::error!(
                transaction_id = %tx.id,
                code_type = %current,
                error = %e,
                "failed to publish pending transfer event"
            ),
        }
    }
}
