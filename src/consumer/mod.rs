//! Purchase Event Consumer
//!
//! Background task that drains purchase-completed messages into the
//! library projection. A message is acknowledged once it has been projected
//! or found unreadable; projection failures stay on the queue for redelivery.

pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::PurchaseCompletedEvent;
use crate::projection::{LibraryProjection, ProjectionOutcome};

pub use queue::{InMemoryQueue, MessageQueue, PgMessageQueue, QueueError, QueueMessage};

/// What happened to a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// A new library entry was written and the message acknowledged
    Projected,
    /// The pair was already owned; acknowledged without writing
    AlreadyProjected,
    /// The body could not be parsed; acknowledged and dropped
    Discarded,
    /// Projection failed; left unacknowledged
    LeftForRedelivery,
}

/// Consumer for the purchase-completed queue
#[derive(Clone)]
pub struct PurchaseEventConsumer {
    queue: Arc<dyn MessageQueue>,
    projection: LibraryProjection,
    poll_interval: Duration,
}

impl PurchaseEventConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        projection: LibraryProjection,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            projection,
            poll_interval,
        }
    }

    /// Start the consumer in the background.
    /// The task exits once `shutdown` turns true or its sender is dropped.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Purchase event consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.poll_once().await {
                Ok(Some(outcome)) if outcome != MessageOutcome::LeftForRedelivery => continue,
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Failed to poll purchase queue"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Purchase event consumer stopped");
    }

    /// Receive and handle at most one message.
    pub async fn poll_once(&self) -> Result<Option<MessageOutcome>, QueueError> {
        let Some(message) = self.queue.receive().await? else {
            return Ok(None);
        };

        self.handle_message(&message).await.map(Some)
    }

    #[tracing::instrument(
        skip(self, message),
        fields(message_id = %message.id, delivery = message.delivery_count)
    )]
    pub async fn handle_message(&self, message: &QueueMessage) -> Result<MessageOutcome, QueueError> {
        let event: PurchaseCompletedEvent = match serde_json::from_str(&message.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable purchase message");
                self.queue.ack(message.id).await?;
                return Ok(MessageOutcome::Discarded);
            }
        };

        let outcome = match self.projection.project_from_event(&event).await {
            Ok(ProjectionOutcome::Created(_)) => MessageOutcome::Projected,
            Ok(ProjectionOutcome::AlreadyOwned) => MessageOutcome::AlreadyProjected,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    purchase_id = %event.purchase_id,
                    "Failed to project purchase event; leaving for redelivery"
                );
                return Ok(MessageOutcome::LeftForRedelivery);
            }
        };

        self.queue.ack(message.id).await?;
        Ok(outcome)
    }
}
