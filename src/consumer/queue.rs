//! Message queue seam
//!
//! At-least-once delivery: a received message stays invisible for the
//! visibility timeout and is delivered again unless acknowledged. Messages
//! received more than `max_deliveries` times are parked as dead.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Default redelivery delay for unacknowledged messages
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of deliveries before a message is parked
pub const DEFAULT_MAX_DELIVERIES: u32 = 5;

/// A message claimed from the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub id: Uuid,
    pub body: String,
    /// Deliveries so far, including this one
    pub delivery_count: u32,
}

/// Queue errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown message: {0}")]
    UnknownMessage(Uuid),
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Claim the oldest visible message, if any.
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError>;

    /// Remove a message after successful processing.
    async fn ack(&self, id: Uuid) -> Result<(), QueueError>;

    async fn publish(&self, body: String) -> Result<Uuid, QueueError>;
}

// =========================================================================
// Postgres
// =========================================================================

/// Queue stored in the `queue_messages` table
#[derive(Debug, Clone)]
pub struct PgMessageQueue {
    pool: PgPool,
    queue_name: String,
    visibility_timeout: Duration,
    max_deliveries: u32,
}

impl PgMessageQueue {
    pub fn new(pool: PgPool, queue_name: impl Into<String>) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_max_deliveries(mut self, max_deliveries: u32) -> Self {
        self.max_deliveries = max_deliveries;
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Park visible messages that used up their deliveries.
    async fn park_exhausted(&self) -> Result<u64, QueueError> {
        let parked = sqlx::query(
            r#"
            UPDATE queue_messages
            SET status = 'dead'
            WHERE queue_name = $1
              AND status IN ('pending', 'in_flight')
              AND visible_at <= NOW()
              AND delivery_count >= $2
            "#,
        )
        .bind(&self.queue_name)
        .bind(i32::try_from(self.max_deliveries).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if parked > 0 {
            tracing::warn!(
                queue = %self.queue_name,
                parked,
                max_deliveries = self.max_deliveries,
                "Parked undeliverable messages as dead"
            );
        }

        Ok(parked)
    }
}

#[async_trait]
impl MessageQueue for PgMessageQueue {
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        self.park_exhausted().await?;

        let row: Option<(Uuid, String, i32)> = sqlx::query_as(
            r#"
            UPDATE queue_messages
            SET status = 'in_flight',
                delivery_count = delivery_count + 1,
                visible_at = NOW() + make_interval(secs => $2)
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE queue_name = $1
                  AND status IN ('pending', 'in_flight')
                  AND visible_at <= NOW()
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, body, delivery_count
            "#,
        )
        .bind(&self.queue_name)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, body, delivery_count)| QueueMessage {
            id,
            body,
            delivery_count: u32::try_from(delivery_count).unwrap_or_default(),
        }))
    }

    async fn ack(&self, id: Uuid) -> Result<(), QueueError> {
        let deleted = sqlx::query("DELETE FROM queue_messages WHERE id = $1 AND queue_name = $2")
            .bind(id)
            .bind(&self.queue_name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(QueueError::UnknownMessage(id));
        }
        Ok(())
    }

    async fn publish(&self, body: String) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO queue_messages (id, queue_name, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&self.queue_name)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }
}

// =========================================================================
// In-memory
// =========================================================================

#[derive(Debug)]
struct StoredMessage {
    id: Uuid,
    body: String,
    delivery_count: u32,
    visible_at: Instant,
    dead: bool,
}

/// In-process queue with the same delivery rules as `PgMessageQueue`
#[derive(Debug)]
pub struct InMemoryQueue {
    messages: Mutex<Vec<StoredMessage>>,
    visibility_timeout: Duration,
    max_deliveries: u32,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_max_deliveries(mut self, max_deliveries: u32) -> Self {
        self.max_deliveries = max_deliveries;
        self
    }

    fn messages(&self) -> MutexGuard<'_, Vec<StoredMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages not yet acknowledged or parked
    pub fn pending_len(&self) -> usize {
        self.messages().iter().filter(|m| !m.dead).count()
    }

    pub fn dead_len(&self) -> usize {
        self.messages().iter().filter(|m| m.dead).count()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(&self) -> Result<Option<QueueMessage>, QueueError> {
        let now = Instant::now();
        let mut messages = self.messages();

        for message in messages.iter_mut() {
            if message.dead || message.visible_at > now {
                continue;
            }
            if message.delivery_count >= self.max_deliveries {
                tracing::warn!(message_id = %message.id, "Parked undeliverable message as dead");
                message.dead = true;
                continue;
            }

            message.delivery_count += 1;
            message.visible_at = now + self.visibility_timeout;
            return Ok(Some(QueueMessage {
                id: message.id,
                body: message.body.clone(),
                delivery_count: message.delivery_count,
            }));
        }

        Ok(None)
    }

    async fn ack(&self, id: Uuid) -> Result<(), QueueError> {
        let mut messages = self.messages();
        let before = messages.len();
        messages.retain(|m| m.dead || m.id != id);

        if messages.len() == before {
            return Err(QueueError::UnknownMessage(id));
        }
        Ok(())
    }

    async fn publish(&self, body: String) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        self.messages().push(StoredMessage {
            id,
            body,
            delivery_count: 0,
            visible_at: Instant::now(),
            dead: false,
        });
        Ok(id)
    }
}
