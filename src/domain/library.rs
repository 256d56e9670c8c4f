//! Library entries and the purchase-completed event that feeds them

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record that a user owns a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub game_id: Uuid,
    /// Correlates the entry with the originating purchase transaction
    pub purchase_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    /// Price resolved by a direct purchase; absent for event-projected entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Decimal>,
}

impl LibraryEntry {
    /// Entry for a purchase settled synchronously at `price`.
    pub fn purchased(user_id: Uuid, game_id: Uuid, price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            game_id,
            purchase_id: Uuid::new_v4(),
            acquired_at: now,
            purchase_price: Some(price),
        }
    }

    /// Entry for a purchase already settled upstream.
    pub fn from_event(event: &PurchaseCompletedEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            game_id: event.game_id,
            purchase_id: event.purchase_id,
            acquired_at: event.processed_at,
            purchase_price: None,
        }
    }
}

/// Library entry with the user and game fields shown to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntryDetails {
    #[serde(flatten)]
    pub entry: LibraryEntry,
    pub user_name: String,
    pub user_email: String,
    pub game_title: String,
}

/// Notification that an external purchase flow finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCompletedEvent {
    pub user_id: Uuid,
    pub game_id: Uuid,
    pub purchase_id: Uuid,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_deserialize() {
        let json = r#"{
            "userId": "550e8400-e29b-41d4-a716-446655440001",
            "gameId": "550e8400-e29b-41d4-a716-446655440002",
            "purchaseId": "550e8400-e29b-41d4-a716-446655440003",
            "processedAt": "2026-03-10T12:30:00Z"
        }"#;

        let event: PurchaseCompletedEvent = serde_json::from_str(json).unwrap();
        let entry = LibraryEntry::from_event(&event);

        assert_eq!(entry.user_id, event.user_id);
        assert_eq!(entry.game_id, event.game_id);
        assert_eq!(entry.purchase_id, event.purchase_id);
        assert_eq!(entry.acquired_at, event.processed_at);
        assert!(entry.purchase_price.is_none());
    }

    #[test]
    fn test_event_payload_missing_field_rejected() {
        let json = r#"{"userId": "550e8400-e29b-41d4-a716-446655440001"}"#;
        assert!(serde_json::from_str::<PurchaseCompletedEvent>(json).is_err());
    }
}
