//! Notification type definitions.

use serde::{Deserialize, Serialize};

/// Upper bound on the notification log. Inserting beyond the cap
/// evicts the oldest entries.
pub const MAX_NOTIFICATIONS: usize = 100;

/// A received in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: String,
    /// Open string enum: "news", "new_message", "wallet_deposit", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    /// Free-form payload handed to the deep-link handler on tap.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Insertion timestamp, unix milliseconds.
    pub received_at: i64,
    pub is_read: bool,
}

/// Input for [`super::NotificationCenter::add`]; id, timestamp and
/// read state are assigned by the center.
#[derive(Debug, Clone)]
pub struct NotificationInput {
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Time-prefixed id with a random suffix. Collisions are negligible;
/// uniqueness is not enforced.
pub fn new_notification_id() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        nanoid::nanoid!(9)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_serializes_kind_as_type() {
        let n = AppNotification {
            id: "1".into(),
            kind: "news".into(),
            title: "X".into(),
            body: "Y".into(),
            data: serde_json::json!({}),
            received_at: 1000,
            is_read: false,
        };
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains(r#""type":"news""#));

        let back: AppNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, "news");
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(new_notification_id(), new_notification_id());
    }
}
