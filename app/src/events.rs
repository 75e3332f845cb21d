//! App event constants and helpers.
//!
//! Events are emitted as JSON over the shared broadcast channel; UI
//! layers subscribe and re-render. Dropping a receiver unsubscribes it.

use serde::Serialize;
use tokio::sync::broadcast;

// -- Event name constants --

pub const SYNC_PROGRESS: &str = "sync_progress";
pub const BOOK_SAVED: &str = "book_saved";
pub const BOOK_REMOVED: &str = "book_removed";
pub const NOTIFICATION_ADDED: &str = "notification_added";
pub const UNREAD_COUNT_CHANGED: &str = "unread_count_changed";
pub const PANEL_VISIBILITY_CHANGED: &str = "panel_visibility_changed";

// -- Payload types --

#[derive(Debug, Clone, Serialize)]
pub struct SyncProgressPayload {
    pub code: String,
    pub pct: u8,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookPayload {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationAddedPayload {
    pub id: String,
    pub kind: String,
    pub unread: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadCountPayload {
    pub unread: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelVisibilityPayload {
    pub visible: bool,
}

/// Serialize and send an event. A send with no live receivers is fine.
pub fn emit<T: Serialize>(tx: &broadcast::Sender<String>, event: &str, payload: T) {
    match serde_json::to_string(&serde_json::json!({ "event": event, "payload": payload })) {
        Ok(message) => {
            let _ = tx.send(message);
        }
        Err(e) => tracing::warn!("Failed to serialize event {event}: {e}"),
    }
}
