//! Notification log state and persistence.
//!
//! Mutations are serialized behind a single list mutex (single-writer),
//! and each mutation persists the full list. Persistence failures are
//! logged and swallowed; the in-memory log stays authoritative for the
//! session.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use veda_db::Database;

use crate::events;

use super::types::{AppNotification, MAX_NOTIFICATIONS, NotificationInput, new_notification_id};

/// Process-wide notification inbox for one signed-in session.
pub struct NotificationCenter {
    db: Database,
    entries: Mutex<Vec<AppNotification>>,
    panel_visible: AtomicBool,
    events_tx: broadcast::Sender<String>,
}

impl NotificationCenter {
    /// Read the persisted history once and build the center around it.
    /// Malformed JSON or a non-array payload counts as no history.
    pub fn load(db: Database, events_tx: broadcast::Sender<String>) -> Self {
        let entries = match db.get_notification_history() {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<AppNotification>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    tracing::debug!("Discarding malformed notification history: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read notification history: {e}");
                Vec::new()
            }
        };

        Self {
            db,
            entries: Mutex::new(entries),
            panel_visible: AtomicBool::new(false),
            events_tx,
        }
    }

    /// Insert a new notification at the head of the log and truncate to
    /// [`MAX_NOTIFICATIONS`]. Returns the stored entry.
    pub fn add(&self, input: NotificationInput) -> AppNotification {
        let notification = AppNotification {
            id: new_notification_id(),
            kind: input.kind,
            title: input.title,
            body: input.body,
            data: input.data,
            received_at: chrono::Utc::now().timestamp_millis(),
            is_read: false,
        };

        let unread = {
            let mut entries = self.lock_entries();
            entries.insert(0, notification.clone());
            entries.truncate(MAX_NOTIFICATIONS);
            self.persist(&entries);
            count_unread(&entries)
        };

        events::emit(
            &self.events_tx,
            events::NOTIFICATION_ADDED,
            events::NotificationAddedPayload {
                id: notification.id.clone(),
                kind: notification.kind.clone(),
                unread,
            },
        );
        self.emit_unread(unread);

        notification
    }

    /// Mark one entry read. Unknown ids are a no-op.
    pub fn mark_as_read(&self, id: &str) {
        let unread = {
            let mut entries = self.lock_entries();
            let Some(entry) = entries.iter_mut().find(|n| n.id == id) else {
                return;
            };
            if !entry.is_read {
                entry.is_read = true;
                self.persist(&entries);
            }
            count_unread(&entries)
        };
        self.emit_unread(unread);
    }

    pub fn mark_all_as_read(&self) {
        {
            let mut entries = self.lock_entries();
            for entry in entries.iter_mut() {
                entry.is_read = true;
            }
            self.persist(&entries);
        }
        self.emit_unread(0);
    }

    /// Empty the log and delete the persisted slot (an absent slot and
    /// an empty array load identically).
    pub fn clear_all(&self) {
        {
            let mut entries = self.lock_entries();
            entries.clear();
        }
        if let Err(e) = self.db.delete_notification_history() {
            tracing::warn!("Failed to delete notification history: {e}");
        }
        self.emit_unread(0);
    }

    /// Derived on every read, never stored.
    pub fn unread_count(&self) -> usize {
        count_unread(&self.lock_entries())
    }

    /// Newest-first snapshot of the log.
    pub fn notifications(&self) -> Vec<AppNotification> {
        self.lock_entries().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible.load(Ordering::Relaxed)
    }

    pub fn set_panel_visible(&self, visible: bool) {
        let previous = self.panel_visible.swap(visible, Ordering::Relaxed);
        if previous != visible {
            events::emit(
                &self.events_tx,
                events::PANEL_VISIBILITY_CHANGED,
                events::PanelVisibilityPayload { visible },
            );
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<AppNotification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[AppNotification]) {
        match serde_json::to_string(entries) {
            Ok(json) => {
                if let Err(e) = self.db.set_notification_history(&json) {
                    tracing::warn!("Failed to persist notification history: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize notification history: {e}"),
        }
    }

    fn emit_unread(&self, unread: usize) {
        events::emit(
            &self.events_tx,
            events::UNREAD_COUNT_CHANGED,
            events::UnreadCountPayload { unread },
        );
    }
}

fn count_unread(entries: &[AppNotification]) -> usize {
    entries.iter().filter(|n| !n.is_read).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center_with_db(db: Database) -> NotificationCenter {
        let (tx, _) = broadcast::channel(64);
        NotificationCenter::load(db, tx)
    }

    fn center() -> NotificationCenter {
        center_with_db(Database::open_in_memory().unwrap())
    }

    fn input(title: &str) -> NotificationInput {
        NotificationInput {
            kind: "news".into(),
            title: title.into(),
            body: "Y".into(),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn add_prepends_newest_first() {
        let c = center();
        c.add(input("first"));
        c.add(input("second"));

        let list = c.notifications();
        assert_eq!(list[0].title, "second");
        assert_eq!(list[1].title, "first");
        assert!(list[0].received_at >= list[1].received_at);
    }

    #[test]
    fn log_is_capped_and_evicts_oldest() {
        let c = center();
        let first = c.add(input("first"));
        for i in 0..MAX_NOTIFICATIONS {
            c.add(input(&format!("n{i}")));
        }

        let list = c.notifications();
        assert_eq!(list.len(), MAX_NOTIFICATIONS);
        assert!(list.iter().all(|n| n.id != first.id));
        assert_eq!(list[0].title, format!("n{}", MAX_NOTIFICATIONS - 1));
    }

    #[test]
    fn unread_count_is_derived() {
        let c = center();
        assert_eq!(c.unread_count(), 0);

        let a = c.add(input("a"));
        let b = c.add(input("b"));
        c.add(input("c"));
        assert_eq!(c.unread_count(), 3);

        c.mark_as_read(&a.id);
        assert_eq!(c.unread_count(), 2);

        // Marking twice or marking an unknown id changes nothing
        c.mark_as_read(&a.id);
        c.mark_as_read("missing");
        assert_eq!(c.unread_count(), 2);

        c.mark_as_read(&b.id);
        c.mark_all_as_read();
        assert_eq!(c.unread_count(), 0);
    }

    #[test]
    fn history_survives_reload() {
        let db = Database::open_in_memory().unwrap();
        {
            let c = center_with_db(db.clone());
            let a = c.add(input("a"));
            c.add(input("b"));
            c.mark_as_read(&a.id);
        }

        let reloaded = center_with_db(db);
        let list = reloaded.notifications();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "b");
        assert!(!list[0].is_read);
        assert!(list[1].is_read);
        assert_eq!(reloaded.unread_count(), 1);
    }

    #[test]
    fn clear_all_survives_reload() {
        let db = Database::open_in_memory().unwrap();
        {
            let c = center_with_db(db.clone());
            c.add(input("a"));
            c.clear_all();
            assert!(c.is_empty());
        }

        let reloaded = center_with_db(db.clone());
        assert!(reloaded.is_empty());
        assert!(db.get_notification_history().unwrap().is_none());
    }

    #[test]
    fn history_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("local.db");

        {
            let db = Database::open(&db_path).unwrap();
            let c = center_with_db(db);
            c.add(input("persisted"));
        }

        // Fresh connection, as after an app restart
        let db = Database::open(&db_path).unwrap();
        let reloaded = center_with_db(db);
        let list = reloaded.notifications();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "persisted");
        assert_eq!(reloaded.unread_count(), 1);
    }

    #[test]
    fn malformed_history_loads_as_empty() {
        let db = Database::open_in_memory().unwrap();
        db.set_notification_history("{not json").unwrap();
        assert!(center_with_db(db.clone()).is_empty());

        db.set_notification_history(r#"{"an":"object"}"#).unwrap();
        assert!(center_with_db(db).is_empty());
    }

    #[test]
    fn panel_visibility_flag() {
        let c = center();
        assert!(!c.is_panel_visible());
        c.set_panel_visible(true);
        assert!(c.is_panel_visible());
        c.set_panel_visible(false);
        assert!(!c.is_panel_visible());
    }
}
