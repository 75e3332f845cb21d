//! Notification history persistence.
//!
//! A single durable slot holding the JSON-serialized notification log.
//! An absent slot is equivalent to an empty log, so `clear` deletes the
//! row instead of writing an empty array.

use crate::{Database, DbError};

impl Database {
    pub fn get_notification_history(&self) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let payload = match conn.query_row(
                "SELECT payload FROM notification_history WHERE id = 1",
                [],
                |row| row.get(0),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };
            Ok(payload)
        })
    }

    pub fn set_notification_history(&self, payload: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO notification_history (id, payload, updated_at)
                 VALUES (1, ?1, CURRENT_TIMESTAMP)",
                [payload],
            )?;
            Ok(())
        })
    }

    pub fn delete_notification_history(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM notification_history WHERE id = 1", [])?;
            Ok(())
        })
    }
}
