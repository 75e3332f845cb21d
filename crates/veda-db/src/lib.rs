//! SQLite database layer for the VedaMatch portal client.
//!
//! Holds the offline scripture library (saved-book metadata plus the
//! downloaded content blobs), the notification history slot, and the
//! settings table backing runtime configuration.

pub mod books;
pub mod notifications;
pub mod schema;
pub mod settings;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

/// Thread-safe database handle wrapping a single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    /// Access the underlying connection with a closure.
    pub fn with_conn<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> Result<R, DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    /// Access the underlying connection mutably (for transactions).
    pub fn with_conn_mut<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DbError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&mut conn)
    }

    fn configure(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA busy_timeout=5000;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
    }

    fn migrate(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            schema::run_migrations(conn)?;
            Ok(())
        })
    }
}

/// Database error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::SavedBookInfo;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test DB")
    }

    fn sample_book(code: &str, verses_count: i64) -> SavedBookInfo {
        SavedBookInfo {
            code: code.to_string(),
            name_ru: "Бхагавад-гита".to_string(),
            name_en: "Bhagavad-gita".to_string(),
            description_ru: None,
            description_en: Some("As it is".to_string()),
            saved_at: "2026-08-01T12:00:00+00:00".to_string(),
            size_bytes: verses_count * 1000,
            chapters_count: 2,
            verses_count,
        }
    }

    #[test]
    fn test_open_and_migrate() {
        let db = test_db();
        assert!(db.get_saved_books().unwrap().is_empty());
        assert!(db.get_all_settings().unwrap().is_empty());
    }

    #[test]
    fn test_settings_crud() {
        let db = test_db();
        db.set_setting("LIBRARY_API_URL", "https://example.com", "normal")
            .unwrap();
        assert_eq!(
            db.get_setting("LIBRARY_API_URL").unwrap(),
            Some("https://example.com".into())
        );

        db.set_setting("LIBRARY_API_URL", "https://other.example", "normal")
            .unwrap();
        assert_eq!(
            db.get_setting("LIBRARY_API_URL").unwrap(),
            Some("https://other.example".into())
        );

        db.delete_setting("LIBRARY_API_URL").unwrap();
        assert_eq!(db.get_setting("LIBRARY_API_URL").unwrap(), None);
    }

    #[test]
    fn test_save_book_writes_both_records() {
        let db = test_db();
        db.save_book(&sample_book("bg", 20), r#"{"book":{},"chapters":[]}"#)
            .unwrap();

        let books = db.get_saved_books().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].code, "bg");
        assert_eq!(books[0].verses_count, 20);
        assert_eq!(books[0].size_bytes, 20_000);

        assert!(db.is_book_saved("bg").unwrap());
        assert!(db.get_book_data("bg").unwrap().is_some());
    }

    #[test]
    fn test_save_book_replaces_existing() {
        let db = test_db();
        db.save_book(&sample_book("bg", 10), "first").unwrap();
        db.save_book(&sample_book("bg", 30), "second").unwrap();

        let books = db.get_saved_books().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].verses_count, 30);
        assert_eq!(db.get_book_data("bg").unwrap().unwrap(), "second");
    }

    #[test]
    fn test_remove_book_deletes_both_records() {
        let db = test_db();
        db.save_book(&sample_book("bg", 20), "{}").unwrap();
        db.remove_book("bg").unwrap();

        assert!(db.get_saved_books().unwrap().is_empty());
        assert!(!db.is_book_saved("bg").unwrap());
        assert!(db.get_book_data("bg").unwrap().is_none());

        // Removing an absent book is not an error
        db.remove_book("bg").unwrap();
        db.remove_book("missing").unwrap();
    }

    #[test]
    fn test_metadata_and_blob_stay_in_sync() {
        let db = test_db();
        db.save_book(&sample_book("bg", 20), "{}").unwrap();
        db.save_book(&sample_book("sb", 50), "{}").unwrap();
        db.remove_book("bg").unwrap();

        for info in db.get_saved_books().unwrap() {
            assert!(db.get_book_data(&info.code).unwrap().is_some());
        }
        assert!(db.get_book_data("bg").unwrap().is_none());
        assert!(db.get_saved_book("bg").unwrap().is_none());
    }

    #[test]
    fn test_total_offline_size() {
        let db = test_db();
        assert_eq!(db.total_offline_size().unwrap(), 0);

        db.save_book(&sample_book("bg", 20), "{}").unwrap();
        db.save_book(&sample_book("sb", 50), "{}").unwrap();
        assert_eq!(db.total_offline_size().unwrap(), 70_000);
    }

    #[test]
    fn test_clear_all_books() {
        let db = test_db();
        db.save_book(&sample_book("bg", 20), "{}").unwrap();
        db.save_book(&sample_book("sb", 50), "{}").unwrap();
        db.clear_all_books().unwrap();

        assert!(db.get_saved_books().unwrap().is_empty());
        assert!(db.get_book_data("bg").unwrap().is_none());
        assert!(db.get_book_data("sb").unwrap().is_none());
    }

    #[test]
    fn test_notification_history_slot() {
        let db = test_db();
        assert!(db.get_notification_history().unwrap().is_none());

        db.set_notification_history(r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(
            db.get_notification_history().unwrap().unwrap(),
            r#"[{"id":"1"}]"#
        );

        db.set_notification_history("[]").unwrap();
        assert_eq!(db.get_notification_history().unwrap().unwrap(), "[]");

        db.delete_notification_history().unwrap();
        assert!(db.get_notification_history().unwrap().is_none());

        // Deleting an absent slot is fine
        db.delete_notification_history().unwrap();
    }
}
