//! Offline scripture library storage.
//!
//! Two collections keyed by book `code`: `saved_books` holds the small
//! metadata records listed in the UI, `book_data` holds the downloaded
//! content blob (JSON, opaque to this crate). A metadata record exists
//! if and only if a content blob exists for the same code, so every
//! write that touches both goes through a single transaction.

use crate::{Database, DbError};
use serde::{Deserialize, Serialize};

/// Metadata for a book that has been downloaded for offline reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedBookInfo {
    pub code: String,
    pub name_ru: String,
    pub name_en: String,
    pub description_ru: Option<String>,
    pub description_en: Option<String>,
    /// RFC 3339 timestamp of the completed download.
    pub saved_at: String,
    /// Estimated size, not a measured byte count.
    pub size_bytes: i64,
    pub chapters_count: i64,
    pub verses_count: i64,
}

impl Database {
    /// Upsert metadata and content blob for a book in one transaction.
    pub fn save_book(&self, info: &SavedBookInfo, data_json: &str) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO saved_books
                 (code, name_ru, name_en, description_ru, description_en,
                  saved_at, size_bytes, chapters_count, verses_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    info.code,
                    info.name_ru,
                    info.name_en,
                    info.description_ru,
                    info.description_en,
                    info.saved_at,
                    info.size_bytes,
                    info.chapters_count,
                    info.verses_count,
                ],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO book_data (code, data) VALUES (?1, ?2)",
                rusqlite::params![info.code, data_json],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete metadata and content blob for a book in one transaction.
    /// Removing an absent book is not an error.
    pub fn remove_book(&self, code: &str) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM saved_books WHERE code = ?1", [code])?;
            tx.execute("DELETE FROM book_data WHERE code = ?1", [code])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// List all saved books, most recently saved first.
    pub fn get_saved_books(&self) -> Result<Vec<SavedBookInfo>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, name_ru, name_en, description_ru, description_en,
                        saved_at, size_bytes, chapters_count, verses_count
                 FROM saved_books ORDER BY saved_at DESC",
            )?;
            let rows = stmt.query_map([], row_to_saved_book)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_saved_book(&self, code: &str) -> Result<Option<SavedBookInfo>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, name_ru, name_en, description_ru, description_en,
                        saved_at, size_bytes, chapters_count, verses_count
                 FROM saved_books WHERE code = ?1",
            )?;
            let info = stmt.query_row([code], row_to_saved_book).optional()?;
            Ok(info)
        })
    }

    pub fn is_book_saved(&self, code: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM saved_books WHERE code = ?1)",
                [code],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Content blob for a saved book, or `None` when not saved.
    pub fn get_book_data(&self, code: &str) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let data = conn
                .query_row("SELECT data FROM book_data WHERE code = ?1", [code], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(data)
        })
    }

    /// Sum of the estimated sizes of all saved books.
    pub fn total_offline_size(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(size_bytes), 0) FROM saved_books",
                [],
                |row| row.get(0),
            )?;
            Ok(total)
        })
    }

    /// Wipe both collections in one transaction.
    pub fn clear_all_books(&self) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM saved_books", [])?;
            tx.execute("DELETE FROM book_data", [])?;
            tx.commit()?;
            Ok(())
        })
    }
}

fn row_to_saved_book(row: &rusqlite::Row<'_>) -> Result<SavedBookInfo, rusqlite::Error> {
    Ok(SavedBookInfo {
        code: row.get(0)?,
        name_ru: row.get(1)?,
        name_en: row.get(2)?,
        description_ru: row.get(3)?,
        description_en: row.get(4)?,
        saved_at: row.get(5)?,
        size_bytes: row.get(6)?,
        chapters_count: row.get(7)?,
        verses_count: row.get(8)?,
    })
}

/// Extension trait for optional query results.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
