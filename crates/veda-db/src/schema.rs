//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

/// Bumped on incompatible schema changes. Every change so far has been
/// expressible as an idempotent `CREATE TABLE IF NOT EXISTS`, so no
/// stepwise migrations exist yet.
const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;

    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        tracing::debug!("Stamping schema version {SCHEMA_VERSION} (was {version})");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS saved_books (
    code TEXT PRIMARY KEY,
    name_ru TEXT NOT NULL,
    name_en TEXT NOT NULL,
    description_ru TEXT,
    description_en TEXT,
    saved_at TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    chapters_count INTEGER NOT NULL,
    verses_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS book_data (
    code TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification_history (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    payload TEXT NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    setting_type TEXT NOT NULL DEFAULT 'normal',
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;
