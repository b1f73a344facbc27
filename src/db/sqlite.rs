use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Dashboard tables. Every statement is idempotent so opening an existing
/// database is a no-op.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    role        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vitals (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    vital_type   TEXT NOT NULL,
    value        REAL NOT NULL,
    unit         TEXT NOT NULL,
    recorded_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vitals_user_time ON vitals(user_id, recorded_at);

CREATE TABLE IF NOT EXISTS medications (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    dosage     TEXT NOT NULL,
    schedule   TEXT NOT NULL,
    adherence  INTEGER NOT NULL DEFAULT 0,
    active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS appointments (
    id                TEXT PRIMARY KEY,
    patient_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    doctor_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    date              TEXT NOT NULL,
    appointment_type  TEXT NOT NULL,
    status            TEXT NOT NULL
);
";

/// Open a SQLite connection to the given path and ensure the schema exists
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Create any missing dashboard tables.
pub fn ensure_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA)?;
    tracing::debug!("Dashboard schema ready");
    Ok(())
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
