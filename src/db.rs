// ==========================================
// Warehouse Receipting - SQLite connection setup
// ==========================================
// Goals:
// - One place for Connection::open PRAGMA behaviour so every handle has
//   foreign keys and busy_timeout configured identically
// - WAL journal mode so readers run in parallel with the single writer
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Apply the shared PRAGMA set to a connection.
///
/// foreign_keys and busy_timeout are per-connection settings and must be
/// re-applied on every open.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open the writer connection: WAL mode plus the shared PRAGMA set.
pub fn open_writer(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Open a read-only connection. `query_only` makes any mutation attempt
/// inside a read transaction fail at statement level.
pub fn open_reader(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_connection(&conn)?;
    conn.pragma_update(None, "query_only", "ON")?;
    Ok(conn)
}
