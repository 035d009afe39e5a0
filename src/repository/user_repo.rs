// ==========================================
// User repository
// ==========================================
// Account management is the shell's concern; the core needs usernames
// for projections and inserts in tests.
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};

pub fn insert(
    conn: &Connection,
    username: &str,
    display_name: &str,
    role: &str,
) -> RepositoryResult<i64> {
    conn.execute(
        "INSERT INTO users (username, display_name, role) VALUES (?1, ?2, ?3)",
        params![username, display_name, role],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn username_of(conn: &Connection, user_id: i64) -> RepositoryResult<Option<String>> {
    let name = conn
        .query_row(
            "SELECT username FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}
