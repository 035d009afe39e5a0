// ==========================================
// Migration runner
// ==========================================
// Migration files are bundled into the binary and applied in lexical
// filename order. Each file runs in its own write transaction unless the
// file text itself opens one. Re-applying on open is a no-op thanks to
// the schema_migrations ledger.
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

/// Bundled migrations, lexical order. Keep this list sorted by filename.
const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init.sql", include_str!("../../migrations/0001_init.sql")),
    ("0002_indexes.sql", include_str!("../../migrations/0002_indexes.sql")),
    (
        "0003_export_runs.sql",
        include_str!("../../migrations/0003_export_runs.sql"),
    ),
];

/// Apply all pending migrations. Returns the number applied.
pub fn run(conn: &mut Connection) -> RepositoryResult<usize> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            filename TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )?;

    debug_assert!(
        MIGRATIONS.windows(2).all(|w| w[0].0 < w[1].0),
        "migrations must be listed in lexical filename order"
    );

    let mut applied = 0;
    for (filename, sql) in MIGRATIONS {
        if is_applied(conn, filename)? {
            continue;
        }

        if declares_own_transaction(sql) {
            // The file manages BEGIN/COMMIT itself; record afterwards.
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_migrations (filename) VALUES (?1)",
                params![filename],
            )?;
        } else {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (filename) VALUES (?1)",
                params![filename],
            )?;
            tx.commit()?;
        }

        info!(migration = filename, "applied migration");
        applied += 1;
    }

    Ok(applied)
}

fn is_applied(conn: &Connection, filename: &str) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE filename = ?1",
            params![filename],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// A file that opens its own transaction starts with BEGIN as the first
/// non-comment statement.
fn declares_own_transaction(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("--"))
        .map(|line| line.to_ascii_uppercase().starts_with("BEGIN"))
        .unwrap_or(false)
}
