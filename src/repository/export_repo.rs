// ==========================================
// Export run repository
// ==========================================
// Append-only telemetry, one row per CSV export.
// ==========================================

use crate::domain::ExportRun;
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

fn map_row(row: &Row<'_>) -> rusqlite::Result<ExportRun> {
    Ok(ExportRun {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        export_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert(
    conn: &Connection,
    now: NaiveDateTime,
    user_id: Option<i64>,
    project_id: Option<i64>,
    export_type: &str,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO export_runs (user_id, project_id, export_type, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            user_id,
            project_id,
            export_type,
            repository::format_datetime(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection) -> RepositoryResult<Vec<ExportRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, project_id, export_type, created_at FROM export_runs ORDER BY id",
    )?;
    let rows = stmt.query_map([], map_row)?;

    let mut runs = Vec::new();
    for row in rows {
        runs.push(row?);
    }
    Ok(runs)
}
