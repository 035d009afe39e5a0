// ==========================================
// Pallet repository
// ==========================================
// Id allocation is max(id)+1, safe because writes are serialised behind
// the single writer.
// ==========================================

use crate::domain::{Pallet, PalletStatus};
use crate::repository::{self, error::{RepositoryError, RepositoryResult}};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLS: &str = "id, project_id, status, created_at, closed_at, reopened_at";

type RawPallet = (i64, i64, String, String, Option<String>, Option<String>);

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawPallet> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn finish(raw: RawPallet) -> RepositoryResult<Pallet> {
    let (id, project_id, status, created, closed, reopened) = raw;
    Ok(Pallet {
        id,
        project_id,
        status: PalletStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Internal(format!("bad pallet status {status:?}")))?,
        created_at: repository::parse_datetime(&created)?,
        closed_at: repository::parse_opt_datetime(closed)?,
        reopened_at: repository::parse_opt_datetime(reopened)?,
    })
}

/// Next free pallet id (max + 1). Only valid under the writer lock.
pub fn next_id(conn: &Connection) -> RepositoryResult<i64> {
    let max: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM pallets", [], |row| {
        row.get(0)
    })?;
    Ok(max + 1)
}

pub fn insert(conn: &Connection, pallet: &Pallet) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO pallets (id, project_id, status, created_at, closed_at, reopened_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            pallet.id,
            pallet.project_id,
            pallet.status.as_str(),
            repository::format_datetime(pallet.created_at),
            pallet.closed_at.map(repository::format_datetime),
            pallet.reopened_at.map(repository::format_datetime),
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: i64) -> RepositoryResult<Option<Pallet>> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLS} FROM pallets WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?;
    raw.map(finish).transpose()
}

/// Persist a status transition (status plus its timestamps).
pub fn update_status(conn: &Connection, pallet: &Pallet) -> RepositoryResult<usize> {
    let rows = conn.execute(
        r#"
        UPDATE pallets
        SET status = ?1, closed_at = ?2, reopened_at = ?3
        WHERE id = ?4
        "#,
        params![
            pallet.status.as_str(),
            pallet.closed_at.map(repository::format_datetime),
            pallet.reopened_at.map(repository::format_datetime),
            pallet.id,
        ],
    )?;
    Ok(rows)
}

pub fn list_for_project(conn: &Connection, project_id: i64) -> RepositoryResult<Vec<Pallet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM pallets WHERE project_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![project_id], map_row)?;

    let mut pallets = Vec::new();
    for row in rows {
        pallets.push(finish(row?)?);
    }
    Ok(pallets)
}
