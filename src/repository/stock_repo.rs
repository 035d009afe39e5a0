// ==========================================
// Stock catalogue repository
// ==========================================
// Upsert rules: supplied non-empty fields win; identical values are a
// row-level no-op (updated_at stays put). The UNKNOWN placeholder SKU is
// refused by the engine before it reaches here.
// ==========================================

use crate::domain::StockItem;
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLS: &str = "id, project_id, sku, description, uom, created_at, updated_at";

type RawItem = (i64, i64, String, String, String, String, String);

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawItem> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn finish(raw: RawItem) -> RepositoryResult<StockItem> {
    let (id, project_id, sku, description, uom, created, updated) = raw;
    Ok(StockItem {
        id,
        project_id,
        sku,
        description,
        uom,
        created_at: repository::parse_datetime(&created)?,
        updated_at: repository::parse_datetime(&updated)?,
    })
}

pub fn get(conn: &Connection, project_id: i64, sku: &str) -> RepositoryResult<Option<StockItem>> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLS} FROM stock_items WHERE project_id = ?1 AND sku = ?2"),
            params![project_id, sku],
            map_row,
        )
        .optional()?;
    raw.map(finish).transpose()
}

/// Upsert the (project, sku) catalogue hint. A supplied blank field keeps
/// the stored value; an unchanged row is not rewritten.
pub fn upsert(
    conn: &Connection,
    now: NaiveDateTime,
    project_id: i64,
    sku: &str,
    description: &str,
    uom: &str,
) -> RepositoryResult<()> {
    let description = description.trim();
    let uom = uom.trim();

    match get(conn, project_id, sku)? {
        Some(existing) => {
            let new_description = if description.is_empty() {
                existing.description.as_str()
            } else {
                description
            };
            let new_uom = if uom.is_empty() {
                existing.uom.as_str()
            } else {
                uom
            };

            if new_description == existing.description && new_uom == existing.uom {
                return Ok(());
            }

            conn.execute(
                r#"
                UPDATE stock_items SET description = ?1, uom = ?2, updated_at = ?3
                WHERE project_id = ?4 AND sku = ?5
                "#,
                params![
                    new_description,
                    new_uom,
                    repository::format_datetime(now),
                    project_id,
                    sku,
                ],
            )?;
        }
        None => {
            conn.execute(
                r#"
                INSERT INTO stock_items (project_id, sku, description, uom, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
                params![
                    project_id,
                    sku,
                    description,
                    uom,
                    repository::format_datetime(now),
                ],
            )?;
        }
    }
    Ok(())
}

pub fn list_for_project(conn: &Connection, project_id: i64) -> RepositoryResult<Vec<StockItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM stock_items WHERE project_id = ?1 ORDER BY sku COLLATE NOCASE ASC"
    ))?;
    let rows = stmt.query_map(params![project_id], map_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(finish(row?)?);
    }
    Ok(items)
}
