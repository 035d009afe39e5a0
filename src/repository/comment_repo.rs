// ==========================================
// Client comment repository
// ==========================================
// Comments are keyed by SKU-instance (sku, uom, batch, date(expiry))
// plus pallet. Matching mirrors the merge identity rules, NULL-expiry
// parity included.
// ==========================================

use crate::domain::instance::SkuInstance;
use crate::domain::ClientComment;
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLS: &str = "id, project_id, pallet_id, sku, uom, batch_number, expiry_date, comment, \
    created_by_user_id, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ClientComment> {
    Ok(ClientComment {
        id: row.get(0)?,
        project_id: row.get(1)?,
        pallet_id: row.get(2)?,
        sku: row.get(3)?,
        uom: row.get(4)?,
        batch_number: row.get(5)?,
        expiry_date: row.get(6)?,
        comment: row.get(7)?,
        created_by_user_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn insert(
    conn: &Connection,
    now: NaiveDateTime,
    project_id: i64,
    pallet_id: i64,
    instance: &SkuInstance,
    comment: &str,
    created_by_user_id: i64,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO sku_client_comments (
            project_id, pallet_id, sku, uom, batch_number, expiry_date,
            comment, created_by_user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            project_id,
            pallet_id,
            instance.sku,
            instance.uom,
            instance.batch,
            instance.expiry.map(repository::format_date),
            comment,
            created_by_user_id,
            repository::format_datetime(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Existence probe used by the hasClientComments projection flags.
pub fn exists_for_instance_on_pallet(
    conn: &Connection,
    pallet_id: i64,
    instance: &SkuInstance,
) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            r#"
            SELECT 1 FROM sku_client_comments
            WHERE pallet_id = ?1 AND sku = ?2 AND uom = ?3
              AND COALESCE(TRIM(batch_number), '') = ?4
              AND ((expiry_date IS NULL AND ?5 IS NULL) OR DATE(expiry_date) = ?5)
            LIMIT 1
            "#,
            params![
                pallet_id,
                instance.sku,
                instance.uom,
                instance.batch,
                instance.expiry.map(repository::format_date),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn exists_for_instance_in_project(
    conn: &Connection,
    project_id: i64,
    instance: &SkuInstance,
) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            r#"
            SELECT 1 FROM sku_client_comments
            WHERE project_id = ?1 AND sku = ?2 AND uom = ?3
              AND COALESCE(TRIM(batch_number), '') = ?4
              AND ((expiry_date IS NULL AND ?5 IS NULL) OR DATE(expiry_date) = ?5)
            LIMIT 1
            "#,
            params![
                project_id,
                instance.sku,
                instance.uom,
                instance.batch,
                instance.expiry.map(repository::format_date),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All comments for an SKU-instance on one pallet, newest first.
pub fn list_for_instance_on_pallet(
    conn: &Connection,
    pallet_id: i64,
    instance: &SkuInstance,
) -> RepositoryResult<Vec<ClientComment>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {COLS} FROM sku_client_comments
        WHERE pallet_id = ?1 AND sku = ?2 AND uom = ?3
          AND COALESCE(TRIM(batch_number), '') = ?4
          AND ((expiry_date IS NULL AND ?5 IS NULL) OR DATE(expiry_date) = ?5)
        ORDER BY created_at DESC, id DESC
        "#
    ))?;
    let rows = stmt.query_map(
        params![
            pallet_id,
            instance.sku,
            instance.uom,
            instance.batch,
            instance.expiry.map(repository::format_date),
        ],
        map_row,
    )?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}

/// All comments for an SKU-instance across every pallet of a project,
/// newest first.
pub fn list_for_instance_in_project(
    conn: &Connection,
    project_id: i64,
    instance: &SkuInstance,
) -> RepositoryResult<Vec<ClientComment>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {COLS} FROM sku_client_comments
        WHERE project_id = ?1 AND sku = ?2 AND uom = ?3
          AND COALESCE(TRIM(batch_number), '') = ?4
          AND ((expiry_date IS NULL AND ?5 IS NULL) OR DATE(expiry_date) = ?5)
        ORDER BY created_at DESC, id DESC
        "#
    ))?;
    let rows = stmt.query_map(
        params![
            project_id,
            instance.sku,
            instance.uom,
            instance.batch,
            instance.expiry.map(repository::format_date),
        ],
        map_row,
    )?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}
