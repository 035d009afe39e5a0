// ==========================================
// Receipt line repository
// ==========================================
// The merge lookup lives here: candidate selection by the full instance
// key, with COALESCE(TRIM(batch_number),'') batch identity and NULL-safe
// date-granularity expiry matching.
// ==========================================

use crate::domain::instance::{InstanceKey, SkuInstance};
use crate::domain::{PhotoUpload, ReceiptLine};
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Every scalar column. The primary photo blob is deliberately excluded;
/// it is written by insert/set_primary_photo and streamed out by
/// photo_repo.
const COLS: &str = "id, project_id, pallet_id, sku, description, uom, comment, \
    scanned_by_user_id, qty, case_size, unknown_sku, damaged, damaged_qty, \
    batch_number, expiry_date, carton_barcode, item_barcode, \
    no_outer_barcode, no_inner_barcode, stock_photo_mime, stock_photo_name, \
    created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ReceiptLine> {
    Ok(ReceiptLine {
        id: row.get(0)?,
        project_id: row.get(1)?,
        pallet_id: row.get(2)?,
        sku: row.get(3)?,
        description: row.get(4)?,
        uom: row.get(5)?,
        comment: row.get(6)?,
        scanned_by_user_id: row.get(7)?,
        qty: row.get(8)?,
        case_size: row.get(9)?,
        unknown_sku: row.get(10)?,
        damaged: row.get(11)?,
        damaged_qty: row.get(12)?,
        batch_number: row.get(13)?,
        expiry_date: row.get(14)?,
        carton_barcode: row.get(15)?,
        item_barcode: row.get(16)?,
        no_outer_barcode: row.get(17)?,
        no_inner_barcode: row.get(18)?,
        stock_photo_mime: row.get(19)?,
        stock_photo_name: row.get(20)?,
        created_at: row.get(21)?,
        updated_at: row.get(22)?,
    })
}

fn format_expiry(expiry: Option<NaiveDate>) -> Option<String> {
    expiry.map(repository::format_date)
}

/// Find the line an input segment merges into, if any. Exact seven-field
/// equality plus batch/expiry identity; earliest line wins when legacy
/// data holds duplicates.
pub fn find_merge_candidate(
    conn: &Connection,
    key: &InstanceKey,
) -> RepositoryResult<Option<ReceiptLine>> {
    let line = conn
        .query_row(
            &format!(
                r#"
                SELECT {COLS} FROM pallet_receipts
                WHERE project_id = ?1 AND pallet_id = ?2 AND sku = ?3 AND uom = ?4
                  AND case_size = ?5 AND unknown_sku = ?6 AND damaged = ?7
                  AND COALESCE(TRIM(batch_number), '') = ?8
                  AND ((expiry_date IS NULL AND ?9 IS NULL) OR DATE(expiry_date) = ?9)
                ORDER BY id
                LIMIT 1
                "#
            ),
            params![
                key.project_id,
                key.pallet_id,
                key.sku,
                key.uom,
                key.case_size,
                key.unknown_sku,
                key.damaged,
                key.batch,
                format_expiry(key.expiry),
            ],
            map_row,
        )
        .optional()?;
    Ok(line)
}

pub fn insert(
    conn: &Connection,
    line: &ReceiptLine,
    primary_photo: Option<&PhotoUpload>,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO pallet_receipts (
            project_id, pallet_id, sku, description, uom, comment,
            scanned_by_user_id, qty, case_size, unknown_sku, damaged, damaged_qty,
            batch_number, expiry_date, carton_barcode, item_barcode,
            no_outer_barcode, no_inner_barcode,
            stock_photo, stock_photo_mime, stock_photo_name,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
        )
        "#,
        params![
            line.project_id,
            line.pallet_id,
            line.sku,
            line.description,
            line.uom,
            line.comment,
            line.scanned_by_user_id,
            line.qty,
            line.case_size,
            line.unknown_sku,
            line.damaged,
            line.damaged_qty,
            line.batch_number,
            line.expiry_date,
            line.carton_barcode,
            line.item_barcode,
            line.no_outer_barcode,
            line.no_inner_barcode,
            primary_photo.map(|p| p.data.as_slice()),
            line.stock_photo_mime,
            line.stock_photo_name,
            line.created_at,
            line.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Persist the editable scalar fields of a line (merge and admin edit).
/// Barcodes and the photo columns are not touched here.
pub fn update(conn: &Connection, line: &ReceiptLine) -> RepositoryResult<usize> {
    let rows = conn.execute(
        r#"
        UPDATE pallet_receipts
        SET sku = ?1, description = ?2, uom = ?3, comment = ?4,
            scanned_by_user_id = ?5, qty = ?6, case_size = ?7,
            damaged = ?8, damaged_qty = ?9, batch_number = ?10,
            expiry_date = ?11, updated_at = ?12
        WHERE id = ?13
        "#,
        params![
            line.sku,
            line.description,
            line.uom,
            line.comment,
            line.scanned_by_user_id,
            line.qty,
            line.case_size,
            line.damaged,
            line.damaged_qty,
            line.batch_number,
            line.expiry_date,
            line.updated_at,
            line.id,
        ],
    )?;
    Ok(rows)
}

/// Replace the primary photo blob on a line.
pub fn set_primary_photo(
    conn: &Connection,
    line_id: i64,
    photo: &PhotoUpload,
) -> RepositoryResult<usize> {
    let rows = conn.execute(
        r#"
        UPDATE pallet_receipts
        SET stock_photo = ?1, stock_photo_mime = ?2, stock_photo_name = ?3
        WHERE id = ?4
        "#,
        params![photo.data, photo.mime, photo.name, line_id],
    )?;
    Ok(rows)
}

pub fn get(conn: &Connection, id: i64) -> RepositoryResult<Option<ReceiptLine>> {
    let line = conn
        .query_row(
            &format!("SELECT {COLS} FROM pallet_receipts WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?;
    Ok(line)
}

/// Fetch a line, scoped to the pallet it is expected to be on.
pub fn get_on_pallet(
    conn: &Connection,
    pallet_id: i64,
    id: i64,
) -> RepositoryResult<Option<ReceiptLine>> {
    let line = conn
        .query_row(
            &format!("SELECT {COLS} FROM pallet_receipts WHERE id = ?1 AND pallet_id = ?2"),
            params![id, pallet_id],
            map_row,
        )
        .optional()?;
    Ok(line)
}

pub fn delete(conn: &Connection, id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute("DELETE FROM pallet_receipts WHERE id = ?1", params![id])?;
    Ok(rows)
}

pub fn list_for_pallet(conn: &Connection, pallet_id: i64) -> RepositoryResult<Vec<ReceiptLine>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM pallet_receipts WHERE pallet_id = ?1 ORDER BY sku ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![pallet_id], map_row)?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

/// Lines of a pallet in insertion order (label grouping reads these).
pub fn list_for_pallet_by_id(
    conn: &Connection,
    pallet_id: i64,
) -> RepositoryResult<Vec<ReceiptLine>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM pallet_receipts WHERE pallet_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![pallet_id], map_row)?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

/// Every line of a project, ordered for the receipts export and the
/// SKU summaries.
pub fn list_for_project(conn: &Connection, project_id: i64) -> RepositoryResult<Vec<ReceiptLine>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM pallet_receipts WHERE project_id = ?1 \
         ORDER BY pallet_id ASC, sku ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![project_id], map_row)?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

pub fn count_for_pallet(conn: &Connection, pallet_id: i64) -> RepositoryResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pallet_receipts WHERE pallet_id = ?1",
        params![pallet_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Does any line on the pallet match the SKU-instance? Guard for client
/// comments.
pub fn instance_exists_on_pallet(
    conn: &Connection,
    pallet_id: i64,
    instance: &SkuInstance,
) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            r#"
            SELECT 1 FROM pallet_receipts
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
                format_expiry(instance.expiry),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
