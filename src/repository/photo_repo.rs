// ==========================================
// Receipt photo repository
// ==========================================
// Blobs are written and read whole through the blob column; callers
// stream them straight out to the response body.
// ==========================================

use crate::domain::PhotoUpload;
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

pub fn insert(
    conn: &Connection,
    now: NaiveDateTime,
    receipt_line_id: i64,
    photo: &PhotoUpload,
) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO receipt_photos (receipt_line_id, blob, mime, name, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            receipt_line_id,
            photo.data,
            photo.mime,
            photo.name,
            repository::format_datetime(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Ordered ids of the extra photos on a line.
pub fn ids_for_line(conn: &Connection, receipt_line_id: i64) -> RepositoryResult<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT id FROM receipt_photos WHERE receipt_line_id = ?1 ORDER BY id ASC")?;
    let rows = stmt.query_map(params![receipt_line_id], |row| row.get(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Fetch one extra photo: (blob, mime, name).
pub fn get_blob(
    conn: &Connection,
    photo_id: i64,
) -> RepositoryResult<Option<(Vec<u8>, String, String)>> {
    let found = conn
        .query_row(
            "SELECT blob, mime, name FROM receipt_photos WHERE id = ?1",
            params![photo_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    Ok(found)
}

/// Fetch the primary photo stored on the receipt line itself.
pub fn get_primary_blob(
    conn: &Connection,
    receipt_line_id: i64,
) -> RepositoryResult<Option<(Vec<u8>, String)>> {
    let found = conn
        .query_row(
            r#"
            SELECT stock_photo, stock_photo_mime FROM pallet_receipts
            WHERE id = ?1 AND stock_photo IS NOT NULL
            "#,
            params![receipt_line_id],
            |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            },
        )
        .optional()?;
    Ok(found)
}

pub fn delete_for_line(conn: &Connection, receipt_line_id: i64) -> RepositoryResult<usize> {
    let rows = conn.execute(
        "DELETE FROM receipt_photos WHERE receipt_line_id = ?1",
        params![receipt_line_id],
    )?;
    Ok(rows)
}
