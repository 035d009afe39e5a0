// ==========================================
// AuditLogger - audit log repository
// ==========================================
// One write path. Rows are inserted inside the caller's transaction so
// the audit record commits or rolls back with the mutation itself.
// Snapshots are canonical JSON; an absent snapshot is the empty string.
// ==========================================

use crate::domain::types::AuditAction;
use crate::domain::AuditRecord;
use crate::repository::{self, error::RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

fn map_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: row.get(2)?,
        entity_kind: row.get(3)?,
        entity_id: row.get(4)?,
        before_json: row.get(5)?,
        after_json: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Write one audit row inside the caller's transaction.
///
/// # Arguments
/// - `before` / `after`: entity snapshots; `None` serialises as ""
pub fn write<B: Serialize, A: Serialize>(
    conn: &Connection,
    now: NaiveDateTime,
    user_id: i64,
    action: AuditAction,
    entity_kind: &str,
    entity_id: &str,
    before: Option<&B>,
    after: Option<&A>,
) -> RepositoryResult<i64> {
    let before_json = match before {
        Some(value) => serde_json::to_string(value)?,
        None => String::new(),
    };
    let after_json = match after {
        Some(value) => serde_json::to_string(value)?,
        None => String::new(),
    };

    conn.execute(
        r#"
        INSERT INTO audit_logs (user_id, action, entity_kind, entity_id, before_json, after_json, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            user_id,
            action.as_str(),
            entity_kind,
            entity_id,
            before_json,
            after_json,
            repository::format_datetime(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit rows for one entity, newest first.
pub fn list_for_entity(
    conn: &Connection,
    entity_kind: &str,
    entity_id: &str,
) -> RepositoryResult<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_id, action, entity_kind, entity_id, before_json, after_json, created_at
        FROM audit_logs
        WHERE entity_kind = ?1 AND entity_id = ?2
        ORDER BY created_at DESC, id DESC
        "#,
    )?;
    let rows = stmt.query_map(params![entity_kind, entity_id], map_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Every audit row of one entity kind, newest first. The pallet event
/// log scans receipt audits this way and filters structurally.
pub fn list_for_kind(conn: &Connection, entity_kind: &str) -> RepositoryResult<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_id, action, entity_kind, entity_id, before_json, after_json, created_at
        FROM audit_logs
        WHERE entity_kind = ?1
        ORDER BY created_at DESC, id DESC
        "#,
    )?;
    let rows = stmt.query_map(params![entity_kind], map_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}
