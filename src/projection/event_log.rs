// ==========================================
// Pallet event log projection
// ==========================================
// Union of the pallet's own audit rows and the receipt audits whose
// snapshots reference the pallet. Receipt matching is structural: the
// snapshot JSON is parsed and its pallet id compared, never substring
// matched. Legacy pallets without a pallet.create audit get one
// synthesised from created_at with actor "system".
// ==========================================

use crate::domain::types::AuditAction;
use crate::domain::AuditRecord;
use crate::projection::{format_opt_date_uk, Projections};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{audit_repo, pallet_repo, user_repo};
use crate::store::CancelToken;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct PalletEvent {
    pub timestamp: NaiveDateTime,
    pub actor: String,
    pub action: String,
    pub details: String,
}

impl Projections {
    /// Full history of one pallet, newest first.
    pub fn pallet_event_log(
        &self,
        pallet_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<PalletEvent>> {
        self.store.with_read_tx(cancel, |conn| {
            let pallet = pallet_repo::get(conn, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;

            let mut records: Vec<AuditRecord> =
                audit_repo::list_for_entity(conn, "pallets", &pallet_id.to_string())?;
            for record in audit_repo::list_for_kind(conn, "pallet_receipts")? {
                if snapshot_references_pallet(&record, pallet_id) {
                    records.push(record);
                }
            }
            records.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });

            let mut events = Vec::with_capacity(records.len() + 1);
            let mut saw_create = false;
            for record in &records {
                if record.action == AuditAction::PalletCreate.as_str() {
                    saw_create = true;
                }
                events.push(PalletEvent {
                    timestamp: record.created_at,
                    actor: actor_name(conn, record.user_id)?,
                    action: record.action.clone(),
                    details: details_for(record),
                });
            }

            if !saw_create {
                events.push(PalletEvent {
                    timestamp: pallet.created_at,
                    actor: "system".to_string(),
                    action: AuditAction::PalletCreate.to_string(),
                    details: format!("pallet {} created", pallet.id),
                });
            }
            Ok(events)
        })
    }
}

/// Does either snapshot of a receipt audit carry this pallet id?
/// Current rows use "pallet_id"; rows imported from the previous system
/// used "PalletID".
fn snapshot_references_pallet(record: &AuditRecord, pallet_id: i64) -> bool {
    [record.before(), record.after()]
        .into_iter()
        .flatten()
        .any(|snapshot| extract_pallet_id(&snapshot) == Some(pallet_id))
}

fn extract_pallet_id(snapshot: &Value) -> Option<i64> {
    snapshot
        .get("pallet_id")
        .or_else(|| snapshot.get("PalletID"))
        .and_then(Value::as_i64)
}

fn actor_name(conn: &Connection, user_id: i64) -> RepositoryResult<String> {
    if user_id <= 0 {
        return Ok("system".to_string());
    }
    Ok(user_repo::username_of(conn, user_id)?.unwrap_or_else(|| format!("user {user_id}")))
}

/// Per-action detail string. Pallet events describe the status change;
/// receipt events describe the line from the surviving snapshot.
fn details_for(record: &AuditRecord) -> String {
    match record.action_enum() {
        Some(
            AuditAction::PalletCreate
            | AuditAction::PalletClose
            | AuditAction::PalletReopen
            | AuditAction::PalletCancel
            | AuditAction::PalletLabelled,
        ) => pallet_details(record),
        Some(
            AuditAction::ReceiptCreate
            | AuditAction::ReceiptMerge
            | AuditAction::ReceiptUpdate
            | AuditAction::ReceiptDelete,
        ) => receipt_details(record),
        _ => String::new(),
    }
}

fn status_of(snapshot: Option<Value>) -> Option<String> {
    snapshot?
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn pallet_details(record: &AuditRecord) -> String {
    match (status_of(record.before()), status_of(record.after())) {
        (Some(from), Some(to)) => format!("status {from} -> {to}"),
        (None, Some(to)) => format!("status {to}"),
        _ => String::new(),
    }
}

fn receipt_details(record: &AuditRecord) -> String {
    let Some(snapshot) = record.after().or_else(|| record.before()) else {
        return String::new();
    };
    let str_of = |key: &str| {
        snapshot
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    let int_of = |key: &str| snapshot.get(key).and_then(Value::as_i64).unwrap_or(0);
    let bool_of = |key: &str| {
        snapshot
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    let mut details = format!(
        "line {}: {} x {} ({}), case {}",
        int_of("id"),
        int_of("qty"),
        str_of("sku"),
        str_of("uom"),
        int_of("case_size"),
    );
    let description = str_of("description");
    if !description.is_empty() {
        details.push_str(&format!(" {description}"));
    }
    let batch = str_of("batch_number");
    if !batch.is_empty() {
        details.push_str(&format!(", batch {batch}"));
    }
    if let Some(expiry) = snapshot.get("expiry_date").and_then(Value::as_str) {
        let uk = chrono::NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
            .map(|d| format_opt_date_uk(Some(d)))
            .unwrap_or_else(|_| expiry.to_string());
        details.push_str(&format!(", expiry {uk}"));
    }
    if bool_of("unknown_sku") {
        details.push_str(", unknown sku");
    }
    if bool_of("damaged") {
        details.push_str(", damaged");
    }
    details
}
