// ==========================================
// Warehouse Receipting - audit record
// ==========================================
// Append-only. before/after are canonical JSON snapshots of the entity;
// an empty string means "not applicable" (e.g. before on create).
// ==========================================

use crate::domain::types::AuditAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub before_json: String,
    pub after_json: String,
    pub created_at: NaiveDateTime,
}

impl AuditRecord {
    /// Parse the action string; legacy rows may carry actions the current
    /// code no longer emits, so this is optional.
    pub fn action_enum(&self) -> Option<AuditAction> {
        AuditAction::parse(&self.action)
    }

    pub fn before(&self) -> Option<serde_json::Value> {
        parse_snapshot(&self.before_json)
    }

    pub fn after(&self) -> Option<serde_json::Value> {
        parse_snapshot(&self.after_json)
    }
}

fn parse_snapshot(raw: &str) -> Option<serde_json::Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

/// Export-run telemetry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRun {
    pub id: i64,
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub export_type: String,
    pub created_at: NaiveDateTime,
}
