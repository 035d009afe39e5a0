// ==========================================
// Warehouse Receipting - domain type definitions
// ==========================================
// The variant kinds of the system are closed enumerated sets:
// project status, pallet status, content filter, audit action.
// Serialisation format: lowercase strings, matching the database.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Project status
// ==========================================
// Inactive projects are read-only for receipts, pallet lifecycle and the
// stock catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Inactive,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => ProjectStatus::Active,
            _ => ProjectStatus::Inactive,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Pallet status
// ==========================================
// State machine: created -> open -> closed <-> open, closed -> labelled,
// and any non-cancelled state -> cancelled. No reverse from labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PalletStatus {
    Created,
    Open,
    Closed,
    Labelled,
    Cancelled,
}

impl PalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PalletStatus::Created => "created",
            PalletStatus::Open => "open",
            PalletStatus::Closed => "closed",
            PalletStatus::Labelled => "labelled",
            PalletStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(PalletStatus::Created),
            "open" => Some(PalletStatus::Open),
            "closed" => Some(PalletStatus::Closed),
            "labelled" => Some(PalletStatus::Labelled),
            "cancelled" => Some(PalletStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Content filter
// ==========================================
// Shared by the pallet-content and SKU-summary projections. The
// client_comment value is admin-only; the shell sanitises it to All for
// non-admin callers before it reaches the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFilter {
    #[default]
    All,
    Success,
    Unknown,
    Damaged,
    Expired,
    ClientComment,
}

impl ContentFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFilter::All => "all",
            ContentFilter::Success => "success",
            ContentFilter::Unknown => "unknown",
            ContentFilter::Damaged => "damaged",
            ContentFilter::Expired => "expired",
            ContentFilter::ClientComment => "client_comment",
        }
    }

    /// Parse a query-string value; anything unrecognised falls back to All.
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => ContentFilter::Success,
            "unknown" => ContentFilter::Unknown,
            "damaged" => ContentFilter::Damaged,
            "expired" => ContentFilter::Expired,
            "client_comment" => ContentFilter::ClientComment,
            _ => ContentFilter::All,
        }
    }
}

impl fmt::Display for ContentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Audit action
// ==========================================
// Stored as dotted strings in audit_logs.action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    ReceiptCreate,
    ReceiptMerge,
    ReceiptUpdate,
    ReceiptDelete,
    PalletCreate,
    PalletClose,
    PalletReopen,
    PalletCancel,
    PalletLabelled,
    ProjectCreate,
    ProjectActivate,
    ProjectStatus,
    StockImport,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ReceiptCreate => "receipt.create",
            AuditAction::ReceiptMerge => "receipt.merge",
            AuditAction::ReceiptUpdate => "receipt.update",
            AuditAction::ReceiptDelete => "receipt.delete",
            AuditAction::PalletCreate => "pallet.create",
            AuditAction::PalletClose => "pallet.close",
            AuditAction::PalletReopen => "pallet.reopen",
            AuditAction::PalletCancel => "pallet.cancel",
            AuditAction::PalletLabelled => "pallet.labelled",
            AuditAction::ProjectCreate => "project.create",
            AuditAction::ProjectActivate => "project.activate",
            AuditAction::ProjectStatus => "project.status",
            AuditAction::StockImport => "stock.import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt.create" => Some(AuditAction::ReceiptCreate),
            "receipt.merge" => Some(AuditAction::ReceiptMerge),
            "receipt.update" => Some(AuditAction::ReceiptUpdate),
            "receipt.delete" => Some(AuditAction::ReceiptDelete),
            "pallet.create" => Some(AuditAction::PalletCreate),
            "pallet.close" => Some(AuditAction::PalletClose),
            "pallet.reopen" => Some(AuditAction::PalletReopen),
            "pallet.cancel" => Some(AuditAction::PalletCancel),
            "pallet.labelled" => Some(AuditAction::PalletLabelled),
            "project.create" => Some(AuditAction::ProjectCreate),
            "project.activate" => Some(AuditAction::ProjectActivate),
            "project.status" => Some(AuditAction::ProjectStatus),
            "stock.import" => Some(AuditAction::StockImport),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pallet_status_round_trip() {
        for status in [
            PalletStatus::Created,
            PalletStatus::Open,
            PalletStatus::Closed,
            PalletStatus::Labelled,
            PalletStatus::Cancelled,
        ] {
            assert_eq!(PalletStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PalletStatus::parse("bogus"), None);
    }

    #[test]
    fn test_filter_parse_falls_back_to_all() {
        assert_eq!(ContentFilter::parse("damaged"), ContentFilter::Damaged);
        assert_eq!(ContentFilter::parse(""), ContentFilter::All);
        assert_eq!(ContentFilter::parse("nonsense"), ContentFilter::All);
    }

    #[test]
    fn test_audit_action_strings() {
        assert_eq!(AuditAction::ReceiptMerge.as_str(), "receipt.merge");
        assert_eq!(
            AuditAction::parse("pallet.reopen"),
            Some(AuditAction::PalletReopen)
        );
        assert_eq!(AuditAction::parse("x"), None);
    }
}
