// ==========================================
// Warehouse Receipting - data access layer
// ==========================================
// Repository modules are plain functions over &rusqlite::Connection so
// one engine transaction can span every table. No business logic here,
// only data mapping.
// ==========================================

pub mod audit_repo;
pub mod comment_repo;
pub mod error;
pub mod export_repo;
pub mod pallet_repo;
pub mod photo_repo;
pub mod project_repo;
pub mod receipt_repo;
pub mod stock_repo;
pub mod user_repo;

pub use error::{RepositoryError, RepositoryResult};

use chrono::{NaiveDate, NaiveDateTime};

/// Storage format for timestamps (matches SQLite datetime('now')).
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for dates.
pub const DATE_FMT: &str = "%Y-%m-%d";

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

/// Parse a stored timestamp. Tolerates the ISO 'T' separator for rows
/// written by older tooling.
pub fn parse_datetime(s: &str) -> RepositoryResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| RepositoryError::Internal(format!("bad timestamp {s:?}: {e}")))
}

pub fn parse_opt_datetime(s: Option<String>) -> RepositoryResult<Option<NaiveDateTime>> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a stored date, accepting a full timestamp and truncating it.
pub fn parse_date(s: &str) -> RepositoryResult<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FMT) {
        return Ok(d);
    }
    parse_datetime(s).map(|dt| dt.date())
}

pub fn parse_opt_date(s: Option<String>) -> RepositoryResult<Option<NaiveDate>> {
    s.map(|s| parse_date(&s)).transpose()
}
