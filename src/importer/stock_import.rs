// ==========================================
// Stock catalogue CSV importer
// ==========================================
// Expected columns (header names matched case-insensitively, order
// free): sku, description, uom. Rows with a blank SKU are skipped and
// counted; the UNKNOWN placeholder is refused outright. The whole file
// lands in one write transaction with a single stock.import audit row.
// ==========================================

use crate::domain::types::AuditAction;
use crate::domain::types::ProjectStatus;
use crate::domain::UNKNOWN_SKU;
use crate::engine::Clock;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{audit_repo, project_repo, stock_repo};
use crate::store::{CancelToken, Store};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Outcome of one import run; also the audit "after" snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StockImportReport {
    pub rows_read: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
}

pub struct StockImporter {
    store: Store,
    clock: Clock,
}

impl StockImporter {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn import_path(
        &self,
        user_id: i64,
        project_id: i64,
        path: &Path,
        cancel: &CancelToken,
    ) -> RepositoryResult<StockImportReport> {
        let file = File::open(path)
            .map_err(|e| RepositoryError::Validation(format!("cannot open {}: {e}", path.display())))?;
        self.import_csv(user_id, project_id, file, cancel)
    }

    pub fn import_csv<R: Read>(
        &self,
        user_id: i64,
        project_id: i64,
        reader: R,
        cancel: &CancelToken,
    ) -> RepositoryResult<StockImportReport> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }

        let rows = parse_rows(reader)?;
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            match project_repo::get_status(tx, project_id)? {
                None => return Err(RepositoryError::not_found("project", project_id)),
                Some(ProjectStatus::Active) => {}
                Some(ProjectStatus::Inactive) => {
                    return Err(RepositoryError::ReadOnlyProject { project_id })
                }
            }

            let mut report = StockImportReport {
                rows_read: rows.len(),
                rows_imported: 0,
                rows_skipped: 0,
            };
            for row in &rows {
                if row.sku.is_empty() {
                    report.rows_skipped += 1;
                    continue;
                }
                if row.sku.eq_ignore_ascii_case(UNKNOWN_SKU) {
                    return Err(RepositoryError::Validation(format!(
                        "sku '{}' is reserved",
                        UNKNOWN_SKU
                    )));
                }
                stock_repo::upsert(tx, now, project_id, &row.sku, &row.description, &row.uom)?;
                report.rows_imported += 1;
            }

            audit_repo::write(
                tx,
                now,
                user_id,
                AuditAction::StockImport,
                "stock_items",
                &project_id.to_string(),
                None::<&StockImportReport>,
                Some(&report),
            )?;

            info!(
                project_id,
                imported = report.rows_imported,
                skipped = report.rows_skipped,
                "stock catalogue imported"
            );
            Ok(report)
        })
    }
}

#[derive(Debug)]
struct CsvRow {
    sku: String,
    description: String,
    uom: String,
}

fn parse_rows<R: Read>(reader: R) -> RepositoryResult<Vec<CsvRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let sku_idx = find_column(&headers, "sku")
        .ok_or_else(|| RepositoryError::Validation("missing 'sku' column".to_string()))?;
    let description_idx = find_column(&headers, "description");
    let uom_idx = find_column(&headers, "uom");

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        rows.push(CsvRow {
            sku: field(Some(sku_idx)),
            description: field(description_idx),
            uom: field(uom_idx),
        });
    }
    Ok(rows)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}
