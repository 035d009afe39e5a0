// ==========================================
// CSV exports
// ==========================================
// Two outbound contracts with fixed headers: the per-pallet receipts
// dump and the pallet status summary. Dates are UK format; absent
// values serialise as empty strings. Every run is recorded in
// export_runs.
// ==========================================

use crate::engine::Clock;
use crate::projection::{format_opt_date_uk, format_opt_datetime_uk, format_datetime_uk};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{export_repo, pallet_repo, project_repo, receipt_repo};
use crate::store::{CancelToken, Store};
use std::io::Write;
use tracing::info;

pub const RECEIPTS_CSV_HEADER: [&str; 9] = [
    "pallet_id",
    "sku",
    "description",
    "qty",
    "case_size",
    "item_barcode",
    "carton_barcode",
    "expiry",
    "batch_number",
];

pub const PALLET_STATUS_CSV_HEADER: [&str; 6] = [
    "pallet_id",
    "status",
    "line_count",
    "created_at",
    "closed_at",
    "reopened_at",
];

pub struct Exporter {
    store: Store,
    clock: Clock,
}

impl Exporter {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Write the receipts CSV for a project. Returns the data row count.
    pub fn receipts_csv<W: Write>(
        &self,
        user_id: Option<i64>,
        project_id: i64,
        writer: W,
        cancel: &CancelToken,
    ) -> RepositoryResult<usize> {
        let lines = self.store.with_read_tx(cancel, |conn| {
            if project_repo::get_status(conn, project_id)?.is_none() {
                return Err(RepositoryError::not_found("project", project_id));
            }
            receipt_repo::list_for_project(conn, project_id)
        })?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(RECEIPTS_CSV_HEADER)?;
        for line in &lines {
            csv_writer.write_record([
                line.pallet_id.to_string(),
                line.sku.clone(),
                line.description.clone(),
                line.qty.to_string(),
                line.case_size.to_string(),
                line.item_barcode.clone().unwrap_or_default(),
                line.carton_barcode.clone().unwrap_or_default(),
                format_opt_date_uk(line.expiry_date),
                line.batch_number.clone().unwrap_or_default(),
            ])?;
        }
        csv_writer
            .flush()
            .map_err(|e| RepositoryError::Internal(e.to_string()))?;

        self.record_run(user_id, project_id, "receipts", cancel)?;
        info!(project_id, rows = lines.len(), "receipts exported");
        Ok(lines.len())
    }

    /// Write the pallet status CSV for a project. Returns the data row
    /// count.
    pub fn pallet_status_csv<W: Write>(
        &self,
        user_id: Option<i64>,
        project_id: i64,
        writer: W,
        cancel: &CancelToken,
    ) -> RepositoryResult<usize> {
        let rows = self.store.with_read_tx(cancel, |conn| {
            if project_repo::get_status(conn, project_id)?.is_none() {
                return Err(RepositoryError::not_found("project", project_id));
            }
            let pallets = pallet_repo::list_for_project(conn, project_id)?;
            let mut rows = Vec::with_capacity(pallets.len());
            for pallet in pallets {
                let line_count = receipt_repo::count_for_pallet(conn, pallet.id)?;
                rows.push((pallet, line_count));
            }
            Ok(rows)
        })?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(PALLET_STATUS_CSV_HEADER)?;
        for (pallet, line_count) in &rows {
            csv_writer.write_record([
                pallet.id.to_string(),
                pallet.status.to_string(),
                line_count.to_string(),
                format_datetime_uk(pallet.created_at),
                format_opt_datetime_uk(pallet.closed_at),
                format_opt_datetime_uk(pallet.reopened_at),
            ])?;
        }
        csv_writer
            .flush()
            .map_err(|e| RepositoryError::Internal(e.to_string()))?;

        self.record_run(user_id, project_id, "pallet_status", cancel)?;
        info!(project_id, rows = rows.len(), "pallet status exported");
        Ok(rows.len())
    }

    fn record_run(
        &self,
        user_id: Option<i64>,
        project_id: i64,
        export_type: &str,
        cancel: &CancelToken,
    ) -> RepositoryResult<()> {
        let now = self.clock.now();
        self.store.with_write_tx(cancel, |tx| {
            export_repo::insert(tx, now, user_id, Some(project_id), export_type)?;
            Ok(())
        })
    }
}
