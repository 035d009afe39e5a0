// ==========================================
// Closed-pallet label projections
// ==========================================
// Label data may only be produced for closed or labelled pallets. Label
// groups cover the sellable content: non-damaged, known-SKU lines,
// grouped by (description, batch, date(expiry)). The barcode printed on
// a group is chosen SKU-wide: the first non-empty item barcode observed
// for that SKU in insertion order, falling back to the first non-empty
// carton barcode.
// ==========================================

use crate::domain::instance::{normalize_batch, same_expiry};
use crate::domain::types::PalletStatus;
use crate::domain::{Pallet, ReceiptLine};
use crate::projection::{format_opt_date_uk, Projections};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{pallet_repo, project_repo, receipt_repo};
use crate::store::CancelToken;
use chrono::NaiveDate;
use serde::Serialize;

/// Header data for the pallet-level label.
#[derive(Debug, Clone, Serialize)]
pub struct PalletLabelData {
    pub pallet: Pallet,
    pub barcode: String,
    pub project_name: String,
    pub client_name: String,
    pub label_date_uk: String,
    pub line_count: i64,
}

/// One content label group.
#[derive(Debug, Clone, Serialize)]
pub struct LabelGroup {
    pub sku: String,
    pub description: String,
    pub batch: String,
    pub expiry_date_uk: String,
    pub client_name: String,
    pub total_qty: i64,
    pub qty_per_carton: i64,
    pub box_count: i64,
    pub label_date_uk: String,
    pub barcode_value: String,
}

impl Projections {
    pub fn closed_pallet_label_data(
        &self,
        pallet_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<PalletLabelData> {
        self.store.with_read_tx(cancel, |conn| {
            let pallet = load_closed_pallet(conn, pallet_id)?;
            let project = project_repo::get(conn, pallet.project_id)?
                .ok_or_else(|| RepositoryError::not_found("project", pallet.project_id))?;
            let line_count = receipt_repo::count_for_pallet(conn, pallet_id)?;

            Ok(PalletLabelData {
                barcode: pallet.barcode(),
                project_name: project.name,
                client_name: project.client_name,
                label_date_uk: format_opt_date_uk(pallet.closed_at.map(|at| at.date())),
                line_count,
                pallet,
            })
        })
    }

    pub fn closed_pallet_labels_data(
        &self,
        pallet_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<LabelGroup>> {
        self.store.with_read_tx(cancel, |conn| {
            let pallet = load_closed_pallet(conn, pallet_id)?;
            let project = project_repo::get(conn, pallet.project_id)?
                .ok_or_else(|| RepositoryError::not_found("project", pallet.project_id))?;
            let lines = receipt_repo::list_for_pallet_by_id(conn, pallet_id)?;
            let label_date = format_opt_date_uk(pallet.closed_at.map(|at| at.date()));

            Ok(build_groups(&lines, &project.client_name, &label_date))
        })
    }
}

fn load_closed_pallet(
    conn: &rusqlite::Connection,
    pallet_id: i64,
) -> RepositoryResult<Pallet> {
    let pallet = pallet_repo::get(conn, pallet_id)?
        .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
    if !matches!(pallet.status, PalletStatus::Closed | PalletStatus::Labelled) {
        return Err(RepositoryError::PalletNotClosed { pallet_id });
    }
    Ok(pallet)
}

struct GroupKey {
    description: String,
    batch: String,
    expiry: Option<NaiveDate>,
}

impl GroupKey {
    fn matches(&self, line: &ReceiptLine) -> bool {
        self.description == line.description
            && self.batch == normalize_batch(line.batch_number.as_deref())
            && same_expiry(self.expiry, line.expiry_date)
    }
}

/// Build label groups from the pallet's lines in insertion order.
fn build_groups(lines: &[ReceiptLine], client_name: &str, label_date: &str) -> Vec<LabelGroup> {
    let sellable: Vec<&ReceiptLine> = lines
        .iter()
        .filter(|line| !line.damaged && !line.unknown_sku)
        .collect();

    let mut keys: Vec<GroupKey> = Vec::new();
    let mut groups: Vec<LabelGroup> = Vec::new();
    for line in &sellable {
        let position = keys.iter().position(|key| key.matches(line));
        match position {
            Some(idx) => {
                let group = &mut groups[idx];
                group.total_qty += line.qty;
                group.box_count = box_count(group.total_qty, group.qty_per_carton);
            }
            None => {
                keys.push(GroupKey {
                    description: line.description.clone(),
                    batch: normalize_batch(line.batch_number.as_deref()),
                    expiry: line.expiry_date,
                });
                groups.push(LabelGroup {
                    sku: line.sku.clone(),
                    description: line.description.clone(),
                    batch: normalize_batch(line.batch_number.as_deref()),
                    expiry_date_uk: format_opt_date_uk(line.expiry_date),
                    client_name: client_name.to_string(),
                    total_qty: line.qty,
                    qty_per_carton: line.case_size,
                    box_count: box_count(line.qty, line.case_size),
                    label_date_uk: label_date.to_string(),
                    barcode_value: String::new(),
                });
            }
        }
    }

    for group in &mut groups {
        group.barcode_value = sku_barcode(&sellable, &group.sku);
    }
    groups
}

fn box_count(total_qty: i64, case_size: i64) -> i64 {
    if case_size <= 0 {
        return total_qty;
    }
    (total_qty + case_size - 1) / case_size
}

/// First non-empty item barcode for the SKU in insertion order, then
/// first non-empty carton barcode.
fn sku_barcode(lines: &[&ReceiptLine], sku: &str) -> String {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    lines
        .iter()
        .filter(|line| line.sku == sku)
        .find_map(|line| non_empty(&line.item_barcode))
        .or_else(|| {
            lines
                .iter()
                .filter(|line| line.sku == sku)
                .find_map(|line| non_empty(&line.carton_barcode))
        })
        .unwrap_or_default()
}
