// ==========================================
// SKU-instance summary projections
// ==========================================
// Project-wide aggregates of receipt lines grouped by the SKU-instance
// (sku, uom, batch, date(expiry)), plus the drill-down with a
// per-pallet breakdown, photo refs and client comments.
// ==========================================

use crate::domain::instance::SkuInstance;
use crate::domain::types::ContentFilter;
use crate::domain::{ClientComment, ReceiptLine};
use crate::projection::pallet_content::{is_expired, line_instance, PhotoRef};
use crate::projection::{format_opt_date_uk, Projections};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{comment_repo, photo_repo, receipt_repo};
use crate::store::CancelToken;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

/// One SKU-instance aggregate across all pallets of a project.
#[derive(Debug, Clone, Serialize)]
pub struct SkuSummaryRow {
    pub sku: String,
    pub uom: String,
    pub batch: String,
    pub expiry_date: Option<NaiveDate>,
    pub expiry_date_uk: String,
    pub total_qty: i64,
    pub success_qty: i64,
    pub unknown_qty: i64,
    pub damaged_qty: i64,
    pub has_comments: bool,
    pub has_client_comments: bool,
    pub has_photos: bool,
    pub is_expired: bool,
}

/// Per-pallet slice of one SKU-instance.
#[derive(Debug, Clone, Serialize)]
pub struct PalletBreakdownRow {
    pub pallet_id: i64,
    pub total_qty: i64,
    pub success_qty: i64,
    pub unknown_qty: i64,
    pub damaged_qty: i64,
    pub comments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkuDetailView {
    pub summary: SkuSummaryRow,
    pub pallets: Vec<PalletBreakdownRow>,
    pub photos: Vec<PhotoRef>,
    pub client_comments: Vec<ClientComment>,
}

impl Projections {
    /// Grouped summary for a project, `sku COLLATE NOCASE ASC, expiry
    /// ASC, batch ASC`, filtered at group level.
    pub fn sku_summary(
        &self,
        project_id: i64,
        filter: ContentFilter,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<SkuSummaryRow>> {
        let today = self.today();
        self.store.with_read_tx(cancel, |conn| {
            let lines = receipt_repo::list_for_project(conn, project_id)?;
            let groups = group_lines(&lines);

            let mut rows = Vec::new();
            for (instance, group) in groups {
                let row = summarise(conn, project_id, &instance, &group, today)?;
                if group_matches_filter(&row, filter) {
                    rows.push(row);
                }
            }
            sort_rows(&mut rows);
            Ok(rows)
        })
    }

    /// Drill-down for one SKU-instance. Fails with NotFound when no
    /// line of the project matches it.
    pub fn sku_detail(
        &self,
        project_id: i64,
        sku: &str,
        uom: &str,
        batch: Option<&str>,
        expiry: Option<NaiveDate>,
        cancel: &CancelToken,
    ) -> RepositoryResult<SkuDetailView> {
        let instance = SkuInstance::new(sku.trim(), uom, batch, expiry);
        let today = self.today();
        self.store.with_read_tx(cancel, |conn| {
            let lines: Vec<ReceiptLine> = receipt_repo::list_for_project(conn, project_id)?
                .into_iter()
                .filter(|line| {
                    instance.matches(
                        &line.sku,
                        &line.uom,
                        line.batch_number.as_deref(),
                        line.expiry_date,
                    )
                })
                .collect();
            if lines.iter().map(|l| l.qty).sum::<i64>() == 0 {
                return Err(RepositoryError::not_found("sku instance", &instance.sku));
            }

            let summary = summarise(conn, project_id, &instance, &lines, today)?;
            let pallets = pallet_breakdown(&lines);

            let mut photos = Vec::new();
            for line in &lines {
                if line.stock_photo_mime.is_some() {
                    photos.push(PhotoRef::Primary {
                        receipt_line_id: line.id,
                    });
                }
                for photo_id in photo_repo::ids_for_line(conn, line.id)? {
                    photos.push(PhotoRef::Extra { photo_id });
                }
            }

            let client_comments =
                comment_repo::list_for_instance_in_project(conn, project_id, &instance)?;

            Ok(SkuDetailView {
                summary,
                pallets,
                photos,
                client_comments,
            })
        })
    }
}

/// Group project lines by SKU-instance, preserving first-seen order
/// inside each group.
fn group_lines(lines: &[ReceiptLine]) -> Vec<(SkuInstance, Vec<ReceiptLine>)> {
    let mut groups: Vec<(SkuInstance, Vec<ReceiptLine>)> = Vec::new();
    for line in lines {
        let instance = line_instance(line);
        match groups.iter_mut().find(|(key, _)| *key == instance) {
            Some((_, group)) => group.push(line.clone()),
            None => groups.push((instance, vec![line.clone()])),
        }
    }
    groups
}

fn summarise(
    conn: &Connection,
    project_id: i64,
    instance: &SkuInstance,
    group: &[ReceiptLine],
    today: NaiveDate,
) -> RepositoryResult<SkuSummaryRow> {
    let expired = is_expired(instance.expiry, today);
    let mut row = SkuSummaryRow {
        sku: instance.sku.clone(),
        uom: instance.uom.clone(),
        batch: instance.batch.clone(),
        expiry_date: instance.expiry,
        expiry_date_uk: format_opt_date_uk(instance.expiry),
        total_qty: 0,
        success_qty: 0,
        unknown_qty: 0,
        damaged_qty: 0,
        has_comments: false,
        has_client_comments: false,
        has_photos: false,
        is_expired: expired,
    };

    for line in group {
        row.total_qty += line.qty;
        if line.unknown_sku {
            row.unknown_qty += line.qty;
        }
        if line.damaged {
            row.damaged_qty += line.qty;
        }
        if !line.unknown_sku && !line.damaged && !expired {
            row.success_qty += line.qty;
        }
        if !line.comment.trim().is_empty() {
            row.has_comments = true;
        }
        if !row.has_photos {
            row.has_photos = line.stock_photo_mime.is_some()
                || !photo_repo::ids_for_line(conn, line.id)?.is_empty();
        }
    }
    row.has_client_comments =
        comment_repo::exists_for_instance_in_project(conn, project_id, instance)?;
    Ok(row)
}

fn group_matches_filter(row: &SkuSummaryRow, filter: ContentFilter) -> bool {
    match filter {
        ContentFilter::All => true,
        ContentFilter::Success => row.success_qty > 0,
        ContentFilter::Unknown => row.unknown_qty > 0,
        ContentFilter::Damaged => row.damaged_qty > 0,
        ContentFilter::Expired => row.is_expired,
        ContentFilter::ClientComment => row.has_client_comments,
    }
}

/// NULL expiry sorts first, matching the store's ASC ordering.
fn sort_rows(rows: &mut [SkuSummaryRow]) {
    rows.sort_by(|a, b| {
        a.sku
            .to_lowercase()
            .cmp(&b.sku.to_lowercase())
            .then_with(|| a.expiry_date.cmp(&b.expiry_date))
            .then_with(|| a.batch.cmp(&b.batch))
    });
}

fn pallet_breakdown(lines: &[ReceiptLine]) -> Vec<PalletBreakdownRow> {
    let mut rows: Vec<PalletBreakdownRow> = Vec::new();
    for line in lines {
        let idx = match rows.iter().position(|r| r.pallet_id == line.pallet_id) {
            Some(idx) => idx,
            None => {
                rows.push(PalletBreakdownRow {
                    pallet_id: line.pallet_id,
                    total_qty: 0,
                    success_qty: 0,
                    unknown_qty: 0,
                    damaged_qty: 0,
                    comments: String::new(),
                });
                rows.len() - 1
            }
        };
        let row = &mut rows[idx];
        row.total_qty += line.qty;
        if line.unknown_sku {
            row.unknown_qty += line.qty;
        }
        if line.damaged {
            row.damaged_qty += line.qty;
        } else if !line.unknown_sku {
            row.success_qty += line.qty;
        }
        let comment = line.comment.trim();
        if !comment.is_empty() {
            if !row.comments.is_empty() {
                row.comments.push_str("; ");
            }
            row.comments.push_str(comment);
        }
    }
    rows.sort_by_key(|r| r.pallet_id);
    rows
}
