// ==========================================
// Pallet content projection
// ==========================================
// The operator-facing pallet view: header plus filtered content lines
// with per-row expired/photo/client-comment flags, and the single-line
// detail view with photo ids and matching client comments.
// ==========================================

use crate::domain::instance::SkuInstance;
use crate::domain::types::ContentFilter;
use crate::domain::{ClientComment, Pallet, ReceiptLine};
use crate::projection::{format_opt_date_uk, Projections};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{comment_repo, pallet_repo, photo_repo, receipt_repo, user_repo};
use crate::store::CancelToken;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

/// One row of the pallet content table.
#[derive(Debug, Clone, Serialize)]
pub struct ContentLine {
    pub id: i64,
    pub sku: String,
    pub description: String,
    pub uom: String,
    pub comment: String,
    pub has_photos: bool,
    pub has_client_comments: bool,
    pub qty: i64,
    pub case_size: i64,
    pub unknown_sku: bool,
    pub damaged: bool,
    pub batch_number: String,
    pub expiry_date_uk: String,
    pub expired: bool,
    pub scanned_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PalletContentView {
    pub pallet: Pallet,
    pub filter: String,
    pub lines: Vec<ContentLine>,
}

/// Reference to one displayable photo of a line. The primary blob lives
/// on the line row, extras have their own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PhotoRef {
    Primary { receipt_line_id: i64 },
    Extra { photo_id: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct LineDetailView {
    pub pallet: Pallet,
    pub line: ContentLine,
    pub photos: Vec<PhotoRef>,
    pub client_comments: Vec<ClientComment>,
}

impl Projections {
    /// Pallet header plus content lines, `sku ASC, id ASC`, filtered.
    pub fn pallet_content(
        &self,
        pallet_id: i64,
        filter: ContentFilter,
        cancel: &CancelToken,
    ) -> RepositoryResult<PalletContentView> {
        let today = self.today();
        self.store.with_read_tx(cancel, |conn| {
            let pallet = pallet_repo::get(conn, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;

            let mut lines = Vec::new();
            for line in receipt_repo::list_for_pallet(conn, pallet_id)? {
                if !matches_filter(conn, &line, filter, today)? {
                    continue;
                }
                lines.push(content_line(conn, &line, today)?);
            }

            Ok(PalletContentView {
                pallet,
                filter: filter.to_string(),
                lines,
            })
        })
    }

    /// One line in full: flags, photo refs in display order (primary
    /// first), and all client comments on its instance.
    pub fn pallet_line_detail(
        &self,
        pallet_id: i64,
        receipt_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<LineDetailView> {
        let today = self.today();
        self.store.with_read_tx(cancel, |conn| {
            let pallet = pallet_repo::get(conn, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
            let line = receipt_repo::get_on_pallet(conn, pallet_id, receipt_id)?
                .ok_or_else(|| RepositoryError::not_found("receipt line", receipt_id))?;

            let mut photos = Vec::new();
            if line.stock_photo_mime.is_some() {
                photos.push(PhotoRef::Primary {
                    receipt_line_id: line.id,
                });
            }
            for photo_id in photo_repo::ids_for_line(conn, line.id)? {
                photos.push(PhotoRef::Extra { photo_id });
            }

            let instance = line_instance(&line);
            let client_comments =
                comment_repo::list_for_instance_on_pallet(conn, pallet_id, &instance)?;

            Ok(LineDetailView {
                pallet,
                line: content_line(conn, &line, today)?,
                photos,
                client_comments,
            })
        })
    }
}

pub(crate) fn line_instance(line: &ReceiptLine) -> SkuInstance {
    SkuInstance::new(
        &line.sku,
        &line.uom,
        line.batch_number.as_deref(),
        line.expiry_date,
    )
}

pub(crate) fn is_expired(expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
    matches!(expiry, Some(date) if date < today)
}

fn matches_filter(
    conn: &Connection,
    line: &ReceiptLine,
    filter: ContentFilter,
    today: NaiveDate,
) -> RepositoryResult<bool> {
    let expired = is_expired(line.expiry_date, today);
    Ok(match filter {
        ContentFilter::All => true,
        ContentFilter::Success => !line.unknown_sku && !line.damaged && !expired,
        ContentFilter::Unknown => line.unknown_sku,
        ContentFilter::Damaged => line.damaged,
        ContentFilter::Expired => expired,
        ContentFilter::ClientComment => {
            comment_repo::exists_for_instance_on_pallet(conn, line.pallet_id, &line_instance(line))?
        }
    })
}

fn content_line(
    conn: &Connection,
    line: &ReceiptLine,
    today: NaiveDate,
) -> RepositoryResult<ContentLine> {
    let has_photos =
        line.stock_photo_mime.is_some() || !photo_repo::ids_for_line(conn, line.id)?.is_empty();
    let has_client_comments =
        comment_repo::exists_for_instance_on_pallet(conn, line.pallet_id, &line_instance(line))?;
    let scanned_by = user_repo::username_of(conn, line.scanned_by_user_id)?
        .unwrap_or_else(|| format!("user {}", line.scanned_by_user_id));

    Ok(ContentLine {
        id: line.id,
        sku: line.sku.clone(),
        description: line.description.clone(),
        uom: line.uom.clone(),
        comment: line.comment.clone(),
        has_photos,
        has_client_comments,
        qty: line.qty,
        case_size: line.case_size,
        unknown_sku: line.unknown_sku,
        damaged: line.damaged,
        batch_number: line.batch_number.clone().unwrap_or_default(),
        expiry_date_uk: format_opt_date_uk(line.expiry_date),
        expired: is_expired(line.expiry_date, today),
        scanned_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired_boundaries() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        assert!(!is_expired(None, today));
        assert!(!is_expired(Some(today), today));
        assert!(!is_expired(today.succ_opt(), today));
        assert!(is_expired(today.pred_opt(), today));
    }
}
