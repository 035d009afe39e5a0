// ==========================================
// ReceiptEngine - the merge/split core
// ==========================================
// One operator scan becomes up to two stored lines (damage split), each
// of which either merges into an existing line under the instance key
// or inserts a new one. Media attaches to the damaged segment when one
// exists, otherwise to the first segment. Everything, audit included,
// happens inside a single write transaction.
// ==========================================

use crate::domain::instance::{normalize_batch, InstanceKey};
use crate::domain::types::{AuditAction, PalletStatus, ProjectStatus};
use crate::domain::{
    LineUpdate, Pallet, PhotoUpload, ReceiptInput, ReceiptLine, UNKNOWN_DESCRIPTION, UNKNOWN_SKU,
};
use crate::engine::Clock;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{audit_repo, pallet_repo, photo_repo, project_repo, receipt_repo, stock_repo};
use crate::store::{CancelToken, Store};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{debug, info};

/// Upload cap per image.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub struct ReceiptEngine {
    store: Store,
    clock: Clock,
}

/// One logical slice of an input after the damage split.
#[derive(Debug, Clone, Copy)]
struct Segment {
    qty: i64,
    damaged: bool,
    media: bool,
}

impl ReceiptEngine {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Ingest one scan. Returns the stored lines the input ended up in
    /// (merged or inserted), in segment order.
    pub fn save_receipt(
        &self,
        user_id: i64,
        mut input: ReceiptInput,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<ReceiptLine>> {
        validate_input(user_id, &mut input)?;
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let pallet = load_writable_pallet(tx, input.pallet_id)?;

            let segments = split_segments(&input);
            let mut written = Vec::with_capacity(segments.len());
            for segment in &segments {
                written.push(apply_segment(tx, now, user_id, &pallet, &input, segment)?);
            }

            if !input.unknown_sku {
                stock_repo::upsert(
                    tx,
                    now,
                    pallet.project_id,
                    &input.sku,
                    &input.description,
                    &input.uom,
                )?;
            }

            // First line on a fresh pallet promotes it. The receipt audit
            // row already records the cause, so no pallet audit here.
            if pallet.status == PalletStatus::Created {
                let mut promoted = pallet.clone();
                promoted.status = PalletStatus::Open;
                promoted.reopened_at = None;
                pallet_repo::update_status(tx, &promoted)?;
                debug!(pallet_id = pallet.id, "pallet promoted to open");
            }

            info!(
                pallet_id = pallet.id,
                sku = %input.sku,
                segments = segments.len(),
                "receipt saved"
            );
            Ok(written)
        })
    }

    /// Admin edit of one stored line. Pallet must be open (or still
    /// created), the project active.
    pub fn update_line(
        &self,
        user_id: i64,
        mut update: LineUpdate,
        cancel: &CancelToken,
    ) -> RepositoryResult<ReceiptLine> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        normalize_update(&mut update)?;
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let before = load_editable_line(tx, update.pallet_id, update.receipt_id)?;

            let sku = update.sku.trim();
            if sku.is_empty() && !before.unknown_sku {
                return Err(RepositoryError::Validation("sku is required".to_string()));
            }

            let mut line = before.clone();
            // Unknown lines keep their placeholder sku when none is given
            if !sku.is_empty() {
                line.sku = sku.to_string();
            }
            line.description = update.description.clone();
            line.uom = update.uom.clone();
            line.comment = update.comment.clone();
            line.qty = update.qty;
            line.case_size = update.case_size;
            line.damaged = update.damaged;
            line.damaged_qty = if update.damaged { update.qty } else { 0 };
            line.batch_number = update.batch_number.clone();
            line.expiry_date = update.expiry_date;
            line.updated_at = now;
            receipt_repo::update(tx, &line)?;

            if !line.unknown_sku {
                stock_repo::upsert(
                    tx,
                    now,
                    line.project_id,
                    &line.sku,
                    &line.description,
                    &line.uom,
                )?;
            }

            audit_repo::write(
                tx,
                now,
                user_id,
                AuditAction::ReceiptUpdate,
                "pallet_receipts",
                &line.id.to_string(),
                Some(&before),
                Some(&line),
            )?;
            Ok(line)
        })
    }

    /// Remove one line and its photos. Same guards as update_line.
    pub fn delete_line(
        &self,
        user_id: i64,
        pallet_id: i64,
        receipt_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<()> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let before = load_editable_line(tx, pallet_id, receipt_id)?;

            photo_repo::delete_for_line(tx, before.id)?;
            receipt_repo::delete(tx, before.id)?;

            audit_repo::write(
                tx,
                now,
                user_id,
                AuditAction::ReceiptDelete,
                "pallet_receipts",
                &before.id.to_string(),
                Some(&before),
                None::<&ReceiptLine>,
            )?;

            info!(pallet_id, receipt_id, "receipt line deleted");
            Ok(())
        })
    }
}

// ==========================================
// Guards
// ==========================================

/// Pallet that may receive new lines: project active, pallet not
/// cancelled. Closed and labelled pallets still accept scans.
fn load_writable_pallet(conn: &Connection, pallet_id: i64) -> RepositoryResult<Pallet> {
    let pallet = pallet_repo::get(conn, pallet_id)?
        .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
    require_active_project(conn, pallet.project_id)?;
    if pallet.status == PalletStatus::Cancelled {
        return Err(RepositoryError::ReadOnlyPallet {
            pallet_id,
            status: pallet.status.to_string(),
        });
    }
    Ok(pallet)
}

/// Line that may be edited or deleted: pallet open (or created).
fn load_editable_line(
    conn: &Connection,
    pallet_id: i64,
    receipt_id: i64,
) -> RepositoryResult<ReceiptLine> {
    let line = receipt_repo::get_on_pallet(conn, pallet_id, receipt_id)?
        .ok_or_else(|| RepositoryError::not_found("receipt line", receipt_id))?;
    let pallet = pallet_repo::get(conn, pallet_id)?
        .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
    require_active_project(conn, pallet.project_id)?;
    if !matches!(pallet.status, PalletStatus::Open | PalletStatus::Created) {
        return Err(RepositoryError::ReadOnlyPallet {
            pallet_id,
            status: pallet.status.to_string(),
        });
    }
    Ok(line)
}

fn require_active_project(conn: &Connection, project_id: i64) -> RepositoryResult<()> {
    match project_repo::get_status(conn, project_id)? {
        None => Err(RepositoryError::not_found("project", project_id)),
        Some(ProjectStatus::Active) => Ok(()),
        Some(ProjectStatus::Inactive) => Err(RepositoryError::ReadOnlyProject { project_id }),
    }
}

// ==========================================
// Validation and split
// ==========================================

/// Fail fast with the first violated rule, normalising as we go.
fn validate_input(user_id: i64, input: &mut ReceiptInput) -> RepositoryResult<()> {
    if user_id <= 0 {
        return Err(RepositoryError::Validation(
            "user id must be positive".to_string(),
        ));
    }

    input.sku = input.sku.trim().to_string();
    if input.unknown_sku {
        if input.sku.is_empty() {
            input.sku = UNKNOWN_SKU.to_string();
        }
        if input.description.trim().is_empty() {
            input.description = UNKNOWN_DESCRIPTION.to_string();
        }
        if input.primary_photo.is_none() && input.extra_photos.is_empty() {
            return Err(RepositoryError::Validation(
                "unknown sku requires at least one photo".to_string(),
            ));
        }
    } else if input.sku.is_empty() {
        return Err(RepositoryError::Validation("sku is required".to_string()));
    }

    if input.qty <= 0 {
        return Err(RepositoryError::Validation(
            "qty must be greater than zero".to_string(),
        ));
    }
    if input.case_size <= 0 {
        input.case_size = 1;
    }
    if input.damaged_qty < 0 {
        return Err(RepositoryError::Validation(
            "damaged qty cannot be negative".to_string(),
        ));
    }
    if input.damaged && input.damaged_qty == 0 {
        return Err(RepositoryError::Validation(
            "damaged flag requires a damaged qty".to_string(),
        ));
    }
    if input.damaged_qty > input.qty {
        return Err(RepositoryError::Validation(
            "damaged qty cannot exceed qty".to_string(),
        ));
    }

    if let Some(photo) = &input.primary_photo {
        validate_photo(photo)?;
    }
    for photo in &input.extra_photos {
        validate_photo(photo)?;
    }
    Ok(())
}

fn validate_photo(photo: &PhotoUpload) -> RepositoryResult<()> {
    if !photo.mime.starts_with("image/") {
        return Err(RepositoryError::Validation(
            "photo must be an image".to_string(),
        ));
    }
    if photo.data.len() > MAX_PHOTO_BYTES {
        return Err(RepositoryError::Validation(
            "photo exceeds 5 MiB limit".to_string(),
        ));
    }
    Ok(())
}

/// Damage split. At least one segment always exists (qty > 0 is already
/// checked). Media goes to the damaged segment when present, else to
/// the first.
fn split_segments(input: &ReceiptInput) -> Vec<Segment> {
    let non_damaged_qty = input.qty - input.damaged_qty;
    let mut segments = Vec::with_capacity(2);
    if non_damaged_qty > 0 {
        segments.push(Segment {
            qty: non_damaged_qty,
            damaged: false,
            media: false,
        });
    }
    if input.damaged_qty > 0 {
        segments.push(Segment {
            qty: input.damaged_qty,
            damaged: true,
            media: false,
        });
    }

    if let Some(damaged) = segments.iter_mut().find(|s| s.damaged) {
        damaged.media = true;
    } else if let Some(first) = segments.first_mut() {
        first.media = true;
    }
    segments
}

fn normalize_update(update: &mut LineUpdate) -> RepositoryResult<()> {
    if update.qty <= 0 {
        return Err(RepositoryError::Validation(
            "qty must be greater than zero".to_string(),
        ));
    }
    if update.case_size <= 0 {
        update.case_size = 1;
    }
    if update.damaged_qty < 0 {
        return Err(RepositoryError::Validation(
            "damaged qty cannot be negative".to_string(),
        ));
    }
    if update.damaged_qty > update.qty {
        return Err(RepositoryError::Validation(
            "damaged qty cannot exceed qty".to_string(),
        ));
    }
    Ok(())
}

// ==========================================
// Merge / insert
// ==========================================

fn apply_segment(
    conn: &Connection,
    now: NaiveDateTime,
    user_id: i64,
    pallet: &Pallet,
    input: &ReceiptInput,
    segment: &Segment,
) -> RepositoryResult<ReceiptLine> {
    let key = InstanceKey {
        project_id: pallet.project_id,
        pallet_id: pallet.id,
        sku: input.sku.clone(),
        uom: input.uom.clone(),
        case_size: input.case_size,
        unknown_sku: input.unknown_sku,
        damaged: segment.damaged,
        batch: normalize_batch(input.batch_number.as_deref()),
        expiry: input.expiry_date,
    };

    match receipt_repo::find_merge_candidate(conn, &key)? {
        Some(existing) => merge_segment(conn, now, user_id, existing, input, segment),
        None => insert_segment(conn, now, user_id, pallet, input, segment),
    }
}

fn merge_segment(
    conn: &Connection,
    now: NaiveDateTime,
    user_id: i64,
    existing: ReceiptLine,
    input: &ReceiptInput,
    segment: &Segment,
) -> RepositoryResult<ReceiptLine> {
    let mut line = existing.clone();
    line.qty += segment.qty;
    line.scanned_by_user_id = user_id;
    line.updated_at = now;
    if !input.description.trim().is_empty() {
        line.description = input.description.clone();
    }
    if !input.comment.trim().is_empty() {
        line.comment = input.comment.clone();
    }
    line.damaged_qty = if segment.damaged { line.qty } else { 0 };
    receipt_repo::update(conn, &line)?;

    if segment.media {
        if let Some(photo) = &input.primary_photo {
            receipt_repo::set_primary_photo(conn, line.id, photo)?;
            line.stock_photo_mime = Some(photo.mime.clone());
            line.stock_photo_name = Some(photo.name.clone());
        }
        for photo in &input.extra_photos {
            photo_repo::insert(conn, now, line.id, photo)?;
        }
    }

    audit_repo::write(
        conn,
        now,
        user_id,
        AuditAction::ReceiptMerge,
        "pallet_receipts",
        &line.id.to_string(),
        Some(&existing),
        Some(&line),
    )?;
    Ok(line)
}

fn insert_segment(
    conn: &Connection,
    now: NaiveDateTime,
    user_id: i64,
    pallet: &Pallet,
    input: &ReceiptInput,
    segment: &Segment,
) -> RepositoryResult<ReceiptLine> {
    let primary = if segment.media {
        input.primary_photo.as_ref()
    } else {
        None
    };

    let mut line = ReceiptLine {
        id: 0,
        project_id: pallet.project_id,
        pallet_id: pallet.id,
        sku: input.sku.clone(),
        description: input.description.clone(),
        uom: input.uom.clone(),
        comment: input.comment.clone(),
        scanned_by_user_id: user_id,
        qty: segment.qty,
        case_size: input.case_size,
        unknown_sku: input.unknown_sku,
        damaged: segment.damaged,
        damaged_qty: if segment.damaged { segment.qty } else { 0 },
        batch_number: input.batch_number.clone(),
        expiry_date: input.expiry_date,
        carton_barcode: input.carton_barcode.clone(),
        item_barcode: input.item_barcode.clone(),
        no_outer_barcode: input.no_outer_barcode,
        no_inner_barcode: input.no_inner_barcode,
        stock_photo_mime: primary.map(|p| p.mime.clone()),
        stock_photo_name: primary.map(|p| p.name.clone()),
        created_at: now,
        updated_at: now,
    };
    line.id = receipt_repo::insert(conn, &line, primary)?;

    if segment.media {
        for photo in &input.extra_photos {
            photo_repo::insert(conn, now, line.id, photo)?;
        }
    }

    audit_repo::write(
        conn,
        now,
        user_id,
        AuditAction::ReceiptCreate,
        "pallet_receipts",
        &line.id.to_string(),
        None::<&ReceiptLine>,
        Some(&line),
    )?;
    Ok(line)
}
