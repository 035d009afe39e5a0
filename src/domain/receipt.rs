// ==========================================
// Warehouse Receipting - receipt line entities
// ==========================================
// A ReceiptLine is one stored aggregate of identical stock (by instance
// key) on a pallet. The primary photo blob lives on the line row; extra
// photos get their own rows. Blobs are excluded from audit snapshots.
// ==========================================

use crate::domain::instance::{normalize_batch, InstanceKey};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Stored receipt line (pallet_receipts row). The primary photo blob is
/// intentionally not part of this struct; it is streamed separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub id: i64,
    pub project_id: i64,
    pub pallet_id: i64,
    pub sku: String,
    pub description: String,
    pub uom: String,
    pub comment: String,
    pub scanned_by_user_id: i64,
    pub qty: i64,
    pub case_size: i64,
    pub unknown_sku: bool,
    pub damaged: bool,
    pub damaged_qty: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub carton_barcode: Option<String>,
    pub item_barcode: Option<String>,
    pub no_outer_barcode: bool,
    pub no_inner_barcode: bool,
    pub stock_photo_mime: Option<String>,
    pub stock_photo_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ReceiptLine {
    pub fn instance_key(&self) -> InstanceKey {
        InstanceKey {
            project_id: self.project_id,
            pallet_id: self.pallet_id,
            sku: self.sku.clone(),
            uom: self.uom.clone(),
            case_size: self.case_size,
            unknown_sku: self.unknown_sku,
            damaged: self.damaged,
            batch: normalize_batch(self.batch_number.as_deref()),
            expiry: self.expiry_date,
        }
    }
}

/// Extra photo row (receipt_photos). The blob is loaded on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptPhoto {
    pub id: i64,
    pub receipt_line_id: i64,
    pub mime: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// An uploaded image attached to a receipt input.
#[derive(Clone)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    pub mime: String,
    pub name: String,
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("mime", &self.mime)
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ==========================================
// ReceiptInput - one scan from an operator
// ==========================================
// May split into up to two stored lines (damage split) and may merge
// into existing lines under the instance key.
#[derive(Debug, Clone)]
pub struct ReceiptInput {
    pub pallet_id: i64,
    pub sku: String,
    pub description: String,
    pub uom: String,
    pub comment: String,
    pub qty: i64,
    pub case_size: i64,
    pub unknown_sku: bool,
    pub damaged: bool,
    pub damaged_qty: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub carton_barcode: Option<String>,
    pub item_barcode: Option<String>,
    pub no_outer_barcode: bool,
    pub no_inner_barcode: bool,
    pub primary_photo: Option<PhotoUpload>,
    pub extra_photos: Vec<PhotoUpload>,
}

impl Default for ReceiptInput {
    fn default() -> Self {
        Self {
            pallet_id: 0,
            sku: String::new(),
            description: String::new(),
            uom: String::new(),
            comment: String::new(),
            qty: 0,
            case_size: 1,
            unknown_sku: false,
            damaged: false,
            damaged_qty: 0,
            batch_number: None,
            expiry_date: None,
            carton_barcode: None,
            item_barcode: None,
            no_outer_barcode: false,
            no_inner_barcode: false,
            primary_photo: None,
            extra_photos: Vec::new(),
        }
    }
}

/// Admin edit of a stored line.
#[derive(Debug, Clone)]
pub struct LineUpdate {
    pub pallet_id: i64,
    pub receipt_id: i64,
    pub sku: String,
    pub description: String,
    pub uom: String,
    pub comment: String,
    pub qty: i64,
    pub case_size: i64,
    pub damaged: bool,
    pub damaged_qty: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}
