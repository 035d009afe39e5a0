// ==========================================
// Warehouse Receipting - client comment entity
// ==========================================
// Free-text comments from client reviewers, keyed to an SKU-instance on
// a specific pallet. Never audited; presence is projected directly.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientComment {
    pub id: i64,
    pub project_id: i64,
    pub pallet_id: i64,
    pub sku: String,
    pub uom: String,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub comment: String,
    pub created_by_user_id: i64,
    pub created_at: NaiveDateTime,
}
