// ==========================================
// Warehouse Receipting - stock catalogue entity
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Per-project (SKU, description, UOM) hint, upserted on receipt writes.
/// The catalogue never records the UNKNOWN placeholder SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub project_id: i64,
    pub sku: String,
    pub description: String,
    pub uom: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
