// ==========================================
// Warehouse Receipting - pallet entity
// ==========================================
// Pallet ids are globally unique integers allocated as max(id)+1 under
// the single writer. The printed barcode is the id zero-padded to 8
// digits behind a 'P' prefix.
// ==========================================

use crate::domain::types::PalletStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pallet {
    pub id: i64,
    pub project_id: i64,
    pub status: PalletStatus,
    pub created_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
    pub reopened_at: Option<NaiveDateTime>,
}

impl Pallet {
    /// Barcode value printed on the pallet label, e.g. `P00000001`.
    pub fn barcode(&self) -> String {
        format!("P{:08}", self.id)
    }
}
