// ==========================================
// Warehouse Receipting - user entity
// ==========================================
// Accounts are owned by the HTTP shell; the core only joins users for
// display names in projections and seeds them in tests.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}
