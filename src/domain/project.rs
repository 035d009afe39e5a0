// ==========================================
// Warehouse Receipting - project entity
// ==========================================

use crate::domain::types::ProjectStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A client project. The unique `code` is the slug used in URLs and on
/// paperwork; duplicate codes are auto-suffixed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub client_name: String,
    pub project_date: Option<NaiveDate>,
    pub code: String,
    pub status: ProjectStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}
