// ==========================================
// Warehouse Receipting - domain model layer
// ==========================================
// Entities, closed enum types and the instance-identity rules.
// No data access logic, no engine logic.
// ==========================================

pub mod audit;
pub mod comment;
pub mod instance;
pub mod pallet;
pub mod project;
pub mod receipt;
pub mod stock;
pub mod types;
pub mod user;

pub use audit::{AuditRecord, ExportRun};
pub use comment::ClientComment;
pub use instance::{normalize_batch, same_expiry, InstanceKey, SkuInstance};
pub use pallet::Pallet;
pub use project::Project;
pub use receipt::{LineUpdate, PhotoUpload, ReceiptInput, ReceiptLine, ReceiptPhoto};
pub use stock::StockItem;
pub use types::{AuditAction, ContentFilter, PalletStatus, ProjectStatus};
pub use user::User;

/// Placeholder SKU recorded for unidentifiable items.
pub const UNKNOWN_SKU: &str = "UNKNOWN";

/// Default description applied to unknown-SKU lines when none is given.
pub const UNKNOWN_DESCRIPTION: &str = "Unidentifiable item";
