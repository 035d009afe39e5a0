// ==========================================
// Warehouse Receipting - core library
// ==========================================
// Transactional receipting and pallet-labelling backend over a single
// embedded SQLite file. Scanner operators receipt stock onto pallets;
// the core merges lines under the instance key, drives the pallet state
// machine, keeps the audit trail and serves the read-side projections
// and CSV exports. HTTP routing, sessions and rendering live in the
// shell, not here.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer: entities and closed enum types
pub mod domain;

// Repository layer: data access over one connection
pub mod repository;

// Engine layer: business rules
pub mod engine;

// Import layer: stock catalogue CSV
pub mod importer;

// Projection layer: read-side views and exports
pub mod projection;

// Transactional store: single writer, read pool, migrations
pub mod store;

// Database infrastructure (connection init, unified PRAGMAs)
pub mod db;

// Logging
pub mod logging;

// ==========================================
// Core re-exports
// ==========================================

pub use domain::{
    AuditAction, AuditRecord, ClientComment, ContentFilter, InstanceKey, LineUpdate, Pallet,
    PalletStatus, PhotoUpload, Project, ProjectStatus, ReceiptInput, ReceiptLine, SkuInstance,
    StockItem, UNKNOWN_SKU,
};

pub use engine::{
    Clock, ClientCommentService, PalletLifecycle, ProjectService, ReceiptEngine, MAX_PHOTO_BYTES,
};

pub use importer::StockImporter;

pub use projection::{Exporter, Projections};

pub use repository::error::{RepositoryError, RepositoryResult};

pub use store::{CancelToken, Store};

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "receipting-core";
