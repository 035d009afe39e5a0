// ==========================================
// Warehouse Receipting - import layer
// ==========================================
// External data in, catalogue rows out. Currently one importer: the
// per-project stock catalogue CSV.
// ==========================================

pub mod stock_import;

pub use stock_import::{StockImporter, StockImportReport};
