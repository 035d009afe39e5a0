// ==========================================
// Warehouse Receipting - projection layer
// ==========================================
// Read-only views over the store: pallet content, the pallet event log,
// SKU-instance summaries, closed-pallet label data and the CSV exports.
// Every call runs in a single read transaction.
// ==========================================

pub mod event_log;
pub mod export;
pub mod labels;
pub mod pallet_content;
pub mod sku_summary;

pub use event_log::PalletEvent;
pub use export::Exporter;
pub use labels::{LabelGroup, PalletLabelData};
pub use pallet_content::{ContentLine, LineDetailView, PalletContentView, PhotoRef};
pub use sku_summary::{PalletBreakdownRow, SkuDetailView, SkuSummaryRow};

use crate::engine::Clock;
use crate::store::Store;
use chrono::{NaiveDate, NaiveDateTime};

/// UK display date, DD/MM/YYYY.
pub(crate) fn format_date_uk(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// UK display timestamp, DD/MM/YYYY HH:MM.
pub(crate) fn format_datetime_uk(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

pub(crate) fn format_opt_date_uk(date: Option<NaiveDate>) -> String {
    date.map(format_date_uk).unwrap_or_default()
}

pub(crate) fn format_opt_datetime_uk(at: Option<NaiveDateTime>) -> String {
    at.map(format_datetime_uk).unwrap_or_default()
}

/// Handle bundling the store with the clock the expiry predicates use
/// for "today".
#[derive(Clone)]
pub struct Projections {
    pub(crate) store: Store,
    pub(crate) clock: Clock,
}

impl Projections {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uk_formats() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_date_uk(date), "07/03/2026");
        let at = date.and_hms_opt(9, 5, 59).unwrap();
        assert_eq!(format_datetime_uk(at), "07/03/2026 09:05");
        assert_eq!(format_opt_date_uk(None), "");
    }
}
