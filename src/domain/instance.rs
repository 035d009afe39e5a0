// ==========================================
// Warehouse Receipting - instance identity helpers
// ==========================================
// Merge predicates treat trimmed blank strings and NULL as equal for the
// batch number; for the expiry date, NULL == NULL holds at date
// granularity. This module is the single home of those rules and is
// reused by the merge lookup, the client-comment match and the
// SKU-instance projections.
// ==========================================

use chrono::NaiveDate;

/// Normalise a batch number for identity comparison: NULL and blank are
/// the same batch, surrounding whitespace is ignored.
pub fn normalize_batch(batch: Option<&str>) -> String {
    batch.map(str::trim).unwrap_or("").to_string()
}

/// Expiry equality at date granularity with NULL == NULL.
pub fn same_expiry(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ==========================================
// InstanceKey - merge identity of a receipt line
// ==========================================
// Two lines on the same pallet merge iff every field here is equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceKey {
    pub project_id: i64,
    pub pallet_id: i64,
    pub sku: String,
    pub uom: String,
    pub case_size: i64,
    pub unknown_sku: bool,
    pub damaged: bool,
    pub batch: String,
    pub expiry: Option<NaiveDate>,
}

// ==========================================
// SkuInstance - the weaker grouping used by summaries
// ==========================================
// Same as the instance key less pallet, case size and the damaged flag.
// Client comments are keyed by this plus a pallet id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuInstance {
    pub sku: String,
    pub uom: String,
    pub batch: String,
    pub expiry: Option<NaiveDate>,
}

impl SkuInstance {
    pub fn new(sku: &str, uom: &str, batch: Option<&str>, expiry: Option<NaiveDate>) -> Self {
        Self {
            sku: sku.to_string(),
            uom: uom.to_string(),
            batch: normalize_batch(batch),
            expiry,
        }
    }

    pub fn matches(&self, sku: &str, uom: &str, batch: Option<&str>, expiry: Option<NaiveDate>) -> bool {
        self.sku == sku
            && self.uom == uom
            && self.batch == normalize_batch(batch)
            && same_expiry(self.expiry, expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_batch() {
        assert_eq!(normalize_batch(None), "");
        assert_eq!(normalize_batch(Some("")), "");
        assert_eq!(normalize_batch(Some("  B1 ")), "B1");
    }

    #[test]
    fn test_same_expiry_null_parity() {
        let d = NaiveDate::from_ymd_opt(2026, 12, 31);
        assert!(same_expiry(None, None));
        assert!(same_expiry(d, d));
        assert!(!same_expiry(d, None));
        assert!(!same_expiry(None, d));
        assert!(!same_expiry(d, NaiveDate::from_ymd_opt(2027, 1, 1)));
    }

    #[test]
    fn test_sku_instance_match() {
        let d = NaiveDate::from_ymd_opt(2026, 12, 31);
        let instance = SkuInstance::new("ABC", "EA", Some(" B1 "), d);
        assert!(instance.matches("ABC", "EA", Some("B1"), d));
        assert!(!instance.matches("ABC", "EA", Some("B2"), d));
        assert!(!instance.matches("ABC", "EA", Some("B1"), None));

        let blank = SkuInstance::new("XYZ", "EA", None, None);
        assert!(blank.matches("XYZ", "EA", Some("  "), None));
    }
}
