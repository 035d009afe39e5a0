// ==========================================
// Projection integration tests
// ==========================================
// Pallet content flags and filters, SKU summaries and the SKU
// drill-down, all through the public write paths.
// ==========================================


#[cfg(test)]
mod projection_test {
    use crate::test_helpers::*;
    use chrono::NaiveDate;
    use receipting_core::domain::types::ContentFilter;
    use receipting_core::store::CancelToken;
    use receipting_core::{PalletLifecycle, Projections, ReceiptEngine, RepositoryError};

    struct Fixture {
        _file: tempfile::NamedTempFile,
        store: receipting_core::Store,
        projections: Projections,
        engine: ReceiptEngine,
        project: i64,
        user: i64,
        pallet: i64,
    }

    fn setup() -> Fixture {
        let (file, store) = create_test_store();
        let (project, user) = seed_project(&store);
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let pallet = lifecycle
            .allocate_one(user, project, &CancelToken::none())
            .unwrap();
        Fixture {
            _file: file,
            projections: Projections::with_clock(store.clone(), test_clock()),
            engine: ReceiptEngine::with_clock(store.clone(), test_clock()),
            store,
            project,
            user,
            pallet: pallet.id,
        }
    }

    /// One good line, one expired, one damaged, one unknown with photo.
    fn seed_content(f: &Fixture) {
        let cancel = CancelToken::none();
        f.engine
            .save_receipt(f.user, basic_input(f.pallet, "GOOD", 5), &cancel)
            .unwrap();

        let mut expired = basic_input(f.pallet, "OLD", 2);
        expired.expiry_date = NaiveDate::from_ymd_opt(2026, 1, 1); // before test_now
        f.engine.save_receipt(f.user, expired, &cancel).unwrap();

        let mut damaged = basic_input(f.pallet, "DMG", 3);
        damaged.damaged = true;
        damaged.damaged_qty = 3;
        f.engine.save_receipt(f.user, damaged, &cancel).unwrap();

        let mut unknown = basic_input(f.pallet, "", 1);
        unknown.description = String::new();
        unknown.unknown_sku = true;
        unknown.primary_photo = Some(jpeg_photo("unknown.jpg"));
        f.engine.save_receipt(f.user, unknown, &cancel).unwrap();
    }

    #[test]
    fn test_content_filters_and_flags() {
        let f = setup();
        seed_content(&f);
        let cancel = CancelToken::none();

        let all = f
            .projections
            .pallet_content(f.pallet, ContentFilter::All, &cancel)
            .unwrap();
        assert_eq!(all.lines.len(), 4);
        // sku ASC, id ASC
        let skus: Vec<&str> = all.lines.iter().map(|l| l.sku.as_str()).collect();
        assert_eq!(skus, vec!["DMG", "GOOD", "OLD", "UNKNOWN"]);

        let success = f
            .projections
            .pallet_content(f.pallet, ContentFilter::Success, &cancel)
            .unwrap();
        assert_eq!(success.lines.len(), 1);
        assert_eq!(success.lines[0].sku, "GOOD");
        assert_eq!(success.lines[0].scanned_by, "operator1");
        assert!(!success.lines[0].has_photos);

        let expired = f
            .projections
            .pallet_content(f.pallet, ContentFilter::Expired, &cancel)
            .unwrap();
        assert_eq!(expired.lines.len(), 1);
        assert_eq!(expired.lines[0].sku, "OLD");
        assert!(expired.lines[0].expired);
        assert_eq!(expired.lines[0].expiry_date_uk, "01/01/2026");

        let damaged = f
            .projections
            .pallet_content(f.pallet, ContentFilter::Damaged, &cancel)
            .unwrap();
        assert_eq!(damaged.lines.len(), 1);

        let unknown = f
            .projections
            .pallet_content(f.pallet, ContentFilter::Unknown, &cancel)
            .unwrap();
        assert_eq!(unknown.lines.len(), 1);
        assert!(unknown.lines[0].has_photos);
    }

    #[test]
    fn test_line_detail_photos_and_missing_line() {
        let f = setup();
        let cancel = CancelToken::none();

        let mut input = basic_input(f.pallet, "PHOTO", 1);
        input.primary_photo = Some(jpeg_photo("front.jpg"));
        input.extra_photos = vec![jpeg_photo("side.jpg"), jpeg_photo("back.jpg")];
        let lines = f.engine.save_receipt(f.user, input, &cancel).unwrap();

        let detail = f
            .projections
            .pallet_line_detail(f.pallet, lines[0].id, &cancel)
            .unwrap();
        assert_eq!(detail.photos.len(), 3);
        assert!(matches!(
            detail.photos[0],
            receipting_core::projection::PhotoRef::Primary { .. }
        ));
        assert!(detail.line.has_photos);
        assert!(detail.client_comments.is_empty());

        let err = f
            .projections
            .pallet_line_detail(f.pallet, 9999, &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_sku_summary_grouping_and_sort() {
        let f = setup();
        let cancel = CancelToken::none();
        let lifecycle = PalletLifecycle::with_clock(f.store.clone(), test_clock());
        let second = lifecycle.allocate_one(f.user, f.project, &cancel).unwrap();

        // Same instance across two pallets aggregates into one group
        let mut a = basic_input(f.pallet, "abc", 2);
        a.batch_number = Some("B1".to_string());
        f.engine.save_receipt(f.user, a.clone(), &cancel).unwrap();
        let mut b = basic_input(second.id, "abc", 3);
        b.batch_number = Some("B1".to_string());
        f.engine.save_receipt(f.user, b, &cancel).unwrap();

        // Different batch: second group, same SKU
        let mut c = basic_input(f.pallet, "abc", 1);
        c.batch_number = Some("B2".to_string());
        f.engine.save_receipt(f.user, c, &cancel).unwrap();

        f.engine
            .save_receipt(f.user, basic_input(f.pallet, "AAA", 4), &cancel)
            .unwrap();

        let rows = f
            .projections
            .sku_summary(f.project, ContentFilter::All, &cancel)
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sku, "AAA");
        assert_eq!(rows[1].batch, "B1");
        assert_eq!(rows[1].total_qty, 5);
        assert_eq!(rows[2].batch, "B2");

        let damaged_only = f
            .projections
            .sku_summary(f.project, ContentFilter::Damaged, &cancel)
            .unwrap();
        assert!(damaged_only.is_empty());
    }

    #[test]
    fn test_sku_detail_breakdown_and_not_found() {
        let f = setup();
        let cancel = CancelToken::none();
        let lifecycle = PalletLifecycle::with_clock(f.store.clone(), test_clock());
        let second = lifecycle.allocate_one(f.user, f.project, &cancel).unwrap();

        let mut a = basic_input(f.pallet, "MIX", 4);
        a.comment = "first scan".to_string();
        f.engine.save_receipt(f.user, a, &cancel).unwrap();

        let mut b = basic_input(second.id, "MIX", 2);
        b.damaged = true;
        b.damaged_qty = 2;
        b.primary_photo = Some(jpeg_photo("dmg.jpg"));
        f.engine.save_receipt(f.user, b, &cancel).unwrap();

        let detail = f
            .projections
            .sku_detail(f.project, "MIX", "EA", None, None, &cancel)
            .unwrap();
        assert_eq!(detail.summary.total_qty, 6);
        assert_eq!(detail.summary.damaged_qty, 2);
        assert!(detail.summary.has_comments);
        assert!(detail.summary.has_photos);
        assert_eq!(detail.pallets.len(), 2);
        assert_eq!(detail.pallets[0].pallet_id, f.pallet);
        assert_eq!(detail.pallets[0].comments, "first scan");
        assert_eq!(detail.pallets[1].damaged_qty, 2);
        assert_eq!(detail.photos.len(), 1);

        let err = f
            .projections
            .sku_detail(f.project, "NOPE", "EA", None, None, &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
