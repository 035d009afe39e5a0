// ==========================================
// ReceiptEngine integration tests
// ==========================================
// Merge closure and disjointness, the damage split, unknown-SKU rules,
// pallet promotion and the audit trail of every write path.
// ==========================================


#[cfg(test)]
mod receipt_engine_test {
    use crate::test_helpers::*;
    use chrono::NaiveDate;
    use receipting_core::domain::types::{AuditAction, PalletStatus};
    use receipting_core::repository::{audit_repo, pallet_repo, photo_repo, receipt_repo, stock_repo};
    use receipting_core::store::CancelToken;
    use receipting_core::{
        LineUpdate, PalletLifecycle, ReceiptEngine, ReceiptInput, RepositoryError,
    };

    fn setup() -> (
        tempfile::NamedTempFile,
        receipting_core::Store,
        ReceiptEngine,
        i64,
        i64,
        i64,
    ) {
        let (file, store) = create_test_store();
        let (project_id, user_id) = seed_project(&store);
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let pallet = lifecycle
            .allocate_one(user_id, project_id, &CancelToken::none())
            .unwrap();
        let engine = ReceiptEngine::with_clock(store.clone(), test_clock());
        (file, store, engine, project_id, user_id, pallet.id)
    }

    fn pallet_lines(
        store: &receipting_core::Store,
        pallet_id: i64,
    ) -> Vec<receipting_core::ReceiptLine> {
        store
            .with_read_tx(&CancelToken::none(), |conn| {
                receipt_repo::list_for_pallet(conn, pallet_id)
            })
            .unwrap()
    }

    #[test]
    fn test_s1_merge_same_batch_and_expiry() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();
        let expiry = NaiveDate::from_ymd_opt(2026, 12, 31);

        let mut input = basic_input(pallet, "ABC", 2);
        input.batch_number = Some("B1".to_string());
        input.expiry_date = expiry;
        engine.save_receipt(user, input.clone(), &cancel).unwrap();
        input.qty = 3;
        engine.save_receipt(user, input, &cancel).unwrap();

        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 5);
    }

    #[test]
    fn test_s2_s3_blank_batch_and_null_expiry_merge() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        // Blank batch, same expiry
        let mut a = basic_input(pallet, "XYZ", 1);
        a.batch_number = Some(String::new());
        a.expiry_date = NaiveDate::from_ymd_opt(2027, 1, 15);
        engine.save_receipt(user, a.clone(), &cancel).unwrap();
        let mut b = a.clone();
        b.qty = 4;
        b.batch_number = None; // NULL and blank are the same batch
        engine.save_receipt(user, b, &cancel).unwrap();

        // Non-blank batch, NULL expiry
        let mut c = basic_input(pallet, "NOEXP", 2);
        c.batch_number = Some("N1".to_string());
        engine.save_receipt(user, c.clone(), &cancel).unwrap();
        c.qty = 3;
        engine.save_receipt(user, c, &cancel).unwrap();

        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 2);
        let xyz = lines.iter().find(|l| l.sku == "XYZ").unwrap();
        assert_eq!(xyz.qty, 5);
        let noexp = lines.iter().find(|l| l.sku == "NOEXP").unwrap();
        assert_eq!(noexp.qty, 5);
    }

    #[test]
    fn test_s4_key_differences_do_not_merge() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let mut a = basic_input(pallet, "ABC", 2);
        a.batch_number = Some("B1".to_string());
        engine.save_receipt(user, a.clone(), &cancel).unwrap();

        let mut b = a.clone();
        b.qty = 3;
        b.batch_number = Some("B2".to_string());
        engine.save_receipt(user, b, &cancel).unwrap();

        // Different case size is a different instance too
        let mut c = a.clone();
        c.qty = 4;
        c.case_size = 12;
        engine.save_receipt(user, c, &cancel).unwrap();

        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.iter().map(|l| l.qty).sum::<i64>(), 9);
    }

    #[test]
    fn test_s5_damage_split_media_on_damaged_line() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let mut input = basic_input(pallet, "SPLIT", 3);
        input.damaged = true;
        input.damaged_qty = 2;
        input.primary_photo = Some(jpeg_photo("front.jpg"));
        input.extra_photos = vec![jpeg_photo("side.jpg")];
        engine.save_receipt(user, input, &cancel).unwrap();

        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 2);

        let damaged = lines.iter().find(|l| l.damaged).unwrap();
        assert_eq!(damaged.qty, 2);
        assert_eq!(damaged.damaged_qty, 2);
        assert!(damaged.stock_photo_mime.is_some());

        let ok = lines.iter().find(|l| !l.damaged).unwrap();
        assert_eq!(ok.qty, 1);
        assert_eq!(ok.damaged_qty, 0);
        assert!(ok.stock_photo_mime.is_none());

        store
            .with_read_tx(&cancel, |conn| {
                assert_eq!(photo_repo::ids_for_line(conn, damaged.id)?.len(), 1);
                assert!(photo_repo::ids_for_line(conn, ok.id)?.is_empty());
                assert!(photo_repo::get_primary_blob(conn, damaged.id)?.is_some());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_s6_unknown_sku_requires_photo() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let mut input = ReceiptInput {
            pallet_id: pallet,
            unknown_sku: true,
            qty: 1,
            case_size: 1,
            batch_number: Some("U1".to_string()),
            ..ReceiptInput::default()
        };
        let err = engine.save_receipt(user, input.clone(), &cancel).unwrap_err();
        assert_eq!(err.to_string(), "unknown sku requires at least one photo");
        assert!(pallet_lines(&store, pallet).is_empty());

        input.primary_photo = Some(jpeg_photo("mystery.jpg"));
        let lines = engine.save_receipt(user, input, &cancel).unwrap();
        assert_eq!(lines[0].sku, "UNKNOWN");
        assert_eq!(lines[0].description, "Unidentifiable item");

        // Unknown lines never touch the catalogue
        store
            .with_read_tx(&cancel, |conn| {
                assert!(stock_repo::get(conn, lines[0].project_id, "UNKNOWN")?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_s7_first_line_promotes_created_pallet() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 1), &cancel)
            .unwrap();
        let loaded = store
            .with_read_tx(&cancel, |conn| {
                Ok(pallet_repo::get(conn, pallet)?.unwrap())
            })
            .unwrap();
        assert_eq!(loaded.status, PalletStatus::Open);
        assert!(loaded.reopened_at.is_none());

        // Second save: status stays open
        engine
            .save_receipt(user, basic_input(pallet, "DEF", 1), &cancel)
            .unwrap();
        let loaded = store
            .with_read_tx(&cancel, |conn| {
                Ok(pallet_repo::get(conn, pallet)?.unwrap())
            })
            .unwrap();
        assert_eq!(loaded.status, PalletStatus::Open);
    }

    #[test]
    fn test_cancelled_pallet_is_read_only() {
        let (_file, store, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        lifecycle
            .transition(user, project, pallet, PalletStatus::Cancelled, &cancel)
            .unwrap();

        let err = engine
            .save_receipt(user, basic_input(pallet, "ABC", 1), &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ReadOnlyPallet { .. }));
    }

    #[test]
    fn test_closed_pallet_still_accepts_scans() {
        let (_file, store, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 1), &cancel)
            .unwrap();
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        lifecycle
            .transition(user, project, pallet, PalletStatus::Closed, &cancel)
            .unwrap();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();
        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 3);
    }

    #[test]
    fn test_inactive_project_rejects_writes() {
        let (_file, store) = create_test_store();
        let (project_id, user_id) = seed_project_with_status(
            &store,
            receipting_core::domain::types::ProjectStatus::Inactive,
        );
        let cancel = CancelToken::none();

        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let err = lifecycle
            .allocate_one(user_id, project_id, &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ReadOnlyProject { .. }));
    }

    #[test]
    fn test_merge_refreshes_scanner_and_catalogue() {
        let (_file, store, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();
        let second_user = store
            .with_write_tx(&cancel, |tx| {
                receipting_core::repository::user_repo::insert(
                    tx,
                    "operator2",
                    "Operator Two",
                    "operator",
                )
            })
            .unwrap();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();
        let mut merge = basic_input(pallet, "ABC", 3);
        merge.description = "Updated description".to_string();
        engine.save_receipt(second_user, merge, &cancel).unwrap();

        let lines = pallet_lines(&store, pallet);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].scanned_by_user_id, second_user);
        assert_eq!(lines[0].description, "Updated description");

        store
            .with_read_tx(&cancel, |conn| {
                let item = stock_repo::get(conn, project, "ABC")?.unwrap();
                assert_eq!(item.description, "Updated description");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_audit_rows_for_save_update_delete() {
        let (_file, store, engine, _project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let created = engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();
        let line_id = created[0].id;
        engine
            .save_receipt(user, basic_input(pallet, "ABC", 3), &cancel)
            .unwrap();

        engine
            .update_line(
                user,
                LineUpdate {
                    pallet_id: pallet,
                    receipt_id: line_id,
                    sku: "ABC".to_string(),
                    description: "edited".to_string(),
                    uom: "EA".to_string(),
                    comment: String::new(),
                    qty: 7,
                    case_size: 6,
                    damaged: false,
                    damaged_qty: 0,
                    batch_number: None,
                    expiry_date: None,
                },
                &cancel,
            )
            .unwrap();
        engine.delete_line(user, pallet, line_id, &cancel).unwrap();

        let records = store
            .with_read_tx(&cancel, |conn| {
                audit_repo::list_for_entity(conn, "pallet_receipts", &line_id.to_string())
            })
            .unwrap();
        let actions: Vec<_> = records.iter().rev().map(|r| r.action.clone()).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::ReceiptCreate.to_string(),
                AuditAction::ReceiptMerge.to_string(),
                AuditAction::ReceiptUpdate.to_string(),
                AuditAction::ReceiptDelete.to_string(),
            ]
        );

        // Snapshots round-trip through JSON
        for record in &records {
            if !record.before_json.is_empty() {
                assert!(record.before().is_some());
            }
            if !record.after_json.is_empty() {
                assert!(record.after().is_some());
            }
        }
        let delete = records.first().unwrap();
        assert!(delete.before().is_some());
        assert!(delete.after().is_none());
    }

    #[test]
    fn test_update_line_guards() {
        let (_file, store, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();
        let created = engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();

        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        lifecycle
            .transition(user, project, pallet, PalletStatus::Closed, &cancel)
            .unwrap();

        let update = LineUpdate {
            pallet_id: pallet,
            receipt_id: created[0].id,
            sku: "ABC".to_string(),
            description: String::new(),
            uom: "EA".to_string(),
            comment: String::new(),
            qty: 5,
            case_size: 6,
            damaged: false,
            damaged_qty: 0,
            batch_number: None,
            expiry_date: None,
        };
        let err = engine.update_line(user, update.clone(), &cancel).unwrap_err();
        assert!(matches!(err, RepositoryError::ReadOnlyPallet { .. }));

        let err = engine
            .delete_line(user, pallet, created[0].id, &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ReadOnlyPallet { .. }));

        // Reopen: edits work again and damaged normalisation applies
        lifecycle
            .transition(user, project, pallet, PalletStatus::Open, &cancel)
            .unwrap();
        let mut damaged_update = update;
        damaged_update.damaged = true;
        damaged_update.damaged_qty = 1;
        let line = engine.update_line(user, damaged_update, &cancel).unwrap();
        assert_eq!(line.damaged_qty, line.qty);
    }

    #[test]
    fn test_catalogue_upsert_idempotent() {
        let (_file, store, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 1), &cancel)
            .unwrap();
        let first = store
            .with_read_tx(&cancel, |conn| {
                Ok(stock_repo::get(conn, project, "ABC")?.unwrap())
            })
            .unwrap();

        // Same description and uom at a later time: row untouched
        let later = test_now() + chrono::Duration::hours(2);
        store
            .with_write_tx(&cancel, |tx| {
                stock_repo::upsert(tx, later, project, "ABC", "ABC description", "EA")
            })
            .unwrap();
        let second = store
            .with_read_tx(&cancel, |conn| {
                Ok(stock_repo::get(conn, project, "ABC")?.unwrap())
            })
            .unwrap();
        assert_eq!(first.updated_at, second.updated_at);

        // A changed description moves updated_at
        store
            .with_write_tx(&cancel, |tx| {
                stock_repo::upsert(tx, later, project, "ABC", "new words", "EA")
            })
            .unwrap();
        let third = store
            .with_read_tx(&cancel, |conn| {
                Ok(stock_repo::get(conn, project, "ABC")?.unwrap())
            })
            .unwrap();
        assert_eq!(third.updated_at, later);
    }
}
