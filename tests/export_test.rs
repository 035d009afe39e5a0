// ==========================================
// CSV export tests
// ==========================================
// Exact headers, UK date formats, blank optional values and the
// export_runs telemetry row.
// ==========================================


#[cfg(test)]
mod export_test {
    use crate::test_helpers::*;
    use chrono::NaiveDate;
    use receipting_core::domain::types::PalletStatus;
    use receipting_core::repository::export_repo;
    use receipting_core::store::CancelToken;
    use receipting_core::{Exporter, PalletLifecycle, ReceiptEngine, RepositoryError};

    #[test]
    fn test_receipts_csv_contract() {
        let (_file, store) = create_test_store();
        let (project, user) = seed_project(&store);
        let cancel = CancelToken::none();
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let engine = ReceiptEngine::with_clock(store.clone(), test_clock());
        let exporter = Exporter::with_clock(store.clone(), test_clock());

        let p1 = lifecycle.allocate_one(user, project, &cancel).unwrap();
        let p2 = lifecycle.allocate_one(user, project, &cancel).unwrap();

        // Insert on the higher pallet first; output is still pallet_id ASC
        let mut b = basic_input(p2.id, "BBB", 3);
        b.item_barcode = Some("ITEM-B".to_string());
        b.expiry_date = NaiveDate::from_ymd_opt(2026, 12, 31);
        b.batch_number = Some("B9".to_string());
        engine.save_receipt(user, b, &cancel).unwrap();
        engine
            .save_receipt(user, basic_input(p1.id, "AAA", 2), &cancel)
            .unwrap();

        let mut out = Vec::new();
        let rows = exporter
            .receipts_csv(Some(user), project, &mut out, &cancel)
            .unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "pallet_id,sku,description,qty,case_size,item_barcode,carton_barcode,expiry,batch_number"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("{},AAA,AAA description,2,6,,,,", p1.id)
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("{},BBB,BBB description,3,6,ITEM-B,,31/12/2026,B9", p2.id)
        );

        let runs = store
            .with_read_tx(&cancel, export_repo::list)
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].export_type, "receipts");
        assert_eq!(runs[0].project_id, Some(project));
        assert_eq!(runs[0].user_id, Some(user));
    }

    #[test]
    fn test_pallet_status_csv_contract() {
        let (_file, store) = create_test_store();
        let (project, user) = seed_project(&store);
        let cancel = CancelToken::none();
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let engine = ReceiptEngine::with_clock(store.clone(), test_clock());
        let exporter = Exporter::with_clock(store.clone(), test_clock());

        let pallet = lifecycle.allocate_one(user, project, &cancel).unwrap();
        engine
            .save_receipt(user, basic_input(pallet.id, "AAA", 2), &cancel)
            .unwrap();
        lifecycle
            .transition(user, project, pallet.id, PalletStatus::Closed, &cancel)
            .unwrap();

        let mut out = Vec::new();
        let rows = exporter
            .pallet_status_csv(Some(user), project, &mut out, &cancel)
            .unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "pallet_id,status,line_count,created_at,closed_at,reopened_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("{},closed,1,01/06/2026 10:00,01/06/2026 10:00,", pallet.id)
        );
    }

    #[test]
    fn test_export_unknown_project_fails() {
        let (_file, store) = create_test_store();
        let exporter = Exporter::with_clock(store, test_clock());
        let cancel = CancelToken::none();

        let mut out = Vec::new();
        let err = exporter
            .receipts_csv(None, 99, &mut out, &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert!(out.is_empty());
    }
}
