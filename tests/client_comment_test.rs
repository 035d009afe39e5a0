// ==========================================
// Client comment tests
// ==========================================
// Instance-matched comment creation and the hasClientComments flags in
// the projections.
// ==========================================


#[cfg(test)]
mod client_comment_test {
    use crate::test_helpers::*;
    use receipting_core::domain::types::{ContentFilter, PalletStatus};
    use receipting_core::engine::ClientCommentService;
    use receipting_core::store::CancelToken;
    use receipting_core::{PalletLifecycle, Projections, ReceiptEngine, RepositoryError};

    fn setup() -> (
        tempfile::NamedTempFile,
        receipting_core::Store,
        ClientCommentService,
        ReceiptEngine,
        i64,
        i64,
        i64,
    ) {
        let (file, store) = create_test_store();
        let (project, user) = seed_project(&store);
        let lifecycle = PalletLifecycle::with_clock(store.clone(), test_clock());
        let pallet = lifecycle
            .allocate_one(user, project, &CancelToken::none())
            .unwrap();
        let comments = ClientCommentService::with_clock(store.clone(), test_clock());
        let engine = ReceiptEngine::with_clock(store.clone(), test_clock());
        (file, store, comments, engine, project, user, pallet.id)
    }

    #[test]
    fn test_comment_guards() {
        let (_file, _store, comments, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        // Empty comment
        let err = comments
            .add(user, project, pallet, "ABC", "EA", None, None, "  ", &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        // No matching line yet
        let err = comments
            .add(user, project, pallet, "ABC", "EA", None, None, "note", &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();
        let comment = comments
            .add(user, project, pallet, "ABC", "EA", None, None, "note", &cancel)
            .unwrap();
        assert_eq!(comment.comment, "note");

        // Wrong project
        let err = comments
            .add(user, project + 1, pallet, "ABC", "EA", None, None, "x", &cancel)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_comments_allowed_on_closed_pallet() {
        let (_file, store, comments, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        engine
            .save_receipt(user, basic_input(pallet, "ABC", 2), &cancel)
            .unwrap();
        let lifecycle = PalletLifecycle::with_clock(store, test_clock());
        lifecycle
            .transition(user, project, pallet, PalletStatus::Closed, &cancel)
            .unwrap();

        // Review happens after receipting; closed pallets accept comments
        comments
            .add(user, project, pallet, "ABC", "EA", None, None, "looks short", &cancel)
            .unwrap();
        let listed = comments
            .list_on_pallet(pallet, "ABC", "EA", None, None, &cancel)
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_instance_matching_and_projection_flags() {
        let (_file, store, comments, engine, project, user, pallet) = setup();
        let cancel = CancelToken::none();

        let mut with_batch = basic_input(pallet, "ABC", 2);
        with_batch.batch_number = Some("B1".to_string());
        engine.save_receipt(user, with_batch, &cancel).unwrap();
        engine
            .save_receipt(user, basic_input(pallet, "ABC", 3), &cancel)
            .unwrap();

        // Comment on the blank-batch instance only; batch NULL and blank
        // are the same instance
        comments
            .add(
                user, project, pallet, "ABC", "EA", Some("  "), None, "blank batch note", &cancel,
            )
            .unwrap();

        let projections = Projections::with_clock(store, test_clock());
        let content = projections
            .pallet_content(pallet, ContentFilter::All, &cancel)
            .unwrap();
        let flagged: Vec<bool> = content
            .lines
            .iter()
            .map(|l| l.has_client_comments)
            .collect();
        // B1 line unflagged, blank-batch line flagged
        let b1 = content
            .lines
            .iter()
            .position(|l| l.batch_number == "B1")
            .unwrap();
        let blank = content
            .lines
            .iter()
            .position(|l| l.batch_number.is_empty())
            .unwrap();
        assert!(!flagged[b1]);
        assert!(flagged[blank]);

        // client_comment filter in the summary
        let rows = projections
            .sku_summary(project, ContentFilter::ClientComment, &cancel)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].batch, "");

        // Newest-first listing across the project
        comments
            .add(user, project, pallet, "ABC", "EA", None, None, "second note", &cancel)
            .unwrap();
        let listed = comments
            .list_in_project(project, "ABC", "EA", None, None, &cancel)
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].comment, "second note");
    }
}
