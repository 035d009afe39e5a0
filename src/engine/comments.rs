// ==========================================
// ClientCommentService - reviewer comments on SKU-instances
// ==========================================
// Comments attach to an SKU-instance on a specific pallet and may be
// written even after the pallet is closed or the project deactivated;
// review happens after receipting ends. They are never audited.
// ==========================================

use crate::domain::instance::SkuInstance;
use crate::domain::ClientComment;
use crate::engine::Clock;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{comment_repo, pallet_repo, receipt_repo};
use crate::store::{CancelToken, Store};
use chrono::NaiveDate;
use tracing::info;

pub struct ClientCommentService {
    store: Store,
    clock: Clock,
}

impl ClientCommentService {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Add a comment to an SKU-instance on a pallet. The instance must
    /// actually exist there.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        user_id: i64,
        project_id: i64,
        pallet_id: i64,
        sku: &str,
        uom: &str,
        batch: Option<&str>,
        expiry: Option<NaiveDate>,
        comment: &str,
        cancel: &CancelToken,
    ) -> RepositoryResult<ClientComment> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(RepositoryError::Validation(
                "comment must not be empty".to_string(),
            ));
        }
        let instance = SkuInstance::new(sku.trim(), uom, batch, expiry);
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let pallet = pallet_repo::get(tx, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
            if pallet.project_id != project_id {
                return Err(RepositoryError::not_found("pallet", pallet_id));
            }
            if !receipt_repo::instance_exists_on_pallet(tx, pallet_id, &instance)? {
                return Err(RepositoryError::not_found(
                    "sku instance",
                    format!("{}/{}", pallet_id, instance.sku),
                ));
            }

            let id = comment_repo::insert(tx, now, project_id, pallet_id, &instance, comment, user_id)?;

            info!(pallet_id, sku = %instance.sku, "client comment added");
            Ok(ClientComment {
                id,
                project_id,
                pallet_id,
                sku: instance.sku.clone(),
                uom: instance.uom.clone(),
                batch_number: instance.batch.clone(),
                expiry_date: instance.expiry,
                comment: comment.to_string(),
                created_by_user_id: user_id,
                created_at: now,
            })
        })
    }

    /// Comments for one SKU-instance on one pallet, newest first.
    pub fn list_on_pallet(
        &self,
        pallet_id: i64,
        sku: &str,
        uom: &str,
        batch: Option<&str>,
        expiry: Option<NaiveDate>,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<ClientComment>> {
        let instance = SkuInstance::new(sku.trim(), uom, batch, expiry);
        self.store.with_read_tx(cancel, |conn| {
            comment_repo::list_for_instance_on_pallet(conn, pallet_id, &instance)
        })
    }

    /// Comments for one SKU-instance across the whole project, newest
    /// first.
    pub fn list_in_project(
        &self,
        project_id: i64,
        sku: &str,
        uom: &str,
        batch: Option<&str>,
        expiry: Option<NaiveDate>,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<ClientComment>> {
        let instance = SkuInstance::new(sku.trim(), uom, batch, expiry);
        self.store.with_read_tx(cancel, |conn| {
            comment_repo::list_for_instance_in_project(conn, project_id, &instance)
        })
    }
}
