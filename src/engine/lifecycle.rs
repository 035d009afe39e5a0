// ==========================================
// PalletLifecycle - pallet ids and status transitions
// ==========================================
// State machine: created -> open -> closed <-> open,
// closed -> labelled, any non-cancelled -> cancelled.
// The created -> open promotion on first receipt belongs to the
// ReceiptEngine; explicit transitions live here and are always audited.
// ==========================================

use crate::domain::types::{AuditAction, PalletStatus, ProjectStatus};
use crate::domain::Pallet;
use crate::engine::Clock;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{audit_repo, pallet_repo, project_repo};
use crate::store::{CancelToken, Store};
use rusqlite::Connection;
use tracing::info;

/// Bulk allocation upper bound per call.
pub const MAX_BULK_ALLOCATION: i64 = 500;

pub struct PalletLifecycle {
    store: Store,
    clock: Clock,
}

impl PalletLifecycle {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Allocate one pallet in `created` status.
    pub fn allocate_one(
        &self,
        user_id: i64,
        project_id: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<Pallet> {
        let mut pallets = self.allocate_bulk(user_id, project_id, 1, cancel)?;
        Ok(pallets.remove(0))
    }

    /// Allocate `count` pallets with contiguous ids (max(id)+1 upward)
    /// inside one write transaction.
    pub fn allocate_bulk(
        &self,
        user_id: i64,
        project_id: i64,
        count: i64,
        cancel: &CancelToken,
    ) -> RepositoryResult<Vec<Pallet>> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        if !(1..=MAX_BULK_ALLOCATION).contains(&count) {
            return Err(RepositoryError::Validation(format!(
                "pallet allocation count must be between 1 and {MAX_BULK_ALLOCATION}"
            )));
        }

        let now = self.clock.now();
        self.store.with_write_tx(cancel, |tx| {
            require_active_project(tx, project_id)?;

            let first_id = pallet_repo::next_id(tx)?;
            let mut pallets = Vec::with_capacity(count as usize);
            for offset in 0..count {
                let pallet = Pallet {
                    id: first_id + offset,
                    project_id,
                    status: PalletStatus::Created,
                    created_at: now,
                    closed_at: None,
                    reopened_at: None,
                };
                pallet_repo::insert(tx, &pallet)?;
                audit_repo::write(
                    tx,
                    now,
                    user_id,
                    AuditAction::PalletCreate,
                    "pallets",
                    &pallet.id.to_string(),
                    None::<&Pallet>,
                    Some(&pallet),
                )?;
                pallets.push(pallet);
            }

            info!(project_id, first_id, count, "allocated pallets");
            Ok(pallets)
        })
    }

    pub fn load(&self, pallet_id: i64, cancel: &CancelToken) -> RepositoryResult<Pallet> {
        self.store.with_read_tx(cancel, |conn| {
            pallet_repo::get(conn, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))
        })
    }

    /// Apply one explicit status transition. Exactly one transition per
    /// write; redundant transitions fail with InvalidTransition.
    pub fn transition(
        &self,
        user_id: i64,
        project_id: i64,
        pallet_id: i64,
        to: PalletStatus,
        cancel: &CancelToken,
    ) -> RepositoryResult<Pallet> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        self.store.with_write_tx(cancel, |tx| {
            let before = pallet_repo::get(tx, pallet_id)?
                .ok_or_else(|| RepositoryError::not_found("pallet", pallet_id))?;
            if before.project_id != project_id {
                return Err(RepositoryError::not_found("pallet", pallet_id));
            }
            require_active_project(tx, project_id)?;

            if !transition_allowed(before.status, to) {
                return Err(RepositoryError::InvalidTransition {
                    from: before.status.to_string(),
                    to: to.to_string(),
                });
            }

            let mut pallet = before.clone();
            pallet.status = to;
            match to {
                PalletStatus::Open => pallet.reopened_at = Some(now),
                PalletStatus::Closed => pallet.closed_at = Some(now),
                PalletStatus::Cancelled => {
                    pallet.closed_at = pallet.closed_at.or(Some(now));
                }
                PalletStatus::Labelled => {}
                PalletStatus::Created => unreachable!("never a transition target"),
            }
            pallet_repo::update_status(tx, &pallet)?;

            audit_repo::write(
                tx,
                now,
                user_id,
                audit_action_for(to),
                "pallets",
                &pallet.id.to_string(),
                Some(&before),
                Some(&pallet),
            )?;

            info!(
                pallet_id,
                from = %before.status,
                to = %pallet.status,
                "pallet transition"
            );
            Ok(pallet)
        })
    }
}

fn require_active_project(conn: &Connection, project_id: i64) -> RepositoryResult<()> {
    match project_repo::get_status(conn, project_id)? {
        None => Err(RepositoryError::not_found("project", project_id)),
        Some(ProjectStatus::Active) => Ok(()),
        Some(ProjectStatus::Inactive) => Err(RepositoryError::ReadOnlyProject { project_id }),
    }
}

/// The explicit transition table. The created -> open edge is excluded:
/// it only happens implicitly on first receipt.
fn transition_allowed(from: PalletStatus, to: PalletStatus) -> bool {
    match to {
        PalletStatus::Open => from == PalletStatus::Closed,
        PalletStatus::Closed => from == PalletStatus::Open,
        PalletStatus::Labelled => from == PalletStatus::Closed,
        PalletStatus::Cancelled => from != PalletStatus::Cancelled,
        PalletStatus::Created => false,
    }
}

fn audit_action_for(to: PalletStatus) -> AuditAction {
    match to {
        PalletStatus::Open => AuditAction::PalletReopen,
        PalletStatus::Closed => AuditAction::PalletClose,
        PalletStatus::Labelled => AuditAction::PalletLabelled,
        PalletStatus::Cancelled => AuditAction::PalletCancel,
        PalletStatus::Created => AuditAction::PalletCreate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use PalletStatus::*;

        assert!(transition_allowed(Open, Closed));
        assert!(transition_allowed(Closed, Open));
        assert!(transition_allowed(Closed, Labelled));
        assert!(transition_allowed(Created, Cancelled));
        assert!(transition_allowed(Open, Cancelled));
        assert!(transition_allowed(Labelled, Cancelled));

        // Redundant or reversed edges
        assert!(!transition_allowed(Closed, Closed));
        assert!(!transition_allowed(Created, Closed));
        assert!(!transition_allowed(Created, Open));
        assert!(!transition_allowed(Labelled, Closed));
        assert!(!transition_allowed(Labelled, Open));
        assert!(!transition_allowed(Cancelled, Cancelled));
        assert!(!transition_allowed(Cancelled, Open));
        assert!(!transition_allowed(Open, Labelled));
    }
}
