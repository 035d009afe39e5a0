// ==========================================
// ProjectService - project administration
// ==========================================
// Creation derives the project code (slug) from the name and
// auto-suffixes on collision. Status changes flip the whole project
// between writable and read-only and are always audited.
// ==========================================

use crate::domain::types::{AuditAction, ProjectStatus};
use crate::domain::Project;
use crate::engine::Clock;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{audit_repo, project_repo};
use crate::store::{CancelToken, Store};
use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

/// Collision suffixes tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 1000;

pub struct ProjectService {
    store: Store,
    clock: Clock,
}

impl ProjectService {
    pub fn new(store: Store) -> Self {
        Self::with_clock(store, Clock::system())
    }

    pub fn with_clock(store: Store, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Create an active project. The code is slugified from the name;
    /// duplicates get "-2", "-3" and so on.
    pub fn create(
        &self,
        user_id: i64,
        name: &str,
        client_name: &str,
        project_date: Option<NaiveDate>,
        cancel: &CancelToken,
    ) -> RepositoryResult<Project> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::Validation(
                "project name is required".to_string(),
            ));
        }
        let client_name = client_name.trim().to_string();
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let code = unique_code(tx, name)?;
            let id = project_repo::insert(
                tx,
                now,
                name,
                &client_name,
                project_date,
                &code,
                ProjectStatus::Active,
            )?;
            let project = project_repo::get(tx, id)?
                .ok_or_else(|| RepositoryError::not_found("project", id))?;

            audit_repo::write(
                tx,
                now,
                user_id,
                AuditAction::ProjectCreate,
                "projects",
                &id.to_string(),
                None::<&Project>,
                Some(&project),
            )?;

            info!(project_id = id, code = %code, "project created");
            Ok(project)
        })
    }

    /// Flip a project between active and inactive. Setting the current
    /// status again is a no-op that still returns the project.
    pub fn set_status(
        &self,
        user_id: i64,
        project_id: i64,
        status: ProjectStatus,
        cancel: &CancelToken,
    ) -> RepositoryResult<Project> {
        if user_id <= 0 {
            return Err(RepositoryError::Validation(
                "user id must be positive".to_string(),
            ));
        }
        let now = self.clock.now();

        self.store.with_write_tx(cancel, |tx| {
            let before = project_repo::get(tx, project_id)?
                .ok_or_else(|| RepositoryError::not_found("project", project_id))?;
            if before.status == status {
                return Ok(before);
            }

            project_repo::set_status(tx, now, project_id, status)?;
            let after = project_repo::get(tx, project_id)?
                .ok_or_else(|| RepositoryError::not_found("project", project_id))?;

            let action = match status {
                ProjectStatus::Active => AuditAction::ProjectActivate,
                ProjectStatus::Inactive => AuditAction::ProjectStatus,
            };
            audit_repo::write(
                tx,
                now,
                user_id,
                action,
                "projects",
                &project_id.to_string(),
                Some(&before),
                Some(&after),
            )?;

            info!(project_id, status = %status, "project status changed");
            Ok(after)
        })
    }

    pub fn load(&self, project_id: i64, cancel: &CancelToken) -> RepositoryResult<Project> {
        self.store.with_read_tx(cancel, |conn| {
            project_repo::get(conn, project_id)?
                .ok_or_else(|| RepositoryError::not_found("project", project_id))
        })
    }

    pub fn list(&self, cancel: &CancelToken) -> RepositoryResult<Vec<Project>> {
        self.store.with_read_tx(cancel, project_repo::list)
    }
}

/// Lowercase the name, keep alphanumerics, collapse the rest to single
/// hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("project");
    }
    slug
}

fn unique_code(conn: &Connection, name: &str) -> RepositoryResult<String> {
    let base = slugify(name);
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = if attempt == 1 {
            base.clone()
        } else {
            format!("{base}-{attempt}")
        };
        if !project_repo::code_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(RepositoryError::Conflict(format!(
        "no free project code for '{base}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Spring 2026"), "acme-spring-2026");
        assert_eq!(slugify("  Fête & Co!  "), "f-te-co");
        assert_eq!(slugify("---"), "project");
        assert_eq!(slugify("ALLCAPS"), "allcaps");
    }
}
