// ==========================================
// Cancellation token
// ==========================================
// Every store operation takes a token; it is honoured at transaction
// boundaries (before begin, before commit). A cancelled write rolls back.
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared cancellation flag with an optional deadline.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never cancels.
    pub fn none() -> Self {
        Self::default()
    }

    /// A token that cancels once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation. Takes effect at the next boundary check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Boundary check: error out when cancelled.
    pub fn check(&self) -> RepositoryResult<()> {
        if self.is_cancelled() {
            Err(RepositoryError::Cancelled)
        } else {
            Ok(())
        }
    }
}
