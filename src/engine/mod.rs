// ==========================================
// Warehouse Receipting - engine layer
// ==========================================
// Business rules over the store: pallet lifecycle, the merge/split
// receipt engine, project administration and client comments. Every
// public operation is a single scoped call that succeeds or fails
// atomically.
// ==========================================

pub mod comments;
pub mod lifecycle;
pub mod projects;
pub mod receipt;

pub use comments::ClientCommentService;
pub use lifecycle::PalletLifecycle;
pub use projects::ProjectService;
pub use receipt::{ReceiptEngine, MAX_PHOTO_BYTES};

use chrono::{NaiveDateTime, Utc};
use std::fmt;
use std::sync::Arc;

// ==========================================
// Clock - ambient "now"
// ==========================================
// The audit actor and "now" are explicit inputs, not globals, so tests
// control both.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> NaiveDateTime + Send + Sync>);

impl Clock {
    /// Wall-clock time in UTC.
    pub fn system() -> Self {
        Clock(Arc::new(|| Utc::now().naive_utc()))
    }

    /// A clock pinned to one instant.
    pub fn fixed(at: NaiveDateTime) -> Self {
        Clock(Arc::new(move || at))
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Clock")
    }
}
