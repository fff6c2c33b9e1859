//! Environment module - injected dependencies.
//!
//! The reconciler never reads the system clock or generates random ids on its
//! own. Both come through these traits so tests can pin them down.

use crate::ids::{AssignmentId, BookingId};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use fleet_allocation_core::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of fresh entity identifiers.
pub trait IdGenerator: Send + Sync {
    /// Next vehicle assignment id
    fn next_assignment_id(&self) -> AssignmentId;

    /// Next booking id
    fn next_booking_id(&self) -> BookingId;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_assignment_id(&self) -> AssignmentId {
        AssignmentId::new()
    }

    fn next_booking_id(&self) -> BookingId {
        BookingId::new()
    }
}

/// Dependencies of the reconciler.
#[derive(Clone)]
pub struct ReconcileEnvironment {
    /// Timestamps for created drafts
    pub clock: Arc<dyn Clock>,
    /// Ids for created drafts
    pub ids: Arc<dyn IdGenerator>,
}

impl ReconcileEnvironment {
    /// Creates a new `ReconcileEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }

    /// System clock and random ids.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RandomIdGenerator))
    }
}

impl std::fmt::Debug for ReconcileEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEnvironment").finish_non_exhaustive()
    }
}
