//! Mock implementations of environment traits and the notifier.

use chrono::{DateTime, Duration, Utc};
use fleet_allocation_core::{
    AllocationError, AssignmentId, BookingId, Clock, IdGenerator, Notification, Notifier, Result,
    UserId,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use fleet_allocation_testing::mocks::FixedClock;
/// use fleet_allocation_core::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-06-01 09:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(test_epoch())
}

/// 2025-06-01 09:00:00 UTC
#[must_use]
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    time: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(test_epoch())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Predictable ids: `00000000-0000-0000-0000-000000000001`, `...02`, ...
///
/// Assignment and booking ids come from separate counters.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    assignments: AtomicU64,
    bookings: AtomicU64,
}

impl SequentialIdGenerator {
    /// Fresh generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`-th assignment id this generator hands out (1-based).
    #[must_use]
    pub fn assignment_id(n: u64) -> AssignmentId {
        AssignmentId::from_uuid(Uuid::from_u128(u128::from(n)))
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_assignment_id(&self) -> AssignmentId {
        Self::assignment_id(self.assignments.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_booking_id(&self) -> BookingId {
        let n = self.bookings.fetch_add(1, Ordering::SeqCst) + 1;
        // Booking ids live in a separate range so they never equal assignment ids
        BookingId::from_uuid(Uuid::from_u128((1u128 << 64) | u128::from(n)))
    }
}

/// Notifier that records deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(UserId, Notification)>>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
    always_fail: bool,
}

impl RecordingNotifier {
    /// Notifier that delivers everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that fails every delivery.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Notifier whose first `n` attempts fail, across all recipients.
    #[must_use]
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Successfully delivered notifications, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<(UserId, Notification)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications delivered to `recipient`.
    #[must_use]
    pub fn delivered_to(&self, recipient: UserId) -> Vec<Notification> {
        self.delivered()
            .into_iter()
            .filter(|(user, _)| *user == recipient)
            .map(|(_, n)| n)
            .collect()
    }

    /// Delivery attempts, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        self.always_fail
            || self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        recipient: UserId,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.should_fail() {
                return Err(AllocationError::NotificationDelivery {
                    recipient,
                    reason: "simulated delivery failure".to_string(),
                });
            }
            self.delivered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((recipient, notification));
            Ok(())
        })
    }
}
