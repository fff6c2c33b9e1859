//! # Fleet Allocation Testing
//!
//! Testing utilities for fleet allocation.
//!
//! This crate provides:
//! - Deterministic environment mocks ([`FixedClock`], [`ManualClock`],
//!   [`SequentialIdGenerator`])
//! - [`InMemoryFleetStore`]: bookings, assignments and audit log behind one lock
//! - [`RecordingNotifier`]: captures notifications, can be told to fail
//! - Fixtures for actors and transport details
//! - proptest strategies
//!
//! ## Example
//!
//! ```
//! use fleet_allocation_core::{AssignmentStore, BookingId};
//! use fleet_allocation_testing::InMemoryFleetStore;
//!
//! # async fn example() -> fleet_allocation_core::Result<()> {
//! let store = InMemoryFleetStore::new();
//! let assignments = store.list_by_booking(BookingId::new()).await?;
//! assert!(assignments.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod memory;
pub mod mocks;
pub mod properties;

pub use memory::InMemoryFleetStore;
pub use mocks::{FixedClock, ManualClock, RecordingNotifier, SequentialIdGenerator, test_clock};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
