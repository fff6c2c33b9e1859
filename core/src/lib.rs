//! # Fleet Allocation Core
//!
//! Domain types and contracts for coordinating transport bookings across
//! vendor fleets.
//!
//! A booking needs N vehicles. Employees split those vehicles between vendors
//! as [`Allocation`]s, and every allocated slot becomes one
//! [`VehicleAssignment`] that the vendor later completes with vehicle and
//! driver details.
//!
//! ## Core Concepts
//!
//! - **Booking**: a transport request with a declared vehicle quantity
//! - **Allocation**: `(vendor, requested_count)` for one booking
//! - **Vehicle assignment**: one slot, `Draft` until the vendor submits details
//! - **Reconciler**: pure function from `(allocations, assignments)` to a plan
//!   of creates and deletes
//! - **Stores**: persistence traits, injected as trait objects
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell: [`reconciler::reconcile`] performs no
//!   I/O, the caller applies its plan through an [`AssignmentStore`]
//! - Explicit dependencies: time and identifiers come from the
//!   [`environment`] traits, the acting user is always an explicit [`Actor`]
//! - Submitted assignments are never deleted or overwritten
//!
//! ## Example
//!
//! ```
//! use fleet_allocation_core::{
//!     Allocation, BookingId, ReconcileEnvironment, UserId, reconciler::reconcile,
//! };
//!
//! let booking_id = BookingId::new();
//! let vendor = UserId::new();
//! let env = ReconcileEnvironment::system();
//!
//! let plan = reconcile(booking_id, &[Allocation::new(vendor, 3)], &[], &env)?;
//! assert_eq!(plan.created.len(), 3);
//! assert!(plan.deleted.is_empty());
//! # Ok::<(), fleet_allocation_core::AllocationError>(())
//! ```

pub mod access;
pub mod allocation;
pub mod assignment;
pub mod audit;
pub mod booking;
pub mod environment;
pub mod error;
pub mod ids;
pub mod notification;
pub mod reconciler;
pub mod ref_id;
pub mod store;

pub use access::{Actor, Role, permissions};
pub use allocation::Allocation;
pub use assignment::{
    AssignmentStatus, DraftAssignment, DraftDetails, SubmittedAssignment, TransportDetails,
    VehicleAssignment,
};
pub use audit::{AuditChanges, AuditEntry, AuditLog};
pub use booking::{Booking, BookingDeletion, BookingFilter, BookingStats, BookingStatus, NewBooking};
pub use environment::{Clock, IdGenerator, RandomIdGenerator, ReconcileEnvironment, SystemClock};
pub use error::{AllocationError, Result};
pub use ids::{AssignmentId, BookingId, UserId};
pub use notification::{Notification, Notifier};
pub use reconciler::{ReconcileOutcome, ReconcilePlan};
pub use ref_id::WorkingYear;
pub use store::{
    AssignmentStore, BookingEdit, BookingEditor, BookingStore, EditedBooking, Planner, StoreFuture,
};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
