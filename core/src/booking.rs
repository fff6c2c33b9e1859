//! Bookings (transport forms).

use crate::access::{Actor, Role, permissions};
use crate::allocation::{self, Allocation};
use crate::error::{AllocationError, Result};
use crate::ids::{BookingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Booking lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Vehicles still being arranged
    #[default]
    Pending,
    /// Booking closed
    Completed,
}

impl BookingStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(AllocationError::Storage(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

/// Input for creating a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Shipping line booking number
    pub booking_no: String,
    /// Total vehicles required
    pub vehicle_quantity: u32,
    /// Initial vendor split
    pub allocations: Vec<Allocation>,
}

impl NewBooking {
    /// Validate quantity and allocations.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidAllocation`] for a zero quantity, a
    /// blank booking number, repeated vendors or over-allocation.
    pub fn validate(&self) -> Result<()> {
        if self.booking_no.trim().is_empty() {
            return Err(AllocationError::invalid("booking number is required"));
        }
        if self.vehicle_quantity == 0 {
            return Err(AllocationError::invalid(
                "total vehicles must be greater than zero",
            ));
        }
        allocation::validate_allocations(&self.allocations, self.vehicle_quantity)
    }
}

/// A transport booking and its vendor allocations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub id: BookingId,
    /// Human-readable reference, e.g. `IFL2025-26-00001`
    pub ref_id: String,
    /// Shipping line booking number
    pub booking_no: String,
    /// Employee who created the booking
    pub created_by: UserId,
    /// Total vehicles required
    pub vehicle_quantity: u32,
    /// Vendor split
    pub allocations: Vec<Allocation>,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Set while the booking is soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion: Option<BookingDeletion>,
}

/// Who deleted a booking, when and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDeletion {
    /// Deletion time
    pub deleted_at: DateTime<Utc>,
    /// Deleting user
    pub deleted_by: UserId,
    /// Free-text reason
    pub reason: String,
}

impl Booking {
    /// Whether the booking is soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deletion.is_some()
    }

    /// Whether `actor` may read this booking.
    ///
    /// Admins read everything, employees their own bookings, vendors the
    /// bookings allocated to them and order placers every booking.
    #[must_use]
    pub fn visible_to(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => actor.is_admin(),
            Role::Employee => {
                actor.has_permission(permissions::FORMS_READ) && actor.id == self.created_by
            }
            Role::Vendor => {
                actor.has_permission(permissions::VEHICLES_READ)
                    && self.allocation_for(actor.id).is_some()
            }
            Role::OrderPlacer => actor.has_permission(permissions::FORMS_READ),
        }
    }

    /// Whether `actor` may change this booking: admins always, employees only
    /// for bookings they created.
    #[must_use]
    pub fn editable_by(&self, actor: &Actor) -> bool {
        actor.is_admin() || (actor.is_active && actor.role == Role::Employee && actor.id == self.created_by)
    }

    /// Allocation for `vendor_id`, if any.
    #[must_use]
    pub fn allocation_for(&self, vendor_id: UserId) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.vendor_id == vendor_id)
    }

    /// Validate a replacement allocation list against this booking.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidAllocation`] for repeated vendors or
    /// over-allocation.
    pub fn check_allocations(&self, allocations: &[Allocation]) -> Result<()> {
        allocation::validate_allocations(allocations, self.vehicle_quantity)
    }

    /// Allocation list for an update, with every previously allocated vendor
    /// that is missing from `allocations` carried over at count zero.
    ///
    /// Reconciliation leaves vendors without an allocation untouched, so a
    /// vendor dropped from the list must be sent explicitly as zero to have
    /// its drafts removed.
    #[must_use]
    pub fn with_dropped_vendors_zeroed(&self, allocations: Vec<Allocation>) -> Vec<Allocation> {
        let mut merged = allocations;
        for previous in &self.allocations {
            if !merged.iter().any(|a| a.vendor_id == previous.vendor_id) {
                merged.push(Allocation {
                    requested_count: 0,
                    ..previous.clone()
                });
            }
        }
        merged
    }
}

/// Selection for [`BookingStore::list`](crate::BookingStore::list).
///
/// Every field narrows the result; the default selects all live bookings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    /// Only bookings created by this user
    pub created_by: Option<UserId>,
    /// Only bookings with an allocation for this vendor
    pub vendor_id: Option<UserId>,
    /// Only bookings in this status
    pub status: Option<BookingStatus>,
    /// Created at or after
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before
    pub created_to: Option<DateTime<Utc>>,
    /// Substring of the reference id
    pub ref_id_contains: Option<String>,
    /// Also return soft-deleted bookings
    pub include_deleted: bool,
}

impl BookingFilter {
    /// Whether `booking` passes every criterion.
    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        (self.include_deleted || !booking.is_deleted())
            && self.created_by.is_none_or(|id| booking.created_by == id)
            && self
                .vendor_id
                .is_none_or(|id| booking.allocation_for(id).is_some())
            && self.status.is_none_or(|status| booking.status == status)
            && self.created_from.is_none_or(|from| booking.created_at >= from)
            && self.created_to.is_none_or(|to| booking.created_at <= to)
            && self
                .ref_id_contains
                .as_deref()
                .is_none_or(|query| booking.ref_id.contains(query))
    }
}

/// Booking counts for the admin dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStats {
    /// Live bookings
    pub total: usize,
    /// Of which pending
    pub pending: usize,
    /// Of which completed
    pub completed: usize,
    /// Created in the current calendar month
    pub this_month: usize,
}
