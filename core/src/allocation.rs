//! Vendor allocations.
//!
//! An allocation says how many of a booking's vehicles one vendor supplies.
//! The vendor id is the only reconciliation key, so a booking holds at most
//! one allocation per vendor.

use crate::error::{AllocationError, Result};
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `(vendor, requested_count)` pairing for a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Vendor (transporter) user supplying the vehicles
    pub vendor_id: UserId,
    /// Number of vehicles requested from this vendor
    pub requested_count: u32,
    /// Transporter display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transporter_name: Option<String>,
    /// Contact person at the transporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    /// Contact person's mobile number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_mobile: Option<String>,
}

impl Allocation {
    /// Creates an allocation without contact metadata.
    #[must_use]
    pub const fn new(vendor_id: UserId, requested_count: u32) -> Self {
        Self {
            vendor_id,
            requested_count,
            transporter_name: None,
            contact_person: None,
            contact_mobile: None,
        }
    }

    /// Creates an allocation from a signed count supplied by a client.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidAllocation`] if the count is negative
    /// or does not fit in a `u32`.
    pub fn try_new(vendor_id: UserId, requested_count: i64) -> Result<Self> {
        let count = u32::try_from(requested_count).map_err(|_| {
            AllocationError::invalid(format!(
                "requested count for vendor {vendor_id} must be between 0 and {}, got {requested_count}",
                u32::MAX
            ))
        })?;
        Ok(Self::new(vendor_id, count))
    }

    /// Attach transporter contact details.
    #[must_use]
    pub fn with_contact(
        mut self,
        transporter_name: impl Into<String>,
        contact_person: Option<String>,
        contact_mobile: Option<String>,
    ) -> Self {
        self.transporter_name = Some(transporter_name.into());
        self.contact_person = contact_person;
        self.contact_mobile = contact_mobile;
        self
    }
}

/// Total vehicles requested across allocations.
#[must_use]
pub fn total_requested(allocations: &[Allocation]) -> u64 {
    allocations
        .iter()
        .map(|a| u64::from(a.requested_count))
        .sum()
}

/// Rejects allocation lists that name the same vendor twice.
///
/// # Errors
///
/// Returns [`AllocationError::InvalidAllocation`] on the first duplicate.
pub fn ensure_unique_vendors(allocations: &[Allocation]) -> Result<()> {
    let mut seen = HashSet::with_capacity(allocations.len());
    for allocation in allocations {
        if !seen.insert(allocation.vendor_id) {
            return Err(AllocationError::invalid(format!(
                "vendor {} is allocated more than once",
                allocation.vendor_id
            )));
        }
    }
    Ok(())
}

/// Validates an allocation list against a booking's vehicle quantity.
///
/// # Errors
///
/// Returns [`AllocationError::InvalidAllocation`] if vendors repeat or the
/// requested total exceeds `vehicle_quantity`.
pub fn validate_allocations(allocations: &[Allocation], vehicle_quantity: u32) -> Result<()> {
    ensure_unique_vendors(allocations)?;

    let allocated = total_requested(allocations);
    if allocated > u64::from(vehicle_quantity) {
        return Err(AllocationError::invalid(format!(
            "allocated ({allocated}) exceeds total vehicles ({vehicle_quantity})"
        )));
    }

    Ok(())
}
