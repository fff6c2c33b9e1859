//! proptest strategies for allocation lists.

use fleet_allocation_core::{Allocation, UserId};
use proptest::prelude::*;

/// Requested counts for up to `max_vendors` vendors, each in `0..=max_count`.
pub fn counts(max_vendors: usize, max_count: u32) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0..=max_count, 0..=max_vendors)
}

/// A sequence of allocation updates over the same fixed set of vendors.
///
/// Each step is a list of requested counts, one per vendor.
pub fn count_updates(
    vendors: usize,
    max_count: u32,
    steps: usize,
) -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(prop::collection::vec(0..=max_count, vendors), 1..=steps)
}

/// Pair each count with a vendor, reusing `vendors` by position.
#[must_use]
pub fn allocations_for(vendors: &[UserId], counts: &[u32]) -> Vec<Allocation> {
    vendors
        .iter()
        .zip(counts)
        .map(|(&vendor, &count)| Allocation::new(vendor, count))
        .collect()
}
