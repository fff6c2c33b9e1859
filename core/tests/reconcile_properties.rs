//! Property tests for the reconciler.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use chrono::{DateTime, Duration, TimeZone, Utc};
use fleet_allocation_core::reconciler::reconcile;
use fleet_allocation_core::{
    Allocation, AssignmentId, BookingId, DraftAssignment, ReconcileEnvironment, ReconcilePlan,
    TransportDetails, UserId, VehicleAssignment,
};
use proptest::prelude::*;
use std::collections::HashSet;

/// Per-vendor shape: (existing drafts, existing submitted, requested).
type VendorShape = (usize, usize, u32);

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn details() -> TransportDetails {
    TransportDetails {
        vehicle_number: "GJ05XY0001".to_string(),
        driver_name: "Mehul".to_string(),
        driver_mobile: "9822222222".to_string(),
        container_number: None,
        seal_number: None,
        estimated_departure: base(),
        estimated_arrival: base() + Duration::hours(2),
    }
}

fn build(shapes: &[VendorShape]) -> (BookingId, Vec<Allocation>, Vec<VehicleAssignment>) {
    let booking = BookingId::new();
    let mut allocations = Vec::new();
    let mut existing = Vec::new();
    let mut minute = 0;

    for &(drafts, submitted, requested) in shapes {
        let vendor = UserId::new();
        allocations.push(Allocation::new(vendor, requested));
        let (mut drafts_left, mut submitted_left) = (drafts, submitted);
        for i in 0..drafts + submitted {
            minute += 1;
            let draft = DraftAssignment::new(
                AssignmentId::new(),
                booking,
                vendor,
                base() + Duration::minutes(minute),
            );
            // Interleave submitted records between drafts
            let as_submitted = submitted_left > 0 && (i % 2 == 1 || drafts_left == 0);
            if as_submitted {
                submitted_left -= 1;
                existing.push(VehicleAssignment::Submitted(
                    draft
                        .submit(details(), vendor, base())
                        .expect("valid details"),
                ));
            } else {
                drafts_left -= 1;
                existing.push(VehicleAssignment::Draft(draft));
            }
        }
    }

    (booking, allocations, existing)
}

fn apply(existing: &[VehicleAssignment], plan: &ReconcilePlan) -> Vec<VehicleAssignment> {
    let deleted: HashSet<_> = plan.deleted.iter().copied().collect();
    existing
        .iter()
        .filter(|a| !deleted.contains(&a.id()))
        .cloned()
        .chain(plan.created.iter().cloned().map(VehicleAssignment::Draft))
        .collect()
}

fn count(assignments: &[VehicleAssignment], vendor: UserId, drafts_only: bool) -> usize {
    assignments
        .iter()
        .filter(|a| a.vendor_id() == vendor && (!drafts_only || a.is_draft()))
        .count()
}

fn shapes() -> impl Strategy<Value = Vec<VendorShape>> {
    prop::collection::vec((0usize..6, 0usize..4, 0u32..9), 0..5)
}

proptest! {
    #[test]
    fn second_pass_is_a_noop(shapes in shapes()) {
        let env = ReconcileEnvironment::system();
        let (booking, allocations, existing) = build(&shapes);

        let first = reconcile(booking, &allocations, &existing, &env).expect("valid input");
        let after = apply(&existing, &first);
        let second = reconcile(booking, &allocations, &after, &env).expect("valid input");

        prop_assert!(second.is_empty(), "second pass planned {:?}", second);
    }

    #[test]
    fn counts_match_unless_submitted_exceed_request(shapes in shapes()) {
        let env = ReconcileEnvironment::system();
        let (booking, allocations, existing) = build(&shapes);

        let plan = reconcile(booking, &allocations, &existing, &env).expect("valid input");
        let after = apply(&existing, &plan);

        for allocation in &allocations {
            let submitted = count(&existing, allocation.vendor_id, false)
                - count(&existing, allocation.vendor_id, true);
            let expected = (allocation.requested_count as usize).max(submitted);
            prop_assert_eq!(count(&after, allocation.vendor_id, false), expected);
        }
    }

    #[test]
    fn submitted_records_are_never_planned_for_deletion(shapes in shapes()) {
        let env = ReconcileEnvironment::system();
        let (booking, allocations, existing) = build(&shapes);

        let plan = reconcile(booking, &allocations, &existing, &env).expect("valid input");
        let submitted: HashSet<_> = existing
            .iter()
            .filter(|a| !a.is_draft())
            .map(VehicleAssignment::id)
            .collect();

        prop_assert!(plan.deleted.iter().all(|id| !submitted.contains(id)));
    }

    #[test]
    fn creations_are_exactly_the_deficits(shapes in shapes()) {
        let env = ReconcileEnvironment::system();
        let (booking, allocations, existing) = build(&shapes);

        let plan = reconcile(booking, &allocations, &existing, &env).expect("valid input");

        for allocation in &allocations {
            let current = count(&existing, allocation.vendor_id, false);
            let deficit = (allocation.requested_count as usize).saturating_sub(current);
            let created = plan
                .created
                .iter()
                .filter(|d| d.vendor_id == allocation.vendor_id)
                .count();
            prop_assert_eq!(created, deficit);
        }
    }
}
