//! Property tests: arbitrary allocation update sequences through the service.

#![allow(clippy::unwrap_used)] // Test code
#![allow(clippy::expect_used)] // Test code

use fleet_allocation_core::{AssignmentStore, ReconcileEnvironment, UserId};
use fleet_allocation_runtime::{AllocationService, RetryPolicy};
use fleet_allocation_testing::properties::{allocations_for, count_updates};
use fleet_allocation_testing::{InMemoryFleetStore, RecordingNotifier, fixtures, test_clock};
use proptest::prelude::*;
use std::sync::Arc;

const VENDORS: usize = 3;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counts_track_every_update(steps in count_updates(VENDORS, 4, 6)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        runtime.block_on(async {
            let store = Arc::new(InMemoryFleetStore::new());
            let notifier = Arc::new(RecordingNotifier::new());
            let service = AllocationService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                notifier.clone(),
                ReconcileEnvironment::new(
                    Arc::new(test_clock()),
                    Arc::new(fleet_allocation_testing::SequentialIdGenerator::new()),
                ),
            )
            .with_notify_retry(RetryPolicy::none());

            let employee = fixtures::employee();
            let vendors: Vec<UserId> = (0..VENDORS).map(|_| UserId::new()).collect();
            let quantity = u32::try_from(VENDORS).expect("small") * 4;
            let booking = service
                .create_booking(&employee, fixtures::new_booking(quantity, vec![]))
                .await
                .expect("valid booking")
                .booking;

            let mut created = 0;
            for counts in &steps {
                let change = service
                    .update_allocations(&employee, booking.id, allocations_for(&vendors, counts))
                    .await
                    .expect("valid update");
                created += change.outcome.created.len();

                for (vendor, &count) in vendors.iter().zip(counts) {
                    let held = store.list_by_vendor(*vendor).await.expect("list").len();
                    prop_assert_eq!(held, count as usize);
                }
            }

            prop_assert_eq!(notifier.delivered().len(), created);
            Ok(())
        })?;
    }
}
