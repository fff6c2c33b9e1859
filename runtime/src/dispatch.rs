//! Fire-and-forget notification delivery.

use crate::metrics::NotificationMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use fleet_allocation_core::{AllocationError, Notification, Notifier, UserId};
use futures::future::join_all;
use std::sync::Arc;

/// Result of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications delivered
    pub delivered: usize,
    /// Notifications dropped after retries
    pub failed: usize,
}

/// Sends notifications in parallel, retrying each one independently.
///
/// Delivery failures are logged and counted, never returned: a booking
/// edit is not undone because a vendor could not be told about it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    /// Dispatcher over `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, policy: RetryPolicy) -> Self {
        Self { notifier, policy }
    }

    /// Same notifier, different retry policy.
    #[must_use]
    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Deliver every notification and wait for all of them to settle.
    pub async fn dispatch(&self, batch: Vec<(UserId, Notification)>) -> DispatchReport {
        if batch.is_empty() {
            return DispatchReport::default();
        }

        let deliveries = batch.into_iter().map(|(recipient, notification)| async move {
            let result = retry_with_predicate(
                &self.policy,
                || self.notifier.notify(recipient, notification.clone()),
                is_transient,
            )
            .await;

            match result {
                Ok(()) => {
                    NotificationMetrics::record_sent();
                    true
                }
                Err(error) => {
                    NotificationMetrics::record_failed();
                    tracing::warn!(
                        %recipient,
                        kind = %notification.kind,
                        %error,
                        "Notification dropped"
                    );
                    false
                }
            }
        });

        let outcomes = join_all(deliveries).await;
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = DispatchReport {
            delivered,
            failed: outcomes.len() - delivered,
        };
        tracing::debug!(delivered = report.delivered, failed = report.failed, "Notifications dispatched");
        report
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn is_transient(error: &AllocationError) -> bool {
    matches!(
        error,
        AllocationError::NotificationDelivery { .. } | AllocationError::Storage(_)
    )
}
