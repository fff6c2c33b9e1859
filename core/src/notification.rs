//! Vendor notifications.

use crate::assignment::DraftAssignment;
use crate::error::Result;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Notification kind sent when a vendor receives a new vehicle slot.
pub const FORM_ASSIGNED: &str = "form_assigned";

/// Message addressed to a user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Machine-readable kind, e.g. `form_assigned`
    pub kind: String,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
    /// Structured payload for clients
    pub data: serde_json::Value,
}

impl Notification {
    /// Notification for a freshly created draft assignment.
    #[must_use]
    pub fn vehicle_assigned(ref_id: &str, draft: &DraftAssignment) -> Self {
        Self {
            kind: FORM_ASSIGNED.to_string(),
            title: "New vehicle assignment".to_string(),
            message: format!(
                "Booking {ref_id} has a vehicle slot waiting for your vehicle and driver details."
            ),
            data: serde_json::json!({
                "booking_id": draft.booking_id,
                "ref_id": ref_id,
                "assignment_id": draft.id,
            }),
        }
    }
}

/// Delivers notifications.
///
/// Delivery is fire-and-forget from the caller's point of view: errors are
/// returned so the dispatcher can retry and log them, but they never undo the
/// change that triggered the notification.
pub trait Notifier: Send + Sync {
    /// Deliver `notification` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::NotificationDelivery`](crate::AllocationError::NotificationDelivery)
    /// when the message could not be delivered.
    fn notify(
        &self,
        recipient: UserId,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
