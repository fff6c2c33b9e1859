//! Vehicle assignments.
//!
//! A vehicle assignment is one concrete vehicle slot of a booking, owned by a
//! vendor. It starts as a [`DraftAssignment`] the vendor may edit freely and
//! ends as a [`SubmittedAssignment`] whose [`TransportDetails`] are complete
//! and immutable. The split is a sum type so a submitted record without
//! details cannot be constructed.

use crate::error::{AllocationError, Result};
use crate::ids::{AssignmentId, BookingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a vehicle assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Waiting for vendor details
    Draft,
    /// Vendor details submitted, record is locked
    Submitted,
}

impl AssignmentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            other => Err(AllocationError::Storage(format!(
                "unknown assignment status: {other}"
            ))),
        }
    }
}

/// Partially filled vendor form. Every field is optional while drafting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftDetails {
    /// Vehicle registration number
    pub vehicle_number: Option<String>,
    /// Driver name
    pub driver_name: Option<String>,
    /// Driver mobile number
    pub driver_mobile: Option<String>,
    /// Container number
    pub container_number: Option<String>,
    /// Container seal number
    pub seal_number: Option<String>,
    /// Estimated departure
    pub estimated_departure: Option<DateTime<Utc>>,
    /// Estimated arrival
    pub estimated_arrival: Option<DateTime<Utc>>,
}

impl DraftDetails {
    /// Promote the draft into complete transport details.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::IncompleteDetails`] naming every missing
    /// field, or [`AllocationError::InvalidDetails`] if the schedule is
    /// inconsistent.
    pub fn complete(self) -> Result<TransportDetails> {
        let mut missing = Vec::new();
        let vehicle_number = required(self.vehicle_number, "vehicle_number", &mut missing);
        let driver_name = required(self.driver_name, "driver_name", &mut missing);
        let driver_mobile = required(self.driver_mobile, "driver_mobile", &mut missing);
        if self.estimated_departure.is_none() {
            missing.push("estimated_departure".to_string());
        }
        if self.estimated_arrival.is_none() {
            missing.push("estimated_arrival".to_string());
        }

        match (self.estimated_departure, self.estimated_arrival) {
            (Some(estimated_departure), Some(estimated_arrival)) if missing.is_empty() => {
                let details = TransportDetails {
                    vehicle_number,
                    driver_name,
                    driver_mobile,
                    container_number: self.container_number,
                    seal_number: self.seal_number,
                    estimated_departure,
                    estimated_arrival,
                }
                .normalized();
                details.validate()?;
                Ok(details)
            }
            _ => Err(AllocationError::IncompleteDetails { missing }),
        }
    }
}

fn required(value: Option<String>, field: &str, missing: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(field.to_string());
            String::new()
        }
    }
}

/// Complete vendor-supplied transport details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDetails {
    /// Vehicle registration number
    pub vehicle_number: String,
    /// Driver name
    pub driver_name: String,
    /// Driver mobile number
    pub driver_mobile: String,
    /// Container number
    pub container_number: Option<String>,
    /// Container seal number
    pub seal_number: Option<String>,
    /// Estimated departure
    pub estimated_departure: DateTime<Utc>,
    /// Estimated arrival
    pub estimated_arrival: DateTime<Utc>,
}

impl TransportDetails {
    /// Trim every text field; blank optional fields become `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let optional = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            vehicle_number: self.vehicle_number.trim().to_string(),
            driver_name: self.driver_name.trim().to_string(),
            driver_mobile: self.driver_mobile.trim().to_string(),
            container_number: optional(self.container_number),
            seal_number: optional(self.seal_number),
            ..self
        }
    }

    /// Check required fields and schedule consistency.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::IncompleteDetails`] if a required text field
    /// is blank, [`AllocationError::InvalidDetails`] if arrival precedes
    /// departure.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = [
            ("vehicle_number", &self.vehicle_number),
            ("driver_name", &self.driver_name),
            ("driver_mobile", &self.driver_mobile),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field.to_string())
        .collect();

        if !missing.is_empty() {
            return Err(AllocationError::IncompleteDetails { missing });
        }

        if self.estimated_arrival < self.estimated_departure {
            return Err(AllocationError::InvalidDetails {
                reason: "estimated arrival is before estimated departure".to_string(),
            });
        }

        Ok(())
    }
}

/// A vehicle slot still waiting for vendor details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftAssignment {
    /// Assignment id
    pub id: AssignmentId,
    /// Owning booking
    pub booking_id: BookingId,
    /// Vendor responsible for the slot
    pub vendor_id: UserId,
    /// Creation time, used to pick the oldest drafts first
    pub created_at: DateTime<Utc>,
    /// Whatever the vendor has saved so far
    #[serde(default)]
    pub details: DraftDetails,
}

impl DraftAssignment {
    /// A fresh, empty draft.
    #[must_use]
    pub fn new(
        id: AssignmentId,
        booking_id: BookingId,
        vendor_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            vendor_id,
            created_at,
            details: DraftDetails::default(),
        }
    }

    /// Lock the draft with complete details.
    ///
    /// # Errors
    ///
    /// Returns the validation error of [`TransportDetails::validate`].
    pub fn submit(
        self,
        details: TransportDetails,
        submitted_by: UserId,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmittedAssignment> {
        details.validate()?;
        Ok(SubmittedAssignment {
            id: self.id,
            booking_id: self.booking_id,
            vendor_id: self.vendor_id,
            created_at: self.created_at,
            details,
            submitted_at,
            submitted_by,
        })
    }
}

/// A vehicle slot with locked vendor details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAssignment {
    /// Assignment id
    pub id: AssignmentId,
    /// Owning booking
    pub booking_id: BookingId,
    /// Vendor responsible for the slot
    pub vendor_id: UserId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Submitted transport details
    pub details: TransportDetails,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
    /// User who submitted
    pub submitted_by: UserId,
}

/// A vehicle assignment in either lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VehicleAssignment {
    /// Waiting for vendor details
    Draft(DraftAssignment),
    /// Locked with vendor details
    Submitted(SubmittedAssignment),
}

impl VehicleAssignment {
    /// Assignment id
    #[must_use]
    pub const fn id(&self) -> AssignmentId {
        match self {
            Self::Draft(d) => d.id,
            Self::Submitted(s) => s.id,
        }
    }

    /// Owning booking
    #[must_use]
    pub const fn booking_id(&self) -> BookingId {
        match self {
            Self::Draft(d) => d.booking_id,
            Self::Submitted(s) => s.booking_id,
        }
    }

    /// Responsible vendor
    #[must_use]
    pub const fn vendor_id(&self) -> UserId {
        match self {
            Self::Draft(d) => d.vendor_id,
            Self::Submitted(s) => s.vendor_id,
        }
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Draft(d) => d.created_at,
            Self::Submitted(s) => s.created_at,
        }
    }

    /// Current lifecycle status
    #[must_use]
    pub const fn status(&self) -> AssignmentStatus {
        match self {
            Self::Draft(_) => AssignmentStatus::Draft,
            Self::Submitted(_) => AssignmentStatus::Submitted,
        }
    }

    /// Whether the assignment is still a draft
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// The draft, if still drafting
    #[must_use]
    pub const fn as_draft(&self) -> Option<&DraftAssignment> {
        match self {
            Self::Draft(d) => Some(d),
            Self::Submitted(_) => None,
        }
    }

    /// The draft, or `AlreadySubmitted`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::AlreadySubmitted`] for submitted records.
    pub fn into_draft(self) -> Result<DraftAssignment> {
        match self {
            Self::Draft(d) => Ok(d),
            Self::Submitted(s) => Err(AllocationError::AlreadySubmitted { assignment_id: s.id }),
        }
    }
}

impl From<DraftAssignment> for VehicleAssignment {
    fn from(draft: DraftAssignment) -> Self {
        Self::Draft(draft)
    }
}

impl From<SubmittedAssignment> for VehicleAssignment {
    fn from(submitted: SubmittedAssignment) -> Self {
        Self::Submitted(submitted)
    }
}
