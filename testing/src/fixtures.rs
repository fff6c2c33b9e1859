//! Ready-made actors, bookings and assignments.

use chrono::{DateTime, Duration, Utc};
use fleet_allocation_core::{
    Actor, Allocation, AssignmentId, BookingId, DraftAssignment, DraftDetails, NewBooking, Role,
    SubmittedAssignment, TransportDetails, UserId,
};

/// Active admin with the wildcard permission.
#[must_use]
pub fn admin() -> Actor {
    Actor::new(UserId::new(), Role::Admin)
}

/// Active employee with the default employee permissions.
#[must_use]
pub fn employee() -> Actor {
    Actor::new(UserId::new(), Role::Employee)
}

/// Active vendor with the default vendor permissions.
#[must_use]
pub fn vendor() -> Actor {
    Actor::new(UserId::new(), Role::Vendor)
}

/// Complete details departing at `departure`, arriving six hours later.
#[must_use]
pub fn transport_details(departure: DateTime<Utc>) -> TransportDetails {
    TransportDetails {
        vehicle_number: "MH12AB1234".to_string(),
        driver_name: "Ravi Patil".to_string(),
        driver_mobile: "9876543210".to_string(),
        container_number: Some("MSCU1234567".to_string()),
        seal_number: None,
        estimated_departure: departure,
        estimated_arrival: departure + Duration::hours(6),
    }
}

/// Partial details with only the vehicle number filled in.
#[must_use]
pub fn partial_details() -> DraftDetails {
    DraftDetails {
        vehicle_number: Some("MH12AB1234".to_string()),
        ..DraftDetails::default()
    }
}

/// Empty draft with a random id.
#[must_use]
pub fn draft(booking_id: BookingId, vendor_id: UserId, created_at: DateTime<Utc>) -> DraftAssignment {
    DraftAssignment::new(AssignmentId::new(), booking_id, vendor_id, created_at)
}

/// Submitted assignment created and submitted at `at`.
#[must_use]
pub fn submitted(booking_id: BookingId, vendor_id: UserId, at: DateTime<Utc>) -> SubmittedAssignment {
    SubmittedAssignment {
        id: AssignmentId::new(),
        booking_id,
        vendor_id,
        created_at: at,
        details: transport_details(at),
        submitted_at: at,
        submitted_by: vendor_id,
    }
}

/// Booking request with `vehicle_quantity` vehicles and the given allocations.
#[must_use]
pub fn new_booking(vehicle_quantity: u32, allocations: Vec<Allocation>) -> NewBooking {
    NewBooking {
        booking_no: "BKG-0001".to_string(),
        vehicle_quantity,
        allocations,
    }
}
