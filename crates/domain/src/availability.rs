// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Instructor availability: single slots and capacity outings.
//!
//! Both kinds are booked through the same `Booking` type. Each kind declares
//! whether a new booking needs instructor confirmation, which determines the
//! booking's initial state.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::booking::BookingState;
use crate::error::DomainError;
use crate::types::Session;

/// Default seat quota for a new outing.
pub const DEFAULT_OUTING_QUOTA: u32 = 3;

/// The kind of availability a booking targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityKind {
    /// A single lesson at one timestamp; holds at most one booking.
    Slot,
    /// A practical-exam outing with a seat quota.
    Outing,
}

impl AvailabilityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Slot => "slot",
            Self::Outing => "outing",
        }
    }

    /// Returns true if bookings on this kind start out `Pending` and must be
    /// confirmed or rejected by staff.
    #[must_use]
    pub const fn requires_confirmation(&self) -> bool {
        match self {
            Self::Slot => false,
            Self::Outing => true,
        }
    }

    /// Returns the state a freshly created booking on this kind starts in.
    #[must_use]
    pub const fn initial_booking_state(&self) -> BookingState {
        if self.requires_confirmation() {
            BookingState::Pending
        } else {
            BookingState::Confirmed
        }
    }
}

/// A single lesson slot published by an instructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub slot_id: i64,
    /// The owning instructor's user ID.
    pub instructor_id: i64,
    /// Lesson start, UTC.
    pub start_at: OffsetDateTime,
    /// True while a booking references this slot.
    pub is_booked: bool,
}

impl Slot {
    /// A slot is available iff no booking references it.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.is_booked
    }
}

/// A practical-exam outing with a fixed number of seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outing {
    pub outing_id: i64,
    /// The owning instructor's user ID.
    pub instructor_id: i64,
    pub zone_id: i64,
    pub date: Date,
    pub session: Session,
    /// Maximum number of active bookings.
    pub quota: u32,
    /// Number of bookings currently `Pending` or `Confirmed`.
    pub active_bookings: u32,
}

impl Outing {
    /// Returns the number of seats still open on this outing.
    #[must_use]
    pub const fn remaining_seats(&self) -> u32 {
        remaining_seats(self.quota, self.active_bookings)
    }

    /// Returns true if the outing takes place on or after `today`.
    #[must_use]
    pub fn is_upcoming(&self, today: Date) -> bool {
        self.date >= today
    }
}

/// Computes `max(quota - active, 0)`.
#[must_use]
pub const fn remaining_seats(quota: u32, active: u32) -> u32 {
    quota.saturating_sub(active)
}

/// Validates an outing quota and narrows it to the stored width.
///
/// # Errors
///
/// Returns `DomainError::InvalidQuota` if the quota is below 1 or does not
/// fit in a `u32`.
pub fn validate_quota(quota: i64) -> Result<u32, DomainError> {
    if quota < 1 {
        return Err(DomainError::InvalidQuota { quota });
    }
    u32::try_from(quota).map_err(|_| DomainError::InvalidQuota { quota })
}

/// Ensures a seat is open on the outing.
///
/// # Errors
///
/// Returns `DomainError::NoSeats` when active bookings have reached the quota.
pub const fn ensure_seat_available(
    outing_id: i64,
    quota: u32,
    active: u32,
) -> Result<(), DomainError> {
    if remaining_seats(quota, active) == 0 {
        return Err(DomainError::NoSeats { outing_id, quota });
    }
    Ok(())
}
