// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking states and transition rules.
//!
//! A booking is a student's claim on a slot or on one seat of an outing.
//! Confirm and reject are only legal from `Pending`. Cancel removes the
//! booking and is legal from every state a stored booking can be in.

use crate::availability::AvailabilityKind;
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Booking lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    /// Awaiting staff confirmation.
    Pending,
    Confirmed,
    Rejected,
    /// Terminal marker for a removed booking. Never stored.
    Cancelled,
}

impl BookingState {
    /// Returns the string representation of the state.
    ///
    /// This is used for persistence and API serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if this booking occupies capacity.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Returns true if a transition from this state to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed | Self::Rejected)
                | (
                    Self::Pending | Self::Confirmed | Self::Rejected,
                    Self::Cancelled
                )
        )
    }

    /// Validates a transition from this state to `target`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the transition is not allowed.
    pub fn validate_transition(&self, target: Self) -> Result<(), DomainError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                entity: "booking",
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl FromStr for BookingState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidBookingState(s.to_string())),
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Staff or student operations that mutate an existing booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingOperation {
    Confirm,
    Reject,
    Cancel,
}

impl BookingOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm_booking",
            Self::Reject => "reject_booking",
            Self::Cancel => "cancel_booking",
        }
    }

    /// Returns the state this operation moves a booking into.
    #[must_use]
    pub const fn target_state(&self) -> BookingState {
        match self {
            Self::Confirm => BookingState::Confirmed,
            Self::Reject => BookingState::Rejected,
            Self::Cancel => BookingState::Cancelled,
        }
    }
}

/// What a booking holds: exactly one slot or one outing seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingTarget {
    Slot(i64),
    Outing(i64),
}

impl BookingTarget {
    #[must_use]
    pub const fn kind(&self) -> AvailabilityKind {
        match self {
            Self::Slot(_) => AvailabilityKind::Slot,
            Self::Outing(_) => AvailabilityKind::Outing,
        }
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Slot(id) | Self::Outing(id) => *id,
        }
    }
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub booking_id: i64,
    /// The booking student's user ID.
    pub student_id: i64,
    pub target: BookingTarget,
    /// User ID of the instructor owning the target.
    pub instructor_id: i64,
    pub state: BookingState,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Rejects a booking whose student is also the owner of the target.
///
/// # Errors
///
/// Returns `DomainError::SelfBooking` if both IDs refer to the same user.
pub const fn ensure_not_self_booking(
    student_id: i64,
    instructor_id: i64,
) -> Result<(), DomainError> {
    if student_id == instructor_id {
        return Err(DomainError::SelfBooking {
            user_id: student_id,
        });
    }
    Ok(())
}
