// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod availability;
mod booking;
mod error;
mod phase;
mod request;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use availability::{
    AvailabilityKind, DEFAULT_OUTING_QUOTA, Outing, Slot, ensure_seat_available, remaining_seats,
    validate_quota,
};
pub use booking::{
    Booking, BookingOperation, BookingState, BookingTarget, ensure_not_self_booking,
};
pub use error::DomainError;
pub use phase::{Permit, PermitPhase, Phase, PhaseSequence};
pub use request::{ExamAttempt, Request, RequestState};
pub use types::{InstructorProfile, Role, Session, StudentProfile, User, Zone, ensure_role};
pub use validation::{
    normalize_zone_name, validate_login_name, validate_password, validate_permit_code,
    validate_person_name, validate_phase_name, validate_zone_name,
};
