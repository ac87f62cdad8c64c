// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Access-control policy.
//!
//! Pure functions over the acting identity: listing scopes per role and the
//! permission check for booking mutations. Nothing here touches storage.
//!
//! Role checks read the explicit role attribute only. A user is never
//! treated as an instructor or student because a profile row happens to
//! exist.

use autocita_domain::{Booking, BookingOperation, Outing, Role, Slot};

use crate::auth::AuthenticatedActor;
use crate::error::AuthError;

#[must_use]
pub const fn is_admin(actor: &AuthenticatedActor) -> bool {
    matches!(actor.role, Role::Admin)
}

#[must_use]
pub const fn is_instructor(actor: &AuthenticatedActor) -> bool {
    matches!(actor.role, Role::Instructor)
}

#[must_use]
pub const fn is_student(actor: &AuthenticatedActor) -> bool {
    matches!(actor.role, Role::Student)
}

/// Slots visible to the caller: admins see all, instructors their own, and
/// students only slots nobody has booked.
#[must_use]
pub fn scope_slots(actor: &AuthenticatedActor, slots: Vec<Slot>) -> Vec<Slot> {
    match actor.role {
        Role::Admin => slots,
        Role::Instructor => slots
            .into_iter()
            .filter(|slot| slot.instructor_id == actor.user_id)
            .collect(),
        Role::Student => slots.into_iter().filter(Slot::is_available).collect(),
    }
}

/// Outings visible to the caller.
///
/// Students see outings in the zone of their most recently registered
/// request, and nothing when they have no request. Date filtering happens
/// before scoping and applies to every role.
///
/// # Arguments
///
/// * `actor` - The caller
/// * `outings` - Candidate outings
/// * `latest_request_zone` - Zone of the caller's newest request, if any
#[must_use]
pub fn scope_outings(
    actor: &AuthenticatedActor,
    outings: Vec<Outing>,
    latest_request_zone: Option<i64>,
) -> Vec<Outing> {
    match actor.role {
        Role::Admin => outings,
        Role::Instructor => outings
            .into_iter()
            .filter(|outing| outing.instructor_id == actor.user_id)
            .collect(),
        Role::Student => latest_request_zone.map_or_else(Vec::new, |zone_id| {
            outings
                .into_iter()
                .filter(|outing| outing.zone_id == zone_id)
                .collect()
        }),
    }
}

/// Bookings visible to the caller: admins see all, instructors bookings on
/// their own slots and outings, students their own bookings.
#[must_use]
pub fn scope_bookings(actor: &AuthenticatedActor, bookings: Vec<Booking>) -> Vec<Booking> {
    match actor.role {
        Role::Admin => bookings,
        Role::Instructor => bookings
            .into_iter()
            .filter(|booking| owns_target(actor, booking, BookingOperation::Confirm))
            .collect(),
        Role::Student => bookings
            .into_iter()
            .filter(|booking| booking.student_id == actor.user_id)
            .collect(),
    }
}

/// A named permission predicate for booking mutations.
struct BookingRule {
    name: &'static str,
    grants: fn(&AuthenticatedActor, &Booking, BookingOperation) -> bool,
}

/// Evaluated in order; the first predicate that grants wins.
const BOOKING_RULES: &[BookingRule] = &[
    BookingRule {
        name: "is_admin",
        grants: admin_rule,
    },
    BookingRule {
        name: "owns_target",
        grants: owns_target,
    },
    BookingRule {
        name: "is_booking_student",
        grants: is_booking_student,
    },
];

fn admin_rule(actor: &AuthenticatedActor, _booking: &Booking, _op: BookingOperation) -> bool {
    is_admin(actor)
}

fn owns_target(actor: &AuthenticatedActor, booking: &Booking, _op: BookingOperation) -> bool {
    is_instructor(actor) && booking.instructor_id == actor.user_id
}

fn is_booking_student(actor: &AuthenticatedActor, booking: &Booking, op: BookingOperation) -> bool {
    matches!(op, BookingOperation::Cancel) && booking.student_id == actor.user_id
}

/// Returns the name of the first rule that lets `actor` apply `op` to
/// `booking`, or `None` if no rule does.
#[must_use]
pub fn granting_booking_rule(
    actor: &AuthenticatedActor,
    booking: &Booking,
    op: BookingOperation,
) -> Option<&'static str> {
    BOOKING_RULES
        .iter()
        .find(|rule| (rule.grants)(actor, booking, op))
        .map(|rule| rule.name)
}

/// Whether `actor` may confirm, reject or cancel `booking`.
///
/// Confirm and reject belong to admins and the instructor owning the
/// booked slot or outing. Cancel additionally belongs to the booking's
/// student.
#[must_use]
pub fn can_mutate_booking(
    actor: &AuthenticatedActor,
    booking: &Booking,
    op: BookingOperation,
) -> bool {
    granting_booking_rule(actor, booking, op).is_some()
}

/// Checks [`can_mutate_booking`] and reports a refusal as an error.
///
/// # Errors
///
/// Returns `Unauthorized` if no rule grants the operation.
pub fn authorize_booking_operation(
    actor: &AuthenticatedActor,
    booking: &Booking,
    op: BookingOperation,
) -> Result<&'static str, AuthError> {
    granting_booking_rule(actor, booking, op).ok_or_else(|| AuthError::Unauthorized {
        action: String::from(op.as_str()),
        required_role: match op {
            BookingOperation::Cancel => {
                String::from("admin, the owning instructor, or the booking's student")
            }
            BookingOperation::Confirm | BookingOperation::Reject => {
                String::from("admin or the owning instructor")
            }
        },
    })
}
