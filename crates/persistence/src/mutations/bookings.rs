// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reservation engine.
//!
//! Every booking mutation runs in an immediate transaction, so the write
//! lock is held from the first availability read to the commit. The unique
//! indexes on `bookings.slot_id` and `(student_id, outing_id)` remain the
//! final arbiters if a writer ever slips past the application checks.
//!
//! State changes are compare-and-swap updates on the state that was read.

use autocita_domain::{
    AvailabilityKind, Booking, BookingOperation, BookingState, DomainError, Outing, Role, Slot,
    ensure_not_self_booking, ensure_role, ensure_seat_available,
};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::{debug, info, warn};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::bookings;
use crate::encoding::now_timestamp;
use crate::error::PersistenceError;
use crate::queries::availability::{get_outing, get_slot};
use crate::queries::bookings::{
    find_outing_booking, get_booking, list_outing_bookings, list_slot_bookings,
};
use crate::queries::users::get_user_by_id;

fn require_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Booking, PersistenceError> {
    get_booking(conn, booking_id)?.ok_or_else(|| DomainError::BookingNotFound(booking_id).into())
}

fn require_user_role(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Role, PersistenceError> {
    get_user_by_id(conn, user_id)?
        .map(|user| user.role)
        .ok_or_else(|| DomainError::UserNotFound(user_id).into())
}

/// Books a slot for a student.
///
/// Slot bookings need no confirmation, so the new booking is `Confirmed`.
///
/// # Errors
///
/// Returns `SlotNotFound` or `UserNotFound` for unknown IDs, `SelfBooking`
/// if the student owns the slot, `RoleMismatch` if the user is not a
/// student, `AlreadyBooked` if the slot is taken, or a database error.
pub fn book_slot(
    conn: &mut SqliteConnection,
    student_id: i64,
    slot_id: i64,
) -> Result<Booking, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let slot: Slot = get_slot(conn, slot_id)?.ok_or(DomainError::SlotNotFound(slot_id))?;
        let role: Role = require_user_role(conn, student_id)?;

        ensure_not_self_booking(student_id, slot.instructor_id)?;
        ensure_role(student_id, role, Role::Student)?;
        if slot.is_booked {
            return Err(DomainError::AlreadyBooked { slot_id }.into());
        }

        let now: String = now_timestamp()?;
        diesel::insert_into(bookings::table)
            .values((
                bookings::student_id.eq(student_id),
                bookings::slot_id.eq(Some(slot_id)),
                bookings::state.eq(AvailabilityKind::Slot.initial_booking_state().as_str()),
                bookings::created_at.eq(&now),
                bookings::updated_at.eq(&now),
            ))
            .execute(conn)
            .map_err(|e| match PersistenceError::from(e) {
                PersistenceError::UniqueViolation(_) => {
                    PersistenceError::DomainViolation(DomainError::AlreadyBooked { slot_id })
                }
                other => other,
            })?;

        let booking_id: i64 = conn.get_last_insert_rowid()?;
        info!(booking_id, student_id, slot_id, "Slot booked");
        require_booking(conn, booking_id)
    })
}

/// Books a seat on an outing for a student.
///
/// Outing bookings start `Pending`. Checks run in order: self booking,
/// duplicate booking, remaining seats.
///
/// # Errors
///
/// Returns `OutingNotFound` or `UserNotFound` for unknown IDs,
/// `SelfBooking`, `RoleMismatch`, `DuplicateBooking`, `NoSeats`, or a
/// database error.
pub fn book_outing(
    conn: &mut SqliteConnection,
    student_id: i64,
    outing_id: i64,
) -> Result<Booking, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let outing: Outing =
            get_outing(conn, outing_id)?.ok_or(DomainError::OutingNotFound(outing_id))?;
        let role: Role = require_user_role(conn, student_id)?;

        ensure_not_self_booking(student_id, outing.instructor_id)?;
        ensure_role(student_id, role, Role::Student)?;
        if find_outing_booking(conn, student_id, outing_id)?.is_some() {
            return Err(DomainError::DuplicateBooking {
                student_id,
                outing_id,
            }
            .into());
        }
        ensure_seat_available(outing_id, outing.quota, outing.active_bookings)?;

        let now: String = now_timestamp()?;
        diesel::insert_into(bookings::table)
            .values((
                bookings::student_id.eq(student_id),
                bookings::outing_id.eq(Some(outing_id)),
                bookings::state.eq(AvailabilityKind::Outing.initial_booking_state().as_str()),
                bookings::created_at.eq(&now),
                bookings::updated_at.eq(&now),
            ))
            .execute(conn)
            .map_err(|e| match PersistenceError::from(e) {
                PersistenceError::UniqueViolation(_) => {
                    PersistenceError::DomainViolation(DomainError::DuplicateBooking {
                        student_id,
                        outing_id,
                    })
                }
                other => other,
            })?;

        let booking_id: i64 = conn.get_last_insert_rowid()?;
        info!(
            booking_id,
            student_id,
            outing_id,
            remaining = outing.remaining_seats().saturating_sub(1),
            "Outing seat booked"
        );
        require_booking(conn, booking_id)
    })
}

/// Confirms or rejects a pending booking.
///
/// # Errors
///
/// Returns `BookingNotFound` for an unknown ID, or `InvalidTransition` if
/// the booking is not `Pending` or another writer changed it first.
pub fn transition_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
    operation: BookingOperation,
) -> Result<Booking, PersistenceError> {
    if operation == BookingOperation::Cancel {
        return cancel_booking(conn, booking_id);
    }

    let target: BookingState = operation.target_state();

    conn.immediate_transaction(|conn| {
        let booking: Booking = require_booking(conn, booking_id)?;
        booking.state.validate_transition(target)?;

        let rows_affected: usize = diesel::update(bookings::table)
            .filter(bookings::booking_id.eq(booking_id))
            .filter(bookings::state.eq(BookingState::Pending.as_str()))
            .set((
                bookings::state.eq(target.as_str()),
                bookings::updated_at.eq(now_timestamp()?),
            ))
            .execute(conn)?;

        if rows_affected == 0 {
            warn!(booking_id, operation = operation.as_str(), "Booking changed concurrently");
            return Err(DomainError::InvalidTransition {
                entity: "booking",
                from: booking.state.as_str().to_string(),
                to: target.as_str().to_string(),
            }
            .into());
        }

        info!(booking_id, from = %booking.state, to = %target, "Booking transitioned");
        require_booking(conn, booking_id)
    })
}

/// Cancels a booking by deleting it. Legal from every stored state.
///
/// # Returns
///
/// The booking as it was before deletion, with its state set to
/// `Cancelled`.
///
/// # Errors
///
/// Returns `BookingNotFound` for an unknown ID, or a database error.
pub fn cancel_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Booking, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let booking: Booking = require_booking(conn, booking_id)?;
        booking.state.validate_transition(BookingState::Cancelled)?;

        diesel::delete(bookings::table)
            .filter(bookings::booking_id.eq(booking_id))
            .execute(conn)?;

        info!(booking_id, from = %booking.state, "Booking cancelled");
        Ok(Booking {
            state: BookingState::Cancelled,
            ..booking
        })
    })
}

/// Deletes and returns the booking of a slot that is being removed.
///
/// Must be called inside the removal transaction.
pub(crate) fn on_slot_removed(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let removed: Vec<Booking> = list_slot_bookings(conn, slot_id)?;
    diesel::delete(bookings::table)
        .filter(bookings::slot_id.eq(slot_id))
        .execute(conn)?;
    debug!(slot_id, count = removed.len(), "Removed slot bookings");
    Ok(removed)
}

/// Deletes and returns every booking of an outing that is being removed.
///
/// Must be called inside the removal transaction.
pub(crate) fn on_outing_removed(
    conn: &mut SqliteConnection,
    outing_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let removed: Vec<Booking> = list_outing_bookings(conn, outing_id)?;
    diesel::delete(bookings::table)
        .filter(bookings::outing_id.eq(outing_id))
        .execute(conn)?;
    debug!(outing_id, count = removed.len(), "Removed outing bookings");
    Ok(removed)
}
