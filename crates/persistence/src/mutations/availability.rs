// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Slot and outing mutations.
//!
//! Removal runs the booking hooks before the availability row is deleted,
//! inside the same transaction, and hands the removed bookings back to the
//! caller.

use autocita_domain::{
    Booking, DomainError, Outing, Role, Session, Slot, ensure_role, validate_quota,
};
use diesel::prelude::*;
use diesel::SqliteConnection;
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::data_models::UserData;
use crate::diesel_schema::{outings, slots};
use crate::encoding::{format_date, format_timestamp, now_timestamp};
use crate::error::PersistenceError;
use crate::mutations::bookings::{on_outing_removed, on_slot_removed};
use crate::queries::availability::{get_outing, get_slot};
use crate::queries::catalog::get_zone_by_id;
use crate::queries::users::get_user_by_id;

fn require_instructor(
    conn: &mut SqliteConnection,
    instructor_id: i64,
) -> Result<(), PersistenceError> {
    let user: UserData = get_user_by_id(conn, instructor_id)?
        .ok_or(DomainError::UserNotFound(instructor_id))?;
    ensure_role(instructor_id, user.role, Role::Instructor)?;
    Ok(())
}

/// Creates a lesson slot for an instructor.
///
/// # Errors
///
/// Returns `UserNotFound` if the instructor does not exist, `RoleMismatch`
/// if the user is not an instructor, `DuplicateSlot` if the instructor
/// already has a slot at `start_at`, or a database error.
pub fn create_slot(
    conn: &mut SqliteConnection,
    instructor_id: i64,
    start_at: OffsetDateTime,
) -> Result<Slot, PersistenceError> {
    require_instructor(conn, instructor_id)?;

    let start_text: String = format_timestamp(start_at)?;

    diesel::insert_into(slots::table)
        .values((
            slots::instructor_id.eq(instructor_id),
            slots::start_at.eq(&start_text),
            slots::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(|e| match PersistenceError::from(e) {
            PersistenceError::UniqueViolation(_) => {
                PersistenceError::DomainViolation(DomainError::DuplicateSlot {
                    instructor_id,
                    start_at: start_text.clone(),
                })
            }
            other => other,
        })?;

    let slot_id: i64 = conn.get_last_insert_rowid()?;
    info!(slot_id, instructor_id, start_at = %start_text, "Slot created");

    Ok(Slot {
        slot_id,
        instructor_id,
        start_at,
        is_booked: false,
    })
}

/// Creates an outing for an instructor.
///
/// # Errors
///
/// Returns `InvalidQuota` for a quota below one, `UserNotFound` or
/// `ZoneNotFound` for unknown references, `RoleMismatch` for a
/// non-instructor owner, `DuplicateOuting` if the
/// instructor already has an outing for the date and session, or a database
/// error.
pub fn create_outing(
    conn: &mut SqliteConnection,
    instructor_id: i64,
    zone_id: i64,
    date: Date,
    session: Session,
    quota: i64,
) -> Result<Outing, PersistenceError> {
    let quota: u32 = validate_quota(quota)?;

    require_instructor(conn, instructor_id)?;
    if get_zone_by_id(conn, zone_id)?.is_none() {
        return Err(DomainError::ZoneNotFound(zone_id.to_string()).into());
    }

    diesel::insert_into(outings::table)
        .values((
            outings::instructor_id.eq(instructor_id),
            outings::zone_id.eq(zone_id),
            outings::outing_date.eq(format_date(date)?),
            outings::session.eq(session.as_str()),
            outings::quota.eq(i64::from(quota)),
            outings::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(|e| match PersistenceError::from(e) {
            PersistenceError::UniqueViolation(_) => {
                PersistenceError::DomainViolation(DomainError::DuplicateOuting {
                    instructor_id,
                    date,
                    session,
                })
            }
            other => other,
        })?;

    let outing_id: i64 = conn.get_last_insert_rowid()?;
    info!(outing_id, instructor_id, zone_id, %date, %session, quota, "Outing created");

    Ok(Outing {
        outing_id,
        instructor_id,
        zone_id,
        date,
        session,
        quota,
        active_bookings: 0,
    })
}

/// Removes a slot and its booking.
///
/// # Returns
///
/// The removed slot and the bookings that were deleted with it.
///
/// # Errors
///
/// Returns `SlotNotFound` if the slot does not exist, or a database error.
pub fn remove_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<(Slot, Vec<Booking>), PersistenceError> {
    conn.immediate_transaction(|conn| {
        let slot: Slot = get_slot(conn, slot_id)?.ok_or(DomainError::SlotNotFound(slot_id))?;

        let removed: Vec<Booking> = on_slot_removed(conn, slot_id)?;

        diesel::delete(slots::table)
            .filter(slots::slot_id.eq(slot_id))
            .execute(conn)?;

        info!(slot_id, removed_bookings = removed.len(), "Slot removed");
        Ok((slot, removed))
    })
}

/// Removes an outing and all of its bookings.
///
/// # Returns
///
/// The removed outing and the bookings that were deleted with it.
///
/// # Errors
///
/// Returns `OutingNotFound` if the outing does not exist, or a database
/// error.
pub fn remove_outing(
    conn: &mut SqliteConnection,
    outing_id: i64,
) -> Result<(Outing, Vec<Booking>), PersistenceError> {
    conn.immediate_transaction(|conn| {
        let outing: Outing =
            get_outing(conn, outing_id)?.ok_or(DomainError::OutingNotFound(outing_id))?;

        let removed: Vec<Booking> = on_outing_removed(conn, outing_id)?;

        diesel::delete(outings::table)
            .filter(outings::outing_id.eq(outing_id))
            .execute(conn)?;

        info!(outing_id, removed_bookings = removed.len(), "Outing removed");
        Ok((outing, removed))
    })
}
