// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking queries.
//!
//! A booking row stores its target but not the target's owner. Reads resolve
//! the owning instructor from the slot or outing so callers can apply
//! ownership rules without a second lookup.

use std::collections::HashMap;

use autocita_domain::{Booking, BookingState, BookingTarget};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::diesel_schema::{bookings, outings, slots};
use crate::encoding::{parse_stored, parse_timestamp};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = bookings)]
struct BookingRow {
    booking_id: i64,
    student_id: i64,
    slot_id: Option<i64>,
    outing_id: Option<i64>,
    state: String,
    created_at: String,
    updated_at: String,
}

impl BookingRow {
    fn target(&self) -> Result<BookingTarget, PersistenceError> {
        match (self.slot_id, self.outing_id) {
            (Some(slot_id), None) => Ok(BookingTarget::Slot(slot_id)),
            (None, Some(outing_id)) => Ok(BookingTarget::Outing(outing_id)),
            _ => Err(PersistenceError::DatabaseError(format!(
                "Booking {} must reference exactly one slot or outing",
                self.booking_id
            ))),
        }
    }
}

/// Filters for booking listings. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub student_id: Option<i64>,
    /// Only bookings whose target belongs to this instructor.
    pub instructor_id: Option<i64>,
}

/// Owners of every slot and outing referenced by `rows`.
struct TargetOwners {
    slots: HashMap<i64, i64>,
    outings: HashMap<i64, i64>,
}

impl TargetOwners {
    fn load(conn: &mut SqliteConnection, rows: &[BookingRow]) -> Result<Self, PersistenceError> {
        let slot_ids: Vec<i64> = rows.iter().filter_map(|row| row.slot_id).collect();
        let outing_ids: Vec<i64> = rows.iter().filter_map(|row| row.outing_id).collect();

        let slot_owners: HashMap<i64, i64> = if slot_ids.is_empty() {
            HashMap::new()
        } else {
            slots::table
                .filter(slots::slot_id.eq_any(&slot_ids))
                .select((slots::slot_id, slots::instructor_id))
                .load::<(i64, i64)>(conn)?
                .into_iter()
                .collect()
        };

        let outing_owners: HashMap<i64, i64> = if outing_ids.is_empty() {
            HashMap::new()
        } else {
            outings::table
                .filter(outings::outing_id.eq_any(&outing_ids))
                .select((outings::outing_id, outings::instructor_id))
                .load::<(i64, i64)>(conn)?
                .into_iter()
                .collect()
        };

        Ok(Self {
            slots: slot_owners,
            outings: outing_owners,
        })
    }

    fn owner_of(&self, target: BookingTarget) -> Result<i64, PersistenceError> {
        let owner: Option<&i64> = match target {
            BookingTarget::Slot(id) => self.slots.get(&id),
            BookingTarget::Outing(id) => self.outings.get(&id),
        };
        owner.copied().ok_or_else(|| {
            PersistenceError::DatabaseError(format!(
                "{} {} referenced by a booking does not exist",
                target.kind().as_str(),
                target.id()
            ))
        })
    }
}

fn booking_from_row(row: BookingRow, owners: &TargetOwners) -> Result<Booking, PersistenceError> {
    let target: BookingTarget = row.target()?;
    Ok(Booking {
        booking_id: row.booking_id,
        student_id: row.student_id,
        target,
        instructor_id: owners.owner_of(target)?,
        state: parse_stored::<BookingState>(&row.state)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn load_bookings(
    conn: &mut SqliteConnection,
    rows: Vec<BookingRow>,
) -> Result<Vec<Booking>, PersistenceError> {
    let owners: TargetOwners = TargetOwners::load(conn, &rows)?;
    rows.into_iter()
        .map(|row| booking_from_row(row, &owners))
        .collect()
}

/// Retrieves a booking by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_booking(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Option<Booking>, PersistenceError> {
    let row: Option<BookingRow> = bookings::table
        .filter(bookings::booking_id.eq(booking_id))
        .select(BookingRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => Ok(load_bookings(conn, vec![row])?.into_iter().next()),
        None => Ok(None),
    }
}

/// Lists bookings ordered by creation.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_bookings(
    conn: &mut SqliteConnection,
    filter: BookingFilter,
) -> Result<Vec<Booking>, PersistenceError> {
    let mut query = bookings::table
        .select(BookingRow::as_select())
        .order(bookings::booking_id.asc())
        .into_boxed();

    if let Some(student_id) = filter.student_id {
        query = query.filter(bookings::student_id.eq(student_id));
    }

    if let Some(instructor_id) = filter.instructor_id {
        let owned_slots = slots::table
            .filter(slots::instructor_id.eq(instructor_id))
            .select(slots::slot_id.nullable());
        let owned_outings = outings::table
            .filter(outings::instructor_id.eq(instructor_id))
            .select(outings::outing_id.nullable());
        query = query.filter(
            bookings::slot_id
                .eq_any(owned_slots)
                .or(bookings::outing_id.eq_any(owned_outings)),
        );
    }

    let rows: Vec<BookingRow> = query.load(conn)?;
    load_bookings(conn, rows)
}

/// Lists the bookings held on a slot (at most one).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_slot_bookings(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let rows: Vec<BookingRow> = bookings::table
        .filter(bookings::slot_id.eq(slot_id))
        .select(BookingRow::as_select())
        .load(conn)?;
    load_bookings(conn, rows)
}

/// Lists every booking on an outing, in any state.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_outing_bookings(
    conn: &mut SqliteConnection,
    outing_id: i64,
) -> Result<Vec<Booking>, PersistenceError> {
    let rows: Vec<BookingRow> = bookings::table
        .filter(bookings::outing_id.eq(outing_id))
        .order(bookings::booking_id.asc())
        .select(BookingRow::as_select())
        .load(conn)?;
    load_bookings(conn, rows)
}

/// Finds the ID of a student's booking on an outing, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_outing_booking(
    conn: &mut SqliteConnection,
    student_id: i64,
    outing_id: i64,
) -> Result<Option<i64>, PersistenceError> {
    Ok(bookings::table
        .filter(bookings::student_id.eq(student_id))
        .filter(bookings::outing_id.eq(outing_id))
        .select(bookings::booking_id)
        .first(conn)
        .optional()?)
}
