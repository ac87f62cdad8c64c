// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Slot and outing queries.
//!
//! Slot availability and outing seat counts are derived from the bookings
//! table on every read; nothing is cached on the availability rows.

use std::collections::{HashMap, HashSet};

use autocita_domain::{BookingState, Outing, Session, Slot};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::SqliteConnection;
use time::Date;

use crate::diesel_schema::{bookings, outings, slots};
use crate::encoding::{format_date, parse_date, parse_stored, parse_timestamp, to_count};
use crate::error::PersistenceError;

/// Booking states that occupy an outing seat, as stored.
const ACTIVE_STATES: [&str; 2] = [
    BookingState::Pending.as_str(),
    BookingState::Confirmed.as_str(),
];

#[derive(Queryable, Selectable)]
#[diesel(table_name = slots)]
struct SlotRow {
    slot_id: i64,
    instructor_id: i64,
    start_at: String,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = outings)]
struct OutingRow {
    outing_id: i64,
    instructor_id: i64,
    zone_id: i64,
    outing_date: String,
    session: String,
    quota: i64,
}

/// Filters for slot listings. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub instructor_id: Option<i64>,
    /// Only slots with no booking.
    pub unbooked_only: bool,
}

/// Filters for outing listings. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutingFilter {
    /// Earliest outing date, inclusive.
    pub from_date: Option<Date>,
    pub instructor_id: Option<i64>,
    pub zone_id: Option<i64>,
}

fn slot_from_row(row: SlotRow, is_booked: bool) -> Result<Slot, PersistenceError> {
    Ok(Slot {
        slot_id: row.slot_id,
        instructor_id: row.instructor_id,
        start_at: parse_timestamp(&row.start_at)?,
        is_booked,
    })
}

fn outing_from_row(row: OutingRow, active_bookings: u32) -> Result<Outing, PersistenceError> {
    Ok(Outing {
        outing_id: row.outing_id,
        instructor_id: row.instructor_id,
        zone_id: row.zone_id,
        date: parse_date(&row.outing_date)?,
        session: parse_stored::<Session>(&row.session)?,
        quota: to_count(row.quota, "quota")?,
        active_bookings,
    })
}

/// Returns true if a booking references the slot.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn slot_has_booking(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<bool, PersistenceError> {
    let count: i64 = bookings::table
        .filter(bookings::slot_id.eq(slot_id))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Counts the `Pending` and `Confirmed` bookings on an outing.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_active_outing_bookings(
    conn: &mut SqliteConnection,
    outing_id: i64,
) -> Result<u32, PersistenceError> {
    let count: i64 = bookings::table
        .filter(bookings::outing_id.eq(outing_id))
        .filter(bookings::state.eq_any(ACTIVE_STATES))
        .count()
        .get_result(conn)?;
    to_count(count, "active booking count")
}

/// Retrieves a slot by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_slot(
    conn: &mut SqliteConnection,
    slot_id: i64,
) -> Result<Option<Slot>, PersistenceError> {
    let row: Option<SlotRow> = slots::table
        .filter(slots::slot_id.eq(slot_id))
        .select(SlotRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => {
            let is_booked: bool = slot_has_booking(conn, row.slot_id)?;
            slot_from_row(row, is_booked).map(Some)
        }
        None => Ok(None),
    }
}

/// Lists slots ordered by start time.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_slots(
    conn: &mut SqliteConnection,
    filter: SlotFilter,
) -> Result<Vec<Slot>, PersistenceError> {
    let mut query = slots::table
        .select(SlotRow::as_select())
        .order((slots::start_at.asc(), slots::slot_id.asc()))
        .into_boxed();

    if let Some(instructor_id) = filter.instructor_id {
        query = query.filter(slots::instructor_id.eq(instructor_id));
    }

    let rows: Vec<SlotRow> = query.load(conn)?;

    let booked: HashSet<i64> = bookings::table
        .filter(bookings::slot_id.is_not_null())
        .select(bookings::slot_id)
        .load::<Option<i64>>(conn)?
        .into_iter()
        .flatten()
        .collect();

    rows.into_iter()
        .filter(|row| !filter.unbooked_only || !booked.contains(&row.slot_id))
        .map(|row| {
            let is_booked: bool = booked.contains(&row.slot_id);
            slot_from_row(row, is_booked)
        })
        .collect()
}

/// Retrieves an outing by ID with its active booking count.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_outing(
    conn: &mut SqliteConnection,
    outing_id: i64,
) -> Result<Option<Outing>, PersistenceError> {
    let row: Option<OutingRow> = outings::table
        .filter(outings::outing_id.eq(outing_id))
        .select(OutingRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => {
            let active: u32 = count_active_outing_bookings(conn, row.outing_id)?;
            outing_from_row(row, active).map(Some)
        }
        None => Ok(None),
    }
}

/// Lists outings ordered by date, then session.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_outings(
    conn: &mut SqliteConnection,
    filter: OutingFilter,
) -> Result<Vec<Outing>, PersistenceError> {
    let mut query = outings::table
        .select(OutingRow::as_select())
        .order((outings::outing_date.asc(), outings::outing_id.asc()))
        .into_boxed();

    if let Some(from_date) = filter.from_date {
        query = query.filter(outings::outing_date.ge(format_date(from_date)?));
    }
    if let Some(instructor_id) = filter.instructor_id {
        query = query.filter(outings::instructor_id.eq(instructor_id));
    }
    if let Some(zone_id) = filter.zone_id {
        query = query.filter(outings::zone_id.eq(zone_id));
    }

    let rows: Vec<OutingRow> = query.load(conn)?;

    let counts: HashMap<i64, i64> = bookings::table
        .filter(bookings::outing_id.is_not_null())
        .filter(bookings::state.eq_any(ACTIVE_STATES))
        .group_by(bookings::outing_id)
        .select((bookings::outing_id, count_star()))
        .load::<(Option<i64>, i64)>(conn)?
        .into_iter()
        .filter_map(|(outing_id, count)| outing_id.map(|id| (id, count)))
        .collect();

    rows.into_iter()
        .map(|row| {
            let active: u32 = to_count(
                counts.get(&row.outing_id).copied().unwrap_or_default(),
                "active booking count",
            )?;
            outing_from_row(row, active)
        })
        .collect()
}
