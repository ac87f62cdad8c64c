// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Zone, permit and phase catalog queries.

use autocita_domain::{Permit, PermitPhase, Phase, Zone};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::diesel_schema::{permit_phases, permits, phases, zones};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = permits)]
struct PermitRow {
    permit_id: i64,
    code: String,
    description: String,
}

impl From<PermitRow> for Permit {
    fn from(row: PermitRow) -> Self {
        Self {
            permit_id: row.permit_id,
            code: row.code,
            description: row.description,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = phases)]
struct PhaseRow {
    phase_id: i64,
    name: String,
    display_order: i32,
}

impl From<PhaseRow> for Phase {
    fn from(row: PhaseRow) -> Self {
        Self {
            phase_id: row.phase_id,
            name: row.name,
            display_order: row.display_order,
        }
    }
}

/// Lists all zones ordered by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_zones(conn: &mut SqliteConnection) -> Result<Vec<Zone>, PersistenceError> {
    let rows: Vec<(i64, String)> = zones::table
        .order(zones::name.asc())
        .select((zones::zone_id, zones::name))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(zone_id, name)| Zone::with_id(zone_id, name))
        .collect())
}

/// Retrieves a zone by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_zone_by_id(
    conn: &mut SqliteConnection,
    zone_id: i64,
) -> Result<Option<Zone>, PersistenceError> {
    let row: Option<(i64, String)> = zones::table
        .filter(zones::zone_id.eq(zone_id))
        .select((zones::zone_id, zones::name))
        .first(conn)
        .optional()?;

    Ok(row.map(|(zone_id, name)| Zone::with_id(zone_id, name)))
}

/// Finds a zone by name, ignoring case and surrounding whitespace.
///
/// The `name` column is declared `COLLATE NOCASE`, so equality is
/// case-insensitive in the database.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_zone_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Zone>, PersistenceError> {
    let row: Option<(i64, String)> = zones::table
        .filter(zones::name.eq(name.trim()))
        .select((zones::zone_id, zones::name))
        .first(conn)
        .optional()?;

    Ok(row.map(|(zone_id, name)| Zone::with_id(zone_id, name)))
}

/// Lists all permits ordered by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_permits(conn: &mut SqliteConnection) -> Result<Vec<Permit>, PersistenceError> {
    let rows: Vec<PermitRow> = permits::table
        .order(permits::permit_id.asc())
        .select(PermitRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(Permit::from).collect())
}

/// Retrieves a permit by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_permit_by_id(
    conn: &mut SqliteConnection,
    permit_id: i64,
) -> Result<Option<Permit>, PersistenceError> {
    let row: Option<PermitRow> = permits::table
        .filter(permits::permit_id.eq(permit_id))
        .select(PermitRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Permit::from))
}

/// Retrieves a permit by its code.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_permit_by_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> Result<Option<Permit>, PersistenceError> {
    let row: Option<PermitRow> = permits::table
        .filter(permits::code.eq(code))
        .select(PermitRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Permit::from))
}

/// Retrieves a phase by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_phase_by_id(
    conn: &mut SqliteConnection,
    phase_id: i64,
) -> Result<Option<Phase>, PersistenceError> {
    let row: Option<PhaseRow> = phases::table
        .filter(phases::phase_id.eq(phase_id))
        .select(PhaseRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Phase::from))
}

/// Lists all phases by display order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_phases(conn: &mut SqliteConnection) -> Result<Vec<Phase>, PersistenceError> {
    let rows: Vec<PhaseRow> = phases::table
        .order((phases::display_order.asc(), phases::phase_id.asc()))
        .select(PhaseRow::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(Phase::from).collect())
}

/// Lists a permit's phase memberships in sequence order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_permit_phases(
    conn: &mut SqliteConnection,
    permit_id: i64,
) -> Result<Vec<PermitPhase>, PersistenceError> {
    let rows: Vec<(i64, i64, i32)> = permit_phases::table
        .filter(permit_phases::permit_id.eq(permit_id))
        .order((permit_phases::order_index.asc(), permit_phases::phase_id.asc()))
        .select((
            permit_phases::permit_id,
            permit_phases::phase_id,
            permit_phases::order_index,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(permit_id, phase_id, order_index)| PermitPhase {
            permit_id,
            phase_id,
            order_index,
        })
        .collect())
}
