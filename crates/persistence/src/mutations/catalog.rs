// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Zone, permit and phase catalog mutations.

use autocita_domain::{
    DomainError, Permit, PermitPhase, Phase, Zone, normalize_zone_name, validate_permit_code,
    validate_phase_name, validate_zone_name,
};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{permit_phases, permits, phases, zones};
use crate::error::PersistenceError;
use crate::queries::catalog::{find_zone_by_name, get_permit_by_id, get_phase_by_id};

/// Replaces a unique-constraint failure with a domain error.
fn on_unique_violation(
    err: diesel::result::Error,
    domain_error: impl FnOnce() -> DomainError,
) -> PersistenceError {
    match PersistenceError::from(err) {
        PersistenceError::UniqueViolation(_) => PersistenceError::DomainViolation(domain_error()),
        other => other,
    }
}

/// Creates a zone. The name is normalized before it is stored.
///
/// # Errors
///
/// Returns `InvalidZoneName` for a blank name, `DuplicateZone` if a zone
/// with the same name exists in any letter case, or a database error.
pub fn create_zone(conn: &mut SqliteConnection, name: &str) -> Result<Zone, PersistenceError> {
    validate_zone_name(name)?;
    let normalized: String = normalize_zone_name(name);

    diesel::insert_into(zones::table)
        .values(zones::name.eq(&normalized))
        .execute(conn)
        .map_err(|e| on_unique_violation(e, || DomainError::DuplicateZone(normalized.clone())))?;

    let zone_id: i64 = conn.get_last_insert_rowid()?;
    info!(zone_id, name = %normalized, "Zone created");
    Ok(Zone::with_id(zone_id, normalized))
}

/// Returns the zone with this name, creating it if it does not exist.
///
/// # Returns
///
/// The zone and whether it was created by this call.
///
/// # Errors
///
/// Returns an error if the name is invalid or the database fails.
pub fn get_or_create_zone(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<(Zone, bool), PersistenceError> {
    validate_zone_name(name)?;
    let normalized: String = normalize_zone_name(name);

    if let Some(zone) = find_zone_by_name(conn, &normalized)? {
        return Ok((zone, false));
    }
    create_zone(conn, &normalized).map(|zone| (zone, true))
}

/// Creates a permit.
///
/// # Errors
///
/// Returns `InvalidPermitCode`, `DuplicatePermit`, or a database error.
pub fn create_permit(
    conn: &mut SqliteConnection,
    code: &str,
    description: &str,
) -> Result<Permit, PersistenceError> {
    let code: String = code.trim().to_uppercase();
    validate_permit_code(&code)?;

    diesel::insert_into(permits::table)
        .values((permits::code.eq(&code), permits::description.eq(description)))
        .execute(conn)
        .map_err(|e| on_unique_violation(e, || DomainError::DuplicatePermit(code.clone())))?;

    let permit_id: i64 = conn.get_last_insert_rowid()?;
    info!(permit_id, code = %code, "Permit created");
    Ok(Permit {
        permit_id,
        code,
        description: description.to_string(),
    })
}

/// Creates a phase.
///
/// # Errors
///
/// Returns `InvalidPhaseName`, `DuplicatePhase`, or a database error.
pub fn create_phase(
    conn: &mut SqliteConnection,
    name: &str,
    display_order: i32,
) -> Result<Phase, PersistenceError> {
    validate_phase_name(name)?;
    let name: String = name.trim().to_string();

    diesel::insert_into(phases::table)
        .values((phases::name.eq(&name), phases::display_order.eq(display_order)))
        .execute(conn)
        .map_err(|e| on_unique_violation(e, || DomainError::DuplicatePhase(name.clone())))?;

    let phase_id: i64 = conn.get_last_insert_rowid()?;
    info!(phase_id, name = %name, "Phase created");
    Ok(Phase {
        phase_id,
        name,
        display_order,
    })
}

/// Adds a phase to a permit's sequence at `order_index`.
///
/// # Errors
///
/// Returns `PermitNotFound` or `PhaseNotFound` for unknown IDs, and
/// `DuplicatePermitPhase` if the phase is already in the sequence.
pub fn add_permit_phase(
    conn: &mut SqliteConnection,
    permit_id: i64,
    phase_id: i64,
    order_index: i32,
) -> Result<PermitPhase, PersistenceError> {
    if get_permit_by_id(conn, permit_id)?.is_none() {
        return Err(DomainError::PermitNotFound(permit_id.to_string()).into());
    }
    if get_phase_by_id(conn, phase_id)?.is_none() {
        return Err(DomainError::PhaseNotFound(phase_id).into());
    }

    diesel::insert_into(permit_phases::table)
        .values((
            permit_phases::permit_id.eq(permit_id),
            permit_phases::phase_id.eq(phase_id),
            permit_phases::order_index.eq(order_index),
        ))
        .execute(conn)
        .map_err(|e| {
            on_unique_violation(e, || DomainError::DuplicatePermitPhase {
                permit_id,
                phase_id,
            })
        })?;

    info!(permit_id, phase_id, order_index, "Phase added to permit");
    Ok(PermitPhase {
        permit_id,
        phase_id,
        order_index,
    })
}
