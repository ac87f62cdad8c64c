// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request lifecycle, phase progression and exam attempt mutations.

use autocita_domain::{DomainError, ExamAttempt, PermitPhase, PhaseSequence, Request, RequestState};
use diesel::prelude::*;
use diesel::SqliteConnection;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::backend::PersistenceBackend;
use crate::data_models::NewRequest;
use crate::diesel_schema::{exam_attempts, requests};
use crate::encoding::{format_date, format_timestamp};
use crate::error::PersistenceError;
use crate::queries::catalog::{get_phase_by_id, list_permit_phases};
use crate::queries::requests::get_request;

/// Inserts a request row in the given state.
pub(crate) fn insert_request(
    conn: &mut SqliteConnection,
    new_request: &NewRequest,
    state: RequestState,
) -> Result<i64, PersistenceError> {
    let theory_exam_date: Option<String> = new_request
        .theory_exam_date
        .map(format_date)
        .transpose()?;
    let registered_at: String = format_timestamp(OffsetDateTime::now_utc())?;

    diesel::insert_into(requests::table)
        .values((
            requests::student_id.eq(new_request.student_id),
            requests::zone_id.eq(new_request.zone_id),
            requests::permit_id.eq(new_request.permit_id),
            requests::preferred_session.eq(new_request.preferred_session.as_str()),
            requests::theory_exam_date.eq(theory_exam_date),
            requests::registered_at.eq(registered_at),
            requests::notes.eq(&new_request.notes),
            requests::state.eq(state.as_str()),
        ))
        .execute(conn)?;

    conn.get_last_insert_rowid()
}

/// Creates a request in the `requested` state.
///
/// # Errors
///
/// Returns an error if the insert fails, including when the student, zone
/// or permit does not exist.
pub fn create_request(
    conn: &mut SqliteConnection,
    new_request: &NewRequest,
) -> Result<i64, PersistenceError> {
    let request_id: i64 = insert_request(conn, new_request, RequestState::Requested)?;
    info!(
        request_id,
        student_id = new_request.student_id,
        "Request created"
    );
    Ok(request_id)
}

/// Moves a request to a new lifecycle state.
///
/// The update only applies if the stored state is still the one the
/// transition was validated against.
///
/// # Errors
///
/// Returns `RequestNotFound` if the request does not exist, or
/// `InvalidTransition` if the lifecycle forbids the change or a concurrent
/// writer moved the request first.
pub fn set_request_state(
    conn: &mut SqliteConnection,
    request_id: i64,
    target: RequestState,
) -> Result<Request, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let request: Request =
            get_request(conn, request_id)?.ok_or(DomainError::RequestNotFound(request_id))?;

        request.state.validate_transition(target)?;

        let rows_affected: usize = diesel::update(requests::table)
            .filter(requests::request_id.eq(request_id))
            .filter(requests::state.eq(request.state.as_str()))
            .set(requests::state.eq(target.as_str()))
            .execute(conn)?;

        if rows_affected == 0 {
            warn!(request_id, "Request state changed concurrently");
            return Err(DomainError::InvalidTransition {
                entity: "request",
                from: request.state.as_str().to_string(),
                to: target.as_str().to_string(),
            }
            .into());
        }

        info!(
            request_id,
            from = %request.state,
            to = %target,
            "Request state changed"
        );

        Ok(Request {
            state: target,
            ..request
        })
    })
}

/// Advances a request to the next phase of its permit's sequence.
///
/// A request with no current phase may only move to the first phase. The
/// update is conditional on the current phase still being the one that was
/// validated.
///
/// # Errors
///
/// Returns `RequestNotFound` or `PhaseNotFound` for unknown IDs, and
/// `InvalidPhaseOrder` if the target is not the next phase or a concurrent
/// writer advanced the request first.
pub fn advance_phase(
    conn: &mut SqliteConnection,
    request_id: i64,
    target_phase_id: i64,
) -> Result<Request, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let request: Request =
            get_request(conn, request_id)?.ok_or(DomainError::RequestNotFound(request_id))?;

        if get_phase_by_id(conn, target_phase_id)?.is_none() {
            return Err(DomainError::PhaseNotFound(target_phase_id).into());
        }

        let permit_phases: Vec<PermitPhase> = list_permit_phases(conn, request.permit_id)?;
        let sequence: PhaseSequence = PhaseSequence::from_permit_phases(&permit_phases);
        sequence.validate_advance(request_id, request.current_phase_id, target_phase_id)?;

        let update = diesel::update(requests::table).filter(requests::request_id.eq(request_id));
        let rows_affected: usize = match request.current_phase_id {
            Some(current) => update
                .filter(requests::current_phase_id.eq(current))
                .set(requests::current_phase_id.eq(Some(target_phase_id)))
                .execute(conn)?,
            None => update
                .filter(requests::current_phase_id.is_null())
                .set(requests::current_phase_id.eq(Some(target_phase_id)))
                .execute(conn)?,
        };

        if rows_affected == 0 {
            warn!(request_id, "Request phase changed concurrently");
            return Err(DomainError::InvalidPhaseOrder {
                request_id,
                current_phase_id: request.current_phase_id,
                target_phase_id,
            }
            .into());
        }

        info!(
            request_id,
            from = ?request.current_phase_id,
            to = target_phase_id,
            "Request advanced"
        );

        Ok(Request {
            current_phase_id: Some(target_phase_id),
            ..request
        })
    })
}

/// Records an exam attempt for a request at a phase.
///
/// # Errors
///
/// Returns `RequestNotFound` or `PhaseNotFound` for unknown IDs, or an error
/// if the insert fails.
pub fn record_attempt(
    conn: &mut SqliteConnection,
    request_id: i64,
    phase_id: i64,
    attempted_at: OffsetDateTime,
    passed: bool,
) -> Result<ExamAttempt, PersistenceError> {
    if get_request(conn, request_id)?.is_none() {
        return Err(DomainError::RequestNotFound(request_id).into());
    }
    if get_phase_by_id(conn, phase_id)?.is_none() {
        return Err(DomainError::PhaseNotFound(phase_id).into());
    }

    diesel::insert_into(exam_attempts::table)
        .values((
            exam_attempts::request_id.eq(request_id),
            exam_attempts::phase_id.eq(phase_id),
            exam_attempts::attempted_at.eq(format_timestamp(attempted_at)?),
            exam_attempts::passed.eq(i32::from(passed)),
        ))
        .execute(conn)?;

    let attempt_id: i64 = conn.get_last_insert_rowid()?;
    info!(attempt_id, request_id, phase_id, passed, "Exam attempt recorded");

    Ok(ExamAttempt {
        attempt_id,
        request_id,
        phase_id,
        attempted_at,
        passed,
    })
}
