// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request and exam attempt queries.

use autocita_domain::{ExamAttempt, Request, RequestState, Session};
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::diesel_schema::{exam_attempts, requests};
use crate::encoding::{parse_date, parse_stored, parse_timestamp};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = requests)]
struct RequestRow {
    request_id: i64,
    student_id: i64,
    zone_id: i64,
    permit_id: i64,
    preferred_session: String,
    theory_exam_date: Option<String>,
    registered_at: String,
    notes: String,
    state: String,
    current_phase_id: Option<i64>,
}

impl TryFrom<RequestRow> for Request {
    type Error = PersistenceError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            request_id: row.request_id,
            student_id: row.student_id,
            zone_id: row.zone_id,
            permit_id: row.permit_id,
            preferred_session: parse_stored::<Session>(&row.preferred_session)?,
            theory_exam_date: row
                .theory_exam_date
                .as_deref()
                .map(parse_date)
                .transpose()?,
            registered_at: parse_timestamp(&row.registered_at)?,
            notes: row.notes,
            state: parse_stored::<RequestState>(&row.state)?,
            current_phase_id: row.current_phase_id,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = exam_attempts)]
struct ExamAttemptRow {
    attempt_id: i64,
    request_id: i64,
    phase_id: i64,
    attempted_at: String,
    passed: i32,
}

impl TryFrom<ExamAttemptRow> for ExamAttempt {
    type Error = PersistenceError;

    fn try_from(row: ExamAttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            attempt_id: row.attempt_id,
            request_id: row.request_id,
            phase_id: row.phase_id,
            attempted_at: parse_timestamp(&row.attempted_at)?,
            passed: row.passed != 0,
        })
    }
}

/// Retrieves a request by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_request(
    conn: &mut SqliteConnection,
    request_id: i64,
) -> Result<Option<Request>, PersistenceError> {
    let row: Option<RequestRow> = requests::table
        .filter(requests::request_id.eq(request_id))
        .select(RequestRow::as_select())
        .first(conn)
        .optional()?;

    row.map(Request::try_from).transpose()
}

/// Lists requests by registration time, optionally for one student.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_requests(
    conn: &mut SqliteConnection,
    student_id: Option<i64>,
) -> Result<Vec<Request>, PersistenceError> {
    let mut query = requests::table
        .select(RequestRow::as_select())
        .order((requests::registered_at.asc(), requests::request_id.asc()))
        .into_boxed();

    if let Some(student_id) = student_id {
        query = query.filter(requests::student_id.eq(student_id));
    }

    let rows: Vec<RequestRow> = query.load(conn)?;
    rows.into_iter().map(Request::try_from).collect()
}

/// Retrieves a student's most recently registered request.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn latest_request_for_student(
    conn: &mut SqliteConnection,
    student_id: i64,
) -> Result<Option<Request>, PersistenceError> {
    let row: Option<RequestRow> = requests::table
        .filter(requests::student_id.eq(student_id))
        .order((requests::registered_at.desc(), requests::request_id.desc()))
        .select(RequestRow::as_select())
        .first(conn)
        .optional()?;

    row.map(Request::try_from).transpose()
}

/// Lists a request's exam attempts, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_attempts(
    conn: &mut SqliteConnection,
    request_id: i64,
) -> Result<Vec<ExamAttempt>, PersistenceError> {
    let rows: Vec<ExamAttemptRow> = exam_attempts::table
        .filter(exam_attempts::request_id.eq(request_id))
        .order((
            exam_attempts::attempted_at.desc(),
            exam_attempts::attempt_id.desc(),
        ))
        .select(ExamAttemptRow::as_select())
        .load(conn)?;

    rows.into_iter().map(ExamAttempt::try_from).collect()
}
