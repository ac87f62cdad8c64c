// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User, profile and session queries.

use autocita_domain::{InstructorProfile, Role, StudentProfile};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::debug;

use crate::data_models::{SessionData, UserData};
use crate::diesel_schema::{instructor_profiles, sessions, student_profiles, users};
use crate::encoding::parse_stored;
use crate::error::PersistenceError;

/// Diesel Queryable struct for user rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = users)]
struct UserRow {
    user_id: i64,
    login_name: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    is_disabled: i32,
    created_at: String,
    last_login_at: Option<String>,
}

impl TryFrom<UserRow> for UserData {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.user_id,
            login_name: row.login_name,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role: parse_stored::<Role>(&row.role)?,
            is_disabled: row.is_disabled != 0,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

/// Diesel Queryable struct for session rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = sessions)]
struct SessionRow {
    session_id: i64,
    session_token: String,
    user_id: i64,
    created_at: String,
    last_activity_at: String,
    expires_at: String,
}

/// Normalizes a login name for case-insensitive uniqueness.
#[must_use]
pub fn normalize_login(login_name: &str) -> String {
    login_name.trim().to_lowercase()
}

/// Retrieves a user by login name.
///
/// The login name is normalized before lookup.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the user is not found.
pub fn get_user_by_login(
    conn: &mut SqliteConnection,
    login_name: &str,
) -> Result<Option<UserData>, PersistenceError> {
    let normalized_login: String = normalize_login(login_name);

    debug!(login_name = %normalized_login, "Looking up user by login name");

    let row: Option<UserRow> = users::table
        .filter(users::login_name.eq(&normalized_login))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?;

    row.map(UserData::try_from).transpose()
}

/// Retrieves a user by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the user is not found.
pub fn get_user_by_id(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<UserData>, PersistenceError> {
    debug!(user_id, "Looking up user by ID");

    let row: Option<UserRow> = users::table
        .filter(users::user_id.eq(user_id))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?;

    row.map(UserData::try_from).transpose()
}

/// Lists all users holding `role`, ordered by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_users_by_role(
    conn: &mut SqliteConnection,
    role: Role,
) -> Result<Vec<UserData>, PersistenceError> {
    let rows: Vec<UserRow> = users::table
        .filter(users::role.eq(role.as_str()))
        .order(users::user_id.asc())
        .select(UserRow::as_select())
        .load(conn)?;

    rows.into_iter().map(UserData::try_from).collect()
}

/// Retrieves the instructor profile for a user.
///
/// # Errors
///
/// Returns an error if the query fails or the stored permissions are not
/// valid JSON.
pub fn get_instructor_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<InstructorProfile>, PersistenceError> {
    let permissions: Option<String> = instructor_profiles::table
        .filter(instructor_profiles::user_id.eq(user_id))
        .select(instructor_profiles::permissions)
        .first(conn)
        .optional()?;

    permissions
        .map(|text| {
            let value: serde_json::Value = serde_json::from_str(&text)?;
            InstructorProfile::new(user_id, value).map_err(PersistenceError::DomainViolation)
        })
        .transpose()
}

/// Retrieves the student profile for a user.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_student_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<StudentProfile>, PersistenceError> {
    let row: Option<(i64, Option<String>, Option<String>)> = student_profiles::table
        .filter(student_profiles::user_id.eq(user_id))
        .select((
            student_profiles::user_id,
            student_profiles::phone,
            student_profiles::notes,
        ))
        .first(conn)
        .optional()?;

    Ok(row.map(|(user_id, phone, notes)| StudentProfile {
        user_id,
        phone,
        notes,
    }))
}

/// Retrieves a session by token.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the session is not found.
pub fn get_session_by_token(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<Option<SessionData>, PersistenceError> {
    let row: Option<SessionRow> = sessions::table
        .filter(sessions::session_token.eq(session_token))
        .select(SessionRow::as_select())
        .first(conn)
        .optional()?;

    Ok(row.map(|row| SessionData {
        session_id: row.session_id,
        session_token: row.session_token,
        user_id: row.user_id,
        created_at: row.created_at,
        last_activity_at: row.last_activity_at,
        expires_at: row.expires_at,
    }))
}

/// Verifies a plain-text password against a stored bcrypt hash.
///
/// # Errors
///
/// Returns an error if the stored hash is malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PersistenceError> {
    bcrypt::verify(password, password_hash)
        .map_err(|e| PersistenceError::Other(format!("Failed to verify password: {e}")))
}
