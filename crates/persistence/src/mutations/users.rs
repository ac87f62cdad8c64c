// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User, profile and session mutations.

use autocita_domain::{DomainError, RequestState, Role};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::{NewRequest, NewStudentRegistration, NewUser};
use crate::diesel_schema::{instructor_profiles, sessions, student_profiles, users};
use crate::encoding::now_timestamp;
use crate::error::PersistenceError;
use crate::mutations::requests::insert_request;
use crate::queries::users::normalize_login;

/// Creates a user account.
///
/// The login name is normalized to lowercase and the password is hashed
/// with bcrypt before it is stored.
///
/// # Errors
///
/// Returns `DomainViolation(DuplicateLogin)` if the login is taken, or an
/// error if hashing or the insert fails.
pub fn create_user(
    conn: &mut SqliteConnection,
    new_user: &NewUser,
) -> Result<i64, PersistenceError> {
    let normalized_login: String = normalize_login(&new_user.login_name);

    info!(
        login_name = %normalized_login,
        role = %new_user.role,
        "Creating user"
    );

    let password_hash: String = bcrypt::hash(&new_user.password, bcrypt::DEFAULT_COST)
        .map_err(|e| PersistenceError::Other(format!("Failed to hash password: {e}")))?;

    diesel::insert_into(users::table)
        .values((
            users::login_name.eq(&normalized_login),
            users::first_name.eq(&new_user.first_name),
            users::last_name.eq(&new_user.last_name),
            users::password_hash.eq(&password_hash),
            users::role.eq(new_user.role.as_str()),
            users::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)
        .map_err(|e| match PersistenceError::from(e) {
            PersistenceError::UniqueViolation(_) => {
                PersistenceError::DomainViolation(DomainError::DuplicateLogin(normalized_login))
            }
            other => other,
        })?;

    let user_id: i64 = conn.get_last_insert_rowid()?;

    info!(user_id, "User created");
    Ok(user_id)
}

/// Creates an instructor account and its profile in one transaction.
///
/// # Errors
///
/// Returns an error if the account or profile cannot be created.
pub fn create_instructor(
    conn: &mut SqliteConnection,
    new_user: &NewUser,
    permissions: &serde_json::Map<String, serde_json::Value>,
) -> Result<i64, PersistenceError> {
    let permissions_json: String = serde_json::to_string(permissions)?;

    conn.immediate_transaction(|conn| {
        let user_id: i64 = create_user(
            conn,
            &NewUser {
                role: Role::Instructor,
                ..new_user.clone()
            },
        )?;

        diesel::insert_into(instructor_profiles::table)
            .values((
                instructor_profiles::user_id.eq(user_id),
                instructor_profiles::permissions.eq(&permissions_json),
            ))
            .execute(conn)?;

        Ok(user_id)
    })
}

/// Attaches a student profile to an existing user.
///
/// The user's role is not checked here; callers create profiles only for
/// student accounts.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_student_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    phone: Option<&str>,
    notes: Option<&str>,
) -> Result<(), PersistenceError> {
    diesel::insert_into(student_profiles::table)
        .values((
            student_profiles::user_id.eq(user_id),
            student_profiles::phone.eq(phone),
            student_profiles::notes.eq(notes),
        ))
        .execute(conn)?;
    Ok(())
}

/// Registers a student: account, profile and first request, atomically.
///
/// # Returns
///
/// The new `(user_id, request_id)`.
///
/// # Errors
///
/// Returns an error if any of the three inserts fails; nothing is kept.
pub fn register_student(
    conn: &mut SqliteConnection,
    registration: &NewStudentRegistration,
) -> Result<(i64, i64), PersistenceError> {
    conn.immediate_transaction(|conn| {
        let user_id: i64 = create_user(
            conn,
            &NewUser {
                role: Role::Student,
                ..registration.user.clone()
            },
        )?;

        create_student_profile(
            conn,
            user_id,
            registration.phone.as_deref(),
            registration.profile_notes.as_deref(),
        )?;

        let request_id: i64 = insert_request(
            conn,
            &NewRequest {
                student_id: user_id,
                zone_id: registration.zone_id,
                permit_id: registration.permit_id,
                preferred_session: registration.preferred_session,
                theory_exam_date: registration.theory_exam_date,
                notes: registration.request_notes.clone(),
            },
            RequestState::Requested,
        )?;

        info!(user_id, request_id, "Student registered");
        Ok((user_id, request_id))
    })
}

/// Updates the last login timestamp for a user.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn update_last_login(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<(), PersistenceError> {
    debug!(user_id, "Updating last_login_at");

    diesel::update(users::table)
        .filter(users::user_id.eq(user_id))
        .set(users::last_login_at.eq(Some(now_timestamp()?)))
        .execute(conn)?;

    Ok(())
}

/// Sets or clears the disabled flag on a user.
///
/// # Errors
///
/// Returns `NotFound` if the user does not exist.
pub fn set_user_disabled(
    conn: &mut SqliteConnection,
    user_id: i64,
    disabled: bool,
) -> Result<(), PersistenceError> {
    info!(user_id, disabled, "Updating user disabled flag");

    let rows_affected: usize = diesel::update(users::table)
        .filter(users::user_id.eq(user_id))
        .set(users::is_disabled.eq(i32::from(disabled)))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!("User {user_id}")));
    }
    Ok(())
}

/// Creates a session.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_session(
    conn: &mut SqliteConnection,
    session_token: &str,
    user_id: i64,
    expires_at: &str,
) -> Result<i64, PersistenceError> {
    let now: String = now_timestamp()?;

    diesel::insert_into(sessions::table)
        .values((
            sessions::session_token.eq(session_token),
            sessions::user_id.eq(user_id),
            sessions::created_at.eq(&now),
            sessions::last_activity_at.eq(&now),
            sessions::expires_at.eq(expires_at),
        ))
        .execute(conn)?;

    let session_id: i64 = conn.get_last_insert_rowid()?;
    debug!(session_id, user_id, "Session created");
    Ok(session_id)
}

/// Updates the last activity timestamp for a session.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn update_session_activity(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> Result<(), PersistenceError> {
    diesel::update(sessions::table)
        .filter(sessions::session_id.eq(session_id))
        .set(sessions::last_activity_at.eq(now_timestamp()?))
        .execute(conn)?;
    Ok(())
}

/// Deletes a session by token.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn delete_session(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> Result<(), PersistenceError> {
    diesel::delete(sessions::table)
        .filter(sessions::session_token.eq(session_token))
        .execute(conn)?;
    Ok(())
}

/// Deletes all sessions whose expiry is before now.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn delete_expired_sessions(conn: &mut SqliteConnection) -> Result<usize, PersistenceError> {
    let now: String = now_timestamp()?;
    let deleted: usize = diesel::delete(sessions::table)
        .filter(sessions::expires_at.lt(&now))
        .execute(conn)?;
    info!(deleted, "Deleted expired sessions");
    Ok(deleted)
}
