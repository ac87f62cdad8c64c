// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the Autocita booking system.
//!
//! This crate stores users, the availability catalog, bookings, requests and
//! exam attempts in `SQLite` through Diesel, and implements the reservation
//! engine's mutations atomically.
//!
//! ## Consistency Model
//!
//! - Every booking mutation runs in an immediate transaction (`BEGIN
//!   IMMEDIATE`), so the write lock is held from the first read to commit.
//! - Connections set `busy_timeout`; a second writer waits for the lock
//!   rather than failing straight away.
//! - Unique indexes back every uniqueness rule and are translated to the
//!   matching domain error when they fire.
//! - State transitions are compare-and-swap updates on the prior state.
//!
//! ## Testing Philosophy
//!
//! - Tests run against unique shared in-memory databases
//! - Concurrency tests open two connections to one temporary file database

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::SqliteConnection;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use time::{Date, OffsetDateTime};

use autocita_domain::{
    Booking, BookingOperation, ExamAttempt, InstructorProfile, Outing, Permit, PermitPhase, Phase,
    Request, RequestState, Role, Session, Slot, StudentProfile, Zone,
};

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

mod backend;
mod data_models;
mod diesel_schema;
mod encoding;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use backend::sqlite::DEFAULT_BUSY_TIMEOUT_MS;
pub use data_models::{NewRequest, NewStudentRegistration, NewUser, SessionData, UserData};
pub use error::PersistenceError;
pub use queries::{BookingFilter, OutingFilter, SlotFilter};

/// Persistence adapter over a single `SQLite` connection.
pub struct Persistence {
    conn: SqliteConnection,
}

/// Alias kept for call sites that name the backend explicitly.
pub type SqlitePersistence = Persistence;

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        // Shared-cache name per call keeps tests isolated.
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url: String = format!("file:memdb_test_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection =
            backend::sqlite::initialize_database(&shared_memory_url, DEFAULT_BUSY_TIMEOUT_MS)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        Self::new_with_file_and_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Creates a file-based adapter with an explicit busy timeout.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    /// * `busy_timeout_ms` - How long a blocked writer waits for the lock
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file_and_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout_ms: u32,
    ) -> Result<Self, PersistenceError> {
        let path_str: &str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection =
            backend::sqlite::initialize_database(path_str, busy_timeout_ms)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        backend::sqlite::verify_foreign_key_enforcement(&mut self.conn)
    }

    // ========================================================================
    // Users, profiles and sessions
    // ========================================================================

    /// Creates a user account.
    ///
    /// # Arguments
    ///
    /// * `new_user` - Account fields; the password is hashed before storage
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLogin` if the login is taken, or a database error.
    pub fn create_user(&mut self, new_user: &NewUser) -> Result<i64, PersistenceError> {
        mutations::users::create_user(&mut self.conn, new_user)
    }

    /// Creates an instructor account with its permission map.
    ///
    /// # Errors
    ///
    /// Returns an error if the account or profile cannot be created.
    pub fn create_instructor(
        &mut self,
        new_user: &NewUser,
        permissions: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<i64, PersistenceError> {
        mutations::users::create_instructor(&mut self.conn, new_user, permissions)
    }

    /// Attaches a student profile to an existing user.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_student_profile(
        &mut self,
        user_id: i64,
        phone: Option<&str>,
        notes: Option<&str>,
    ) -> Result<(), PersistenceError> {
        mutations::users::create_student_profile(&mut self.conn, user_id, phone, notes)
    }

    /// Registers a student account, profile and first request atomically.
    ///
    /// # Returns
    ///
    /// The new `(user_id, request_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the registration fails.
    pub fn register_student(
        &mut self,
        registration: &NewStudentRegistration,
    ) -> Result<(i64, i64), PersistenceError> {
        mutations::users::register_student(&mut self.conn, registration)
    }

    /// Retrieves a user by login name.
    ///
    /// # Arguments
    ///
    /// * `login_name` - The login name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user_by_login(
        &mut self,
        login_name: &str,
    ) -> Result<Option<UserData>, PersistenceError> {
        queries::users::get_user_by_login(&mut self.conn, login_name)
    }

    /// Retrieves a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user_by_id(&mut self, user_id: i64) -> Result<Option<UserData>, PersistenceError> {
        queries::users::get_user_by_id(&mut self.conn, user_id)
    }

    /// Lists users holding a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_users_by_role(&mut self, role: Role) -> Result<Vec<UserData>, PersistenceError> {
        queries::users::list_users_by_role(&mut self.conn, role)
    }

    /// Retrieves an instructor's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored permissions are not
    /// a JSON object.
    pub fn get_instructor_profile(
        &mut self,
        user_id: i64,
    ) -> Result<Option<InstructorProfile>, PersistenceError> {
        queries::users::get_instructor_profile(&mut self.conn, user_id)
    }

    /// Retrieves a student's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_student_profile(
        &mut self,
        user_id: i64,
    ) -> Result<Option<StudentProfile>, PersistenceError> {
        queries::users::get_student_profile(&mut self.conn, user_id)
    }

    /// Updates the last login timestamp for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn update_last_login(&mut self, user_id: i64) -> Result<(), PersistenceError> {
        mutations::users::update_last_login(&mut self.conn, user_id)
    }

    /// Sets or clears a user's disabled flag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub fn set_user_disabled(
        &mut self,
        user_id: i64,
        disabled: bool,
    ) -> Result<(), PersistenceError> {
        mutations::users::set_user_disabled(&mut self.conn, user_id, disabled)
    }

    /// Verifies a password against a stored bcrypt hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is malformed.
    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, PersistenceError> {
        queries::users::verify_password(password, password_hash)
    }

    /// Creates a session.
    ///
    /// # Arguments
    ///
    /// * `session_token` - The opaque bearer token
    /// * `user_id` - The session owner
    /// * `expires_at` - Expiry as an RFC 3339 timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_session(
        &mut self,
        session_token: &str,
        user_id: i64,
        expires_at: &str,
    ) -> Result<i64, PersistenceError> {
        mutations::users::create_session(&mut self.conn, session_token, user_id, expires_at)
    }

    /// Retrieves a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_session_by_token(
        &mut self,
        session_token: &str,
    ) -> Result<Option<SessionData>, PersistenceError> {
        queries::users::get_session_by_token(&mut self.conn, session_token)
    }

    /// Updates the last activity timestamp for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn update_session_activity(&mut self, session_id: i64) -> Result<(), PersistenceError> {
        mutations::users::update_session_activity(&mut self.conn, session_id)
    }

    /// Deletes a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_session(&mut self, session_token: &str) -> Result<(), PersistenceError> {
        mutations::users::delete_session(&mut self.conn, session_token)
    }

    /// Deletes all expired sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_expired_sessions(&mut self) -> Result<usize, PersistenceError> {
        mutations::users::delete_expired_sessions(&mut self.conn)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Creates a zone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidZoneName`, `DuplicateZone`, or a database error.
    pub fn create_zone(&mut self, name: &str) -> Result<Zone, PersistenceError> {
        mutations::catalog::create_zone(&mut self.conn, name)
    }

    /// Returns the zone with this name, creating it if missing.
    ///
    /// # Returns
    ///
    /// The zone and whether this call created it.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the database fails.
    pub fn get_or_create_zone(&mut self, name: &str) -> Result<(Zone, bool), PersistenceError> {
        mutations::catalog::get_or_create_zone(&mut self.conn, name)
    }

    /// Lists all zones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_zones(&mut self) -> Result<Vec<Zone>, PersistenceError> {
        queries::catalog::list_zones(&mut self.conn)
    }

    /// Retrieves a zone by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_zone_by_id(&mut self, zone_id: i64) -> Result<Option<Zone>, PersistenceError> {
        queries::catalog::get_zone_by_id(&mut self.conn, zone_id)
    }

    /// Finds a zone by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn find_zone_by_name(&mut self, name: &str) -> Result<Option<Zone>, PersistenceError> {
        queries::catalog::find_zone_by_name(&mut self.conn, name)
    }

    /// Creates a permit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPermitCode`, `DuplicatePermit`, or a database error.
    pub fn create_permit(
        &mut self,
        code: &str,
        description: &str,
    ) -> Result<Permit, PersistenceError> {
        mutations::catalog::create_permit(&mut self.conn, code, description)
    }

    /// Lists all permits.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_permits(&mut self) -> Result<Vec<Permit>, PersistenceError> {
        queries::catalog::list_permits(&mut self.conn)
    }

    /// Retrieves a permit by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_permit_by_id(&mut self, permit_id: i64) -> Result<Option<Permit>, PersistenceError> {
        queries::catalog::get_permit_by_id(&mut self.conn, permit_id)
    }

    /// Retrieves a permit by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_permit_by_code(&mut self, code: &str) -> Result<Option<Permit>, PersistenceError> {
        queries::catalog::get_permit_by_code(&mut self.conn, code)
    }

    /// Creates a phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPhaseName`, `DuplicatePhase`, or a database error.
    pub fn create_phase(
        &mut self,
        name: &str,
        display_order: i32,
    ) -> Result<Phase, PersistenceError> {
        mutations::catalog::create_phase(&mut self.conn, name, display_order)
    }

    /// Lists all phases.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_phases(&mut self) -> Result<Vec<Phase>, PersistenceError> {
        queries::catalog::list_phases(&mut self.conn)
    }

    /// Retrieves a phase by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_phase_by_id(&mut self, phase_id: i64) -> Result<Option<Phase>, PersistenceError> {
        queries::catalog::get_phase_by_id(&mut self.conn, phase_id)
    }

    /// Adds a phase to a permit's sequence.
    ///
    /// # Errors
    ///
    /// Returns `PermitNotFound`, `PhaseNotFound`, `DuplicatePermitPhase`, or
    /// a database error.
    pub fn add_permit_phase(
        &mut self,
        permit_id: i64,
        phase_id: i64,
        order_index: i32,
    ) -> Result<PermitPhase, PersistenceError> {
        mutations::catalog::add_permit_phase(&mut self.conn, permit_id, phase_id, order_index)
    }

    /// Lists a permit's phases in sequence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_permit_phases(
        &mut self,
        permit_id: i64,
    ) -> Result<Vec<PermitPhase>, PersistenceError> {
        queries::catalog::list_permit_phases(&mut self.conn, permit_id)
    }

    // ========================================================================
    // Availability
    // ========================================================================

    /// Creates a slot.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `DuplicateSlot`, or a database error.
    pub fn create_slot(
        &mut self,
        instructor_id: i64,
        start_at: OffsetDateTime,
    ) -> Result<Slot, PersistenceError> {
        mutations::availability::create_slot(&mut self.conn, instructor_id, start_at)
    }

    /// Creates an outing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuota`, `UserNotFound`, `ZoneNotFound`,
    /// `DuplicateOuting`, or a database error.
    pub fn create_outing(
        &mut self,
        instructor_id: i64,
        zone_id: i64,
        date: Date,
        session: Session,
        quota: i64,
    ) -> Result<Outing, PersistenceError> {
        mutations::availability::create_outing(
            &mut self.conn,
            instructor_id,
            zone_id,
            date,
            session,
            quota,
        )
    }

    /// Retrieves a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_slot(&mut self, slot_id: i64) -> Result<Option<Slot>, PersistenceError> {
        queries::availability::get_slot(&mut self.conn, slot_id)
    }

    /// Lists slots matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_slots(&mut self, filter: SlotFilter) -> Result<Vec<Slot>, PersistenceError> {
        queries::availability::list_slots(&mut self.conn, filter)
    }

    /// Retrieves an outing with its active booking count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_outing(&mut self, outing_id: i64) -> Result<Option<Outing>, PersistenceError> {
        queries::availability::get_outing(&mut self.conn, outing_id)
    }

    /// Lists outings matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_outings(&mut self, filter: OutingFilter) -> Result<Vec<Outing>, PersistenceError> {
        queries::availability::list_outings(&mut self.conn, filter)
    }

    /// Removes a slot together with its booking.
    ///
    /// # Errors
    ///
    /// Returns `SlotNotFound` or a database error.
    pub fn remove_slot(&mut self, slot_id: i64) -> Result<(Slot, Vec<Booking>), PersistenceError> {
        mutations::availability::remove_slot(&mut self.conn, slot_id)
    }

    /// Removes an outing together with its bookings.
    ///
    /// # Errors
    ///
    /// Returns `OutingNotFound` or a database error.
    pub fn remove_outing(
        &mut self,
        outing_id: i64,
    ) -> Result<(Outing, Vec<Booking>), PersistenceError> {
        mutations::availability::remove_outing(&mut self.conn, outing_id)
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Books a slot. The booking is confirmed immediately.
    ///
    /// # Errors
    ///
    /// Returns `SlotNotFound`, `UserNotFound`, `SelfBooking`,
    /// `AlreadyBooked`, or a database error.
    pub fn book_slot(
        &mut self,
        student_id: i64,
        slot_id: i64,
    ) -> Result<Booking, PersistenceError> {
        mutations::bookings::book_slot(&mut self.conn, student_id, slot_id)
    }

    /// Books an outing seat. The booking starts pending.
    ///
    /// # Errors
    ///
    /// Returns `OutingNotFound`, `UserNotFound`, `SelfBooking`,
    /// `DuplicateBooking`, `NoSeats`, or a database error.
    pub fn book_outing(
        &mut self,
        student_id: i64,
        outing_id: i64,
    ) -> Result<Booking, PersistenceError> {
        mutations::bookings::book_outing(&mut self.conn, student_id, outing_id)
    }

    /// Applies a confirm, reject or cancel operation to a booking.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound`, `InvalidTransition`, or a database error.
    pub fn transition_booking(
        &mut self,
        booking_id: i64,
        operation: BookingOperation,
    ) -> Result<Booking, PersistenceError> {
        mutations::bookings::transition_booking(&mut self.conn, booking_id, operation)
    }

    /// Cancels (deletes) a booking.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound` or a database error.
    pub fn cancel_booking(&mut self, booking_id: i64) -> Result<Booking, PersistenceError> {
        mutations::bookings::cancel_booking(&mut self.conn, booking_id)
    }

    /// Retrieves a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_booking(&mut self, booking_id: i64) -> Result<Option<Booking>, PersistenceError> {
        queries::bookings::get_booking(&mut self.conn, booking_id)
    }

    /// Lists bookings matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_bookings(
        &mut self,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>, PersistenceError> {
        queries::bookings::list_bookings(&mut self.conn, filter)
    }

    // ========================================================================
    // Requests and phase progression
    // ========================================================================

    /// Creates a request in the `requested` state.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_request(&mut self, new_request: &NewRequest) -> Result<i64, PersistenceError> {
        mutations::requests::create_request(&mut self.conn, new_request)
    }

    /// Retrieves a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_request(&mut self, request_id: i64) -> Result<Option<Request>, PersistenceError> {
        queries::requests::get_request(&mut self.conn, request_id)
    }

    /// Lists requests by registration time, optionally for one student.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_requests(
        &mut self,
        student_id: Option<i64>,
    ) -> Result<Vec<Request>, PersistenceError> {
        queries::requests::list_requests(&mut self.conn, student_id)
    }

    /// Retrieves a student's most recently registered request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn latest_request_for_student(
        &mut self,
        student_id: i64,
    ) -> Result<Option<Request>, PersistenceError> {
        queries::requests::latest_request_for_student(&mut self.conn, student_id)
    }

    /// Moves a request through its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`, `InvalidTransition`, or a database error.
    pub fn set_request_state(
        &mut self,
        request_id: i64,
        target: RequestState,
    ) -> Result<Request, PersistenceError> {
        mutations::requests::set_request_state(&mut self.conn, request_id, target)
    }

    /// Advances a request to the next phase of its permit.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`, `PhaseNotFound`, `InvalidPhaseOrder`, or a
    /// database error.
    pub fn advance_phase(
        &mut self,
        request_id: i64,
        target_phase_id: i64,
    ) -> Result<Request, PersistenceError> {
        mutations::requests::advance_phase(&mut self.conn, request_id, target_phase_id)
    }

    /// Records an exam attempt.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`, `PhaseNotFound`, or a database error.
    pub fn record_attempt(
        &mut self,
        request_id: i64,
        phase_id: i64,
        attempted_at: OffsetDateTime,
        passed: bool,
    ) -> Result<ExamAttempt, PersistenceError> {
        mutations::requests::record_attempt(
            &mut self.conn,
            request_id,
            phase_id,
            attempted_at,
            passed,
        )
    }

    /// Lists a request's exam attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_attempts(&mut self, request_id: i64) -> Result<Vec<ExamAttempt>, PersistenceError> {
        queries::requests::list_attempts(&mut self.conn, request_id)
    }
}
