// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::types::{Role, Session};

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An instructor already has a slot at this start time.
    DuplicateSlot {
        /// The owning instructor's user ID.
        instructor_id: i64,
        /// The conflicting start time (RFC 3339).
        start_at: String,
    },
    /// An instructor already has an outing for this date and session.
    DuplicateOuting {
        /// The owning instructor's user ID.
        instructor_id: i64,
        /// The conflicting date.
        date: time::Date,
        /// The conflicting session.
        session: Session,
    },
    /// The student already holds a booking on this outing.
    DuplicateBooking {
        /// The student's user ID.
        student_id: i64,
        /// The outing ID.
        outing_id: i64,
    },
    /// The slot already carries a booking.
    AlreadyBooked {
        /// The slot ID.
        slot_id: i64,
    },
    /// The outing has no remaining seats.
    NoSeats {
        /// The outing ID.
        outing_id: i64,
        /// The outing's seat quota.
        quota: u32,
    },
    /// A user attempted to book their own availability.
    SelfBooking {
        /// The user ID on both sides of the booking.
        user_id: i64,
    },
    /// A state change is not permitted from the current state.
    InvalidTransition {
        /// The kind of entity being transitioned.
        entity: &'static str,
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },
    /// A phase advance does not follow the permit's phase sequence.
    InvalidPhaseOrder {
        /// The request being advanced.
        request_id: i64,
        /// The request's current phase, if any.
        current_phase_id: Option<i64>,
        /// The requested target phase.
        target_phase_id: i64,
    },
    /// Outing quota must be at least one seat.
    InvalidQuota {
        /// The rejected quota value.
        quota: i64,
    },
    /// Person name is empty or invalid.
    InvalidName(String),
    /// Login name is empty or invalid.
    InvalidLoginName(String),
    /// Password does not meet minimum requirements.
    InvalidPassword(String),
    /// Zone name is empty or invalid.
    InvalidZoneName(String),
    /// Permit code is empty or invalid.
    InvalidPermitCode(String),
    /// Phase name is empty or invalid.
    InvalidPhaseName(String),
    /// Role string is not recognized.
    InvalidRole(String),
    /// Session string is not recognized.
    InvalidSession(String),
    /// Booking state string is not recognized.
    InvalidBookingState(String),
    /// Request state string is not recognized.
    InvalidRequestState(String),
    /// Permission map is not a JSON object.
    InvalidPermissions(String),
    /// Failed to parse a date or timestamp.
    DateParseError {
        /// The invalid input.
        date_string: String,
        /// The parser's error message.
        error: String,
    },
    /// Login name is already taken.
    DuplicateLogin(String),
    /// Zone name is already taken (case-insensitive).
    DuplicateZone(String),
    /// Permit code is already taken.
    DuplicatePermit(String),
    /// Phase name is already taken.
    DuplicatePhase(String),
    /// The phase is already part of the permit's sequence.
    DuplicatePermitPhase {
        /// The permit ID.
        permit_id: i64,
        /// The phase ID.
        phase_id: i64,
    },
    /// The user does not hold the role the operation requires.
    RoleMismatch {
        /// The user's ID.
        user_id: i64,
        /// The role the operation requires.
        expected: Role,
        /// The role the user holds.
        actual: Role,
    },
    /// User does not exist.
    UserNotFound(i64),
    /// Slot does not exist.
    SlotNotFound(i64),
    /// Outing does not exist.
    OutingNotFound(i64),
    /// Booking does not exist.
    BookingNotFound(i64),
    /// Zone does not exist.
    ZoneNotFound(String),
    /// Permit does not exist.
    PermitNotFound(String),
    /// Phase does not exist.
    PhaseNotFound(i64),
    /// Request does not exist.
    RequestNotFound(i64),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSlot {
                instructor_id,
                start_at,
            } => write!(
                f,
                "Instructor {instructor_id} already has a slot starting at {start_at}"
            ),
            Self::DuplicateOuting {
                instructor_id,
                date,
                session,
            } => write!(
                f,
                "Instructor {instructor_id} already has a {} outing on {date}",
                session.as_str()
            ),
            Self::DuplicateBooking {
                student_id,
                outing_id,
            } => write!(
                f,
                "Student {student_id} already holds a booking on outing {outing_id}"
            ),
            Self::AlreadyBooked { slot_id } => write!(f, "Slot {slot_id} is already booked"),
            Self::NoSeats { outing_id, quota } => write!(
                f,
                "Outing {outing_id} has no remaining seats (quota {quota})"
            ),
            Self::SelfBooking { user_id } => {
                write!(f, "User {user_id} cannot book their own availability")
            }
            Self::InvalidTransition { entity, from, to } => {
                write!(f, "Cannot transition {entity} from '{from}' to '{to}'")
            }
            Self::InvalidPhaseOrder {
                request_id,
                current_phase_id,
                target_phase_id,
            } => match current_phase_id {
                Some(current) => write!(
                    f,
                    "Request {request_id} cannot advance from phase {current} to phase {target_phase_id}"
                ),
                None => write!(
                    f,
                    "Request {request_id} must start at the first phase, not phase {target_phase_id}"
                ),
            },
            Self::InvalidQuota { quota } => {
                write!(f, "Invalid quota {quota}: must be at least 1")
            }
            Self::InvalidName(msg) => write!(f, "Invalid name: {msg}"),
            Self::InvalidLoginName(msg) => write!(f, "Invalid login name: {msg}"),
            Self::InvalidPassword(msg) => write!(f, "Invalid password: {msg}"),
            Self::InvalidZoneName(msg) => write!(f, "Invalid zone name: {msg}"),
            Self::InvalidPermitCode(msg) => write!(f, "Invalid permit code: {msg}"),
            Self::InvalidPhaseName(msg) => write!(f, "Invalid phase name: {msg}"),
            Self::InvalidRole(role) => write!(f, "Invalid role: {role}"),
            Self::InvalidSession(session) => write!(f, "Invalid session: {session}"),
            Self::InvalidBookingState(state) => write!(f, "Invalid booking state: {state}"),
            Self::InvalidRequestState(state) => write!(f, "Invalid request state: {state}"),
            Self::InvalidPermissions(msg) => write!(f, "Invalid permissions: {msg}"),
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
            Self::DuplicateLogin(login) => write!(f, "Login '{login}' is already taken"),
            Self::DuplicateZone(name) => write!(f, "Zone '{name}' already exists"),
            Self::DuplicatePermit(code) => write!(f, "Permit '{code}' already exists"),
            Self::DuplicatePhase(name) => write!(f, "Phase '{name}' already exists"),
            Self::DuplicatePermitPhase {
                permit_id,
                phase_id,
            } => write!(
                f,
                "Phase {phase_id} is already part of permit {permit_id}"
            ),
            Self::RoleMismatch {
                user_id,
                expected,
                actual,
            } => write!(f, "User {user_id} has role {actual}, expected {expected}"),
            Self::UserNotFound(id) => write!(f, "User {id} not found"),
            Self::SlotNotFound(id) => write!(f, "Slot {id} not found"),
            Self::OutingNotFound(id) => write!(f, "Outing {id} not found"),
            Self::BookingNotFound(id) => write!(f, "Booking {id} not found"),
            Self::ZoneNotFound(name) => write!(f, "Zone '{name}' not found"),
            Self::PermitNotFound(code) => write!(f, "Permit '{code}' not found"),
            Self::PhaseNotFound(id) => write!(f, "Phase {id} not found"),
            Self::RequestNotFound(id) => write!(f, "Request {id} not found"),
        }
    }
}

impl std::error::Error for DomainError {}
