// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use autocita_domain::{DomainError, Role};
use autocita_persistence::PersistenceError;

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// Who may perform this action.
        required_role: String,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// API-level errors.
///
/// These are distinct from domain and persistence errors and represent the
/// API contract. Rule violations carry a stable snake_case rule id such as
/// `no_seats` that transports may key on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The caller's role or ownership does not permit the action.
    Forbidden {
        /// The action that was attempted.
        action: String,
        /// Why the action was refused.
        reason: String,
    },
    /// A domain rule was violated.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// A uniqueness constraint rejected the write.
    Conflict {
        /// A human-readable description of the conflict.
        message: String,
    },
    /// The store could not be reached in time; the caller may retry.
    Unavailable {
        /// A description of the failure.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl ApiError {
    /// Returns the rule id for rule violations.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::DomainRuleViolation { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Forbidden { action, reason } => {
                write!(f, "Forbidden: '{action}': {reason}")
            }
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Conflict { message } => write!(f, "Conflict: {message}"),
            Self::Unavailable { message } => write!(f, "Service unavailable: {message}"),
            Self::Internal { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::Unauthorized {
                action,
                required_role,
            } => Self::Forbidden {
                action,
                reason: format!("requires {required_role}"),
            },
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        translate_persistence_error(err)
    }
}

fn rule_violation(rule: &str, err: &DomainError) -> ApiError {
    ApiError::DomainRuleViolation {
        rule: String::from(rule),
        message: err.to_string(),
    }
}

fn invalid_input(field: &str, message: String) -> ApiError {
    ApiError::InvalidInput {
        field: String::from(field),
        message,
    }
}

fn not_found(resource_type: &str, err: &DomainError) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from(resource_type),
        message: err.to_string(),
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::DuplicateSlot { .. } => rule_violation("duplicate_slot", &err),
        DomainError::DuplicateOuting { .. } => rule_violation("duplicate_outing", &err),
        DomainError::DuplicateBooking { .. } => rule_violation("duplicate_booking", &err),
        DomainError::AlreadyBooked { .. } => rule_violation("already_booked", &err),
        DomainError::NoSeats { .. } => rule_violation("no_seats", &err),
        DomainError::SelfBooking { .. } => rule_violation("self_booking", &err),
        DomainError::InvalidTransition { .. } => rule_violation("invalid_transition", &err),
        DomainError::InvalidPhaseOrder { .. } => rule_violation("invalid_phase_order", &err),
        DomainError::InvalidQuota { quota } => invalid_input(
            "quota",
            format!("Invalid quota {quota}: must be at least 1"),
        ),
        DomainError::InvalidName(msg) | DomainError::InvalidPhaseName(msg) => {
            invalid_input("name", msg)
        }
        DomainError::InvalidLoginName(msg) => invalid_input("login_name", msg),
        DomainError::InvalidPassword(msg) => invalid_input("password", msg),
        DomainError::InvalidZoneName(msg) => invalid_input("zone", msg),
        DomainError::InvalidPermitCode(msg) => invalid_input("code", msg),
        DomainError::InvalidRole(role) => invalid_input("role", format!("Unknown role '{role}'")),
        DomainError::InvalidSession(session) => {
            invalid_input("session", format!("Unknown session '{session}'"))
        }
        DomainError::InvalidBookingState(state) | DomainError::InvalidRequestState(state) => {
            invalid_input("state", format!("Unknown state '{state}'"))
        }
        DomainError::InvalidPermissions(msg) => invalid_input("permissions", msg),
        DomainError::DateParseError { date_string, error } => invalid_input(
            "date",
            format!("Failed to parse date '{date_string}': {error}"),
        ),
        DomainError::DuplicateLogin(_)
        | DomainError::DuplicateZone(_)
        | DomainError::DuplicatePermit(_)
        | DomainError::DuplicatePhase(_)
        | DomainError::DuplicatePermitPhase { .. } => ApiError::Conflict {
            message: err.to_string(),
        },
        DomainError::RoleMismatch { expected, .. } => {
            let field: &str = match expected {
                Role::Instructor => "instructor_id",
                Role::Student => "student_id",
                Role::Admin => "user_id",
            };
            invalid_input(field, err.to_string())
        }
        DomainError::UserNotFound(_) => not_found("User", &err),
        DomainError::SlotNotFound(_) => not_found("Slot", &err),
        DomainError::OutingNotFound(_) => not_found("Outing", &err),
        DomainError::BookingNotFound(_) => not_found("Booking", &err),
        DomainError::ZoneNotFound(_) => not_found("Zone", &err),
        DomainError::PermitNotFound(_) => not_found("Permit", &err),
        DomainError::PhaseNotFound(_) => not_found("Phase", &err),
        DomainError::RequestNotFound(_) => not_found("Request", &err),
    }
}

/// Translates a persistence error into an API error.
///
/// Rules checked inside a transaction surface as their domain translation.
/// Lock contention past the busy timeout is reported as `Unavailable`.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        PersistenceError::NotFound(message) => ApiError::ResourceNotFound {
            resource_type: String::from("Record"),
            message,
        },
        PersistenceError::UniqueViolation(message) => ApiError::Conflict { message },
        PersistenceError::Busy(message) => ApiError::Unavailable { message },
        other => ApiError::Internal {
            message: other.to_string(),
        },
    }
}
