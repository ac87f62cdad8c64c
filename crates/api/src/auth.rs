// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Authentication and authorization types and services.

use autocita_domain::Role;
use autocita_persistence::{PersistenceError, SessionData, SqlitePersistence, UserData};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// An authenticated user acting on the system.
///
/// Every operation receives the acting identity explicitly; the role is the
/// stored role column and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    /// The acting user's ID.
    pub user_id: i64,
    /// The acting user's login name.
    pub login_name: String,
    /// The role assigned to this user.
    pub role: Role,
}

impl AuthenticatedActor {
    /// Creates a new authenticated actor.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The acting user's ID
    /// * `login_name` - The acting user's login name
    /// * `role` - The role assigned to this user
    #[must_use]
    pub const fn new(user_id: i64, login_name: String, role: Role) -> Self {
        Self {
            user_id,
            login_name,
            role,
        }
    }

    /// Builds the actor for a stored account.
    #[must_use]
    pub fn from_user(user: &UserData) -> Self {
        Self::new(user.user_id, user.login_name.clone(), user.role)
    }
}

/// Authorization service for role-based checks that do not depend on
/// ownership.
///
/// Ownership-dependent rules (booking mutations, listing scopes) live in
/// the policy module.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Requires the Admin role.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor is not an admin.
    pub fn require_admin(actor: &AuthenticatedActor, action: &str) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Instructor | Role::Student => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("admin"),
            }),
        }
    }

    /// Requires staff: an admin or an instructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor is a student.
    pub fn require_staff(actor: &AuthenticatedActor, action: &str) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin | Role::Instructor => Ok(()),
            Role::Student => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("admin or instructor"),
            }),
        }
    }

    /// Resolves whose availability is being created or removed.
    ///
    /// Instructors act for themselves only. Admins act on behalf of any
    /// instructor and must name one.
    ///
    /// # Arguments
    ///
    /// * `actor` - The authenticated actor
    /// * `instructor_id` - The instructor named in the request, if any
    /// * `action` - The action being authorized
    ///
    /// # Errors
    ///
    /// Returns an error if a student acts, if an instructor names someone
    /// else, or if an admin names nobody.
    pub fn authorize_instructor_action(
        actor: &AuthenticatedActor,
        instructor_id: Option<i64>,
        action: &str,
    ) -> Result<i64, AuthError> {
        match (actor.role, instructor_id) {
            (Role::Instructor, None) => Ok(actor.user_id),
            (Role::Instructor, Some(id)) if id == actor.user_id => Ok(id),
            (Role::Admin, Some(id)) => Ok(id),
            (Role::Admin, None) => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("an instructor, or an admin naming one"),
            }),
            (Role::Instructor, Some(_)) | (Role::Student, _) => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("admin or the owning instructor"),
            }),
        }
    }

    /// Resolves which student an operation acts for.
    ///
    /// Students act for themselves only. Admins act on behalf of any
    /// student and must name one. Instructors never act as students.
    ///
    /// # Errors
    ///
    /// Returns an error if an instructor acts, if a student names someone
    /// else, or if an admin names nobody.
    pub fn authorize_student_action(
        actor: &AuthenticatedActor,
        student_id: Option<i64>,
        action: &str,
    ) -> Result<i64, AuthError> {
        match (actor.role, student_id) {
            (Role::Student, None) => Ok(actor.user_id),
            (Role::Student, Some(id)) if id == actor.user_id => Ok(id),
            (Role::Admin, Some(id)) => Ok(id),
            (Role::Admin, None) => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("a student, or an admin naming one"),
            }),
            (Role::Student, Some(_)) | (Role::Instructor, _) => Err(AuthError::Unauthorized {
                action: String::from(action),
                required_role: String::from("admin or the student themself"),
            }),
        }
    }
}

/// Authentication service for login, logout, and session validation.
pub struct AuthenticationService;

impl AuthenticationService {
    /// Default session expiration.
    pub const DEFAULT_SESSION_EXPIRATION: Duration = Duration::days(30);

    /// Authenticates a user and creates a session.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The persistence layer
    /// * `login_name` - The login name
    /// * `password` - The plain-text password
    ///
    /// # Returns
    ///
    /// A tuple of (`session_token`, `authenticated_actor`, `user_data`)
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are wrong, the account is
    /// disabled, or the session cannot be created.
    pub fn login(
        persistence: &mut SqlitePersistence,
        login_name: &str,
        password: &str,
    ) -> Result<(String, AuthenticatedActor, UserData), AuthError> {
        let user: UserData = persistence
            .get_user_by_login(login_name)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| {
                warn!(login_name = %login_name, "Login attempt for unknown user");
                AuthError::AuthenticationFailed {
                    reason: String::from("Invalid login name or password"),
                }
            })?;

        let password_ok: bool = persistence
            .verify_password(password, &user.password_hash)
            .map_err(Self::map_persistence_error)?;
        if !password_ok {
            warn!(user_id = user.user_id, "Login attempt with wrong password");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Invalid login name or password"),
            });
        }

        if user.is_disabled {
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Account is disabled"),
            });
        }

        let session_token: String = Self::generate_session_token();

        let expires_at: String =
            Self::format_expiry(OffsetDateTime::now_utc() + Self::DEFAULT_SESSION_EXPIRATION)?;

        persistence
            .create_session(&session_token, user.user_id, &expires_at)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to create session: {e}"),
            })?;

        persistence
            .update_last_login(user.user_id)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to update last login: {e}"),
            })?;

        info!(user_id = user.user_id, role = %user.role, "User logged in");

        Ok((session_token, AuthenticatedActor::from_user(&user), user))
    }

    /// Validates a session token and returns the authenticated actor.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The persistence layer
    /// * `session_token` - The session token to validate
    ///
    /// # Returns
    ///
    /// A tuple of (`authenticated_actor`, `user_data`)
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid or expired, or the account
    /// is disabled.
    pub fn validate_session(
        persistence: &mut SqlitePersistence,
        session_token: &str,
    ) -> Result<(AuthenticatedActor, UserData), AuthError> {
        let session: SessionData = persistence
            .get_session_by_token(session_token)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("Invalid session token"),
            })?;

        let expires_at: OffsetDateTime = OffsetDateTime::parse(&session.expires_at, &Rfc3339)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to parse session expiration: {e}"),
            })?;

        if OffsetDateTime::now_utc() > expires_at {
            debug!(session_id = session.session_id, "Session expired");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Session expired"),
            });
        }

        let user: UserData = persistence
            .get_user_by_id(session.user_id)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("User not found"),
            })?;

        if user.is_disabled {
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Account is disabled"),
            });
        }

        persistence
            .update_session_activity(session.session_id)
            .map_err(Self::map_persistence_error)?;

        Ok((AuthenticatedActor::from_user(&user), user))
    }

    /// Logs out by deleting the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be deleted.
    pub fn logout(
        persistence: &mut SqlitePersistence,
        session_token: &str,
    ) -> Result<(), AuthError> {
        persistence
            .delete_session(session_token)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to delete session: {e}"),
            })?;

        Ok(())
    }

    fn format_expiry(expires_at: OffsetDateTime) -> Result<String, AuthError> {
        expires_at
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to format expiration time: {e}"),
            })
    }

    fn generate_session_token() -> String {
        let timestamp: i128 = OffsetDateTime::now_utc().unix_timestamp_nanos();
        format!(
            "session_{timestamp}_{:016x}{:016x}",
            rand::random::<u64>(),
            rand::random::<u64>()
        )
    }

    fn map_persistence_error(err: PersistenceError) -> AuthError {
        match err {
            PersistenceError::SessionNotFound(msg) => {
                AuthError::AuthenticationFailed { reason: msg }
            }
            _ => AuthError::AuthenticationFailed {
                reason: format!("Database error: {err}"),
            },
        }
    }
}
