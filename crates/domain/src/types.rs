// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The single role a user holds.
///
/// Role is an explicit attribute of the user record and is the only input
/// used for authorization decisions. Linked profile rows never imply a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff with full authority over catalog, availability and requests.
    Admin,
    /// Publishes slots and outings and moderates bookings on them.
    Instructor,
    /// Books availability and files requests for permit tracks.
    Student,
}

impl Role {
    /// Returns the string representation of the role.
    ///
    /// This is used for persistence and API serialization.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }
}

/// Checks that a user holds the role an operation requires.
///
/// # Errors
///
/// Returns `DomainError::RoleMismatch` if `actual` differs from `expected`.
pub fn ensure_role(user_id: i64, actual: Role, expected: Role) -> Result<(), DomainError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DomainError::RoleMismatch {
            user_id,
            expected,
            actual,
        })
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "instructor" => Ok(Self::Instructor),
            "student" => Ok(Self::Student),
            _ => Err(DomainError::InvalidRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Part of the day an outing covers, or a student prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Morning,
    Afternoon,
    Both,
}

impl Session {
    /// Returns the string representation of the session.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Both => "both",
        }
    }

    /// Derives a session from a free-text availability hint.
    ///
    /// The hint is matched on the letters `m` (morning) and `t` (afternoon,
    /// "tarde"). A hint mentioning both yields `Both`; an unrecognized hint
    /// defaults to `Morning`.
    ///
    /// # Arguments
    ///
    /// * `hint` - Free text such as "Mañana", "tarde" or "M/T"
    #[must_use]
    pub fn from_hint(hint: &str) -> Self {
        let lowered: String = hint.to_lowercase();
        let has_morning: bool = lowered.contains('m');
        let has_afternoon: bool = lowered.contains('t');
        match (has_morning, has_afternoon) {
            (true, true) => Self::Both,
            (false, true) => Self::Afternoon,
            (true, false) | (false, false) => Self::Morning,
        }
    }
}

impl FromStr for Session {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "both" => Ok(Self::Both),
            _ => Err(DomainError::InvalidSession(s.to_string())),
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Canonical numeric identifier.
    pub user_id: i64,
    /// Unique login name.
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    /// The user's authoritative role.
    pub role: Role,
    /// Disabled users cannot authenticate.
    pub is_disabled: bool,
}

impl User {
    /// Returns the user's display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    /// Returns true if this user holds the Admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Returns true if this user holds the Instructor role.
    #[must_use]
    pub const fn is_instructor(&self) -> bool {
        matches!(self.role, Role::Instructor)
    }

    /// Returns true if this user holds the Student role.
    #[must_use]
    pub const fn is_student(&self) -> bool {
        matches!(self.role, Role::Student)
    }
}

/// Instructor-specific data attached 1:1 to an instructor user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorProfile {
    /// The instructor's user ID.
    pub user_id: i64,
    /// Opaque permission map. Stored and returned, never interpreted.
    pub permissions: serde_json::Map<String, serde_json::Value>,
}

impl InstructorProfile {
    /// Creates an instructor profile from a JSON permission value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPermissions` if the value is not a JSON object.
    pub fn new(user_id: i64, permissions: serde_json::Value) -> Result<Self, DomainError> {
        match permissions {
            serde_json::Value::Object(map) => Ok(Self {
                user_id,
                permissions: map,
            }),
            serde_json::Value::Null => Ok(Self {
                user_id,
                permissions: serde_json::Map::new(),
            }),
            other => Err(DomainError::InvalidPermissions(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

/// Student-specific contact data attached 1:1 to a student user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    /// The student's user ID.
    pub user_id: i64,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// A geographic zone where outings take place.
#[derive(Debug, Clone)]
pub struct Zone {
    zone_id: i64,
    name: String,
}

impl Zone {
    /// Creates a zone with its canonical ID.
    #[must_use]
    pub const fn with_id(zone_id: i64, name: String) -> Self {
        Self { zone_id, name }
    }

    #[must_use]
    pub const fn zone_id(&self) -> i64 {
        self.zone_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `name` refers to this zone, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        self.zone_id == other.zone_id
    }
}

impl Eq for Zone {}
