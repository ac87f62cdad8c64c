// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use autocita_domain::{Role, Session, User};
use serde::{Deserialize, Serialize};
use time::Date;

/// Stored user account, including credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub user_id: i64,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_disabled: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl UserData {
    /// Returns the domain view of this account, without credentials.
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            user_id: self.user_id,
            login_name: self.login_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            is_disabled: self.is_disabled,
        }
    }
}

/// Stored login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub session_id: i64,
    pub session_token: String,
    pub user_id: i64,
    pub created_at: String,
    pub last_activity_at: String,
    pub expires_at: String,
}

/// Input for a new user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    /// Plain-text password; hashed before it is stored.
    pub password: String,
    pub role: Role,
}

/// Input for a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub student_id: i64,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    pub theory_exam_date: Option<Date>,
    pub notes: String,
}

/// Input for registering a student: account, profile and first request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudentRegistration {
    pub user: NewUser,
    pub phone: Option<String>,
    pub profile_notes: Option<String>,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    pub theory_exam_date: Option<Date>,
    pub request_notes: String,
}
