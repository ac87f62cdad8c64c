// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Student requests for a permit track and their exam attempts.
//!
//! Requests are never deleted. Staff move them through an intake lifecycle
//! (requested, invited, confirmed, attended) independently of the exam phase
//! the student has reached.

use crate::error::DomainError;
use crate::types::Session;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{Date, OffsetDateTime};

/// Intake lifecycle of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Filed by or for the student; the default.
    Requested,
    /// Student has been invited to attend.
    Invited,
    /// Student confirmed the invitation.
    Confirmed,
    Rejected,
    /// Held until a place opens.
    Waitlisted,
    Attended,
    NotAttended,
}

impl RequestState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Invited => "invited",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Waitlisted => "waitlisted",
            Self::Attended => "attended",
            Self::NotAttended => "not_attended",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Attended | Self::NotAttended)
    }

    /// Returns true if staff may move a request from this state to `target`.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Requested => matches!(target, Self::Invited | Self::Rejected | Self::Waitlisted),
            Self::Waitlisted => matches!(target, Self::Invited | Self::Rejected),
            Self::Invited => matches!(target, Self::Confirmed | Self::Rejected),
            Self::Confirmed => matches!(target, Self::Attended | Self::NotAttended),
            Self::Rejected | Self::Attended | Self::NotAttended => false,
        }
    }

    /// Validates a transition from this state to `target`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the transition is not allowed.
    pub fn validate_transition(&self, target: Self) -> Result<(), DomainError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                entity: "request",
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl FromStr for RequestState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "invited" => Ok(Self::Invited),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "waitlisted" => Ok(Self::Waitlisted),
            "attended" => Ok(Self::Attended),
            "not_attended" => Ok(Self::NotAttended),
            _ => Err(DomainError::InvalidRequestState(s.to_string())),
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A student's registration for a permit track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_id: i64,
    /// The student's user ID.
    pub student_id: i64,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    /// Date the theory exam was passed, if known.
    pub theory_exam_date: Option<Date>,
    pub registered_at: OffsetDateTime,
    pub notes: String,
    pub state: RequestState,
    /// The exam phase reached so far.
    pub current_phase_id: Option<i64>,
}

/// One recorded try at a phase's exam. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAttempt {
    pub attempt_id: i64,
    pub request_id: i64,
    pub phase_id: i64,
    pub attempted_at: OffsetDateTime,
    pub passed: bool,
}
