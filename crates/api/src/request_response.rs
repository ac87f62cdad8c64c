// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request and response types for the API boundary.
//!
//! Timestamps travel as RFC 3339 strings and dates as `YYYY-MM-DD`.

use autocita_domain::{
    AvailabilityKind, BookingState, Permit, Phase, RequestState, Role, Session, User, Zone,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub user_id: i64,
    pub login_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub user_id: i64,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

// ============================================================================
// Users and registration
// ============================================================================

/// Open registration: account, student profile and first request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStudentRequest {
    pub login_name: String,
    pub password: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    /// `YYYY-MM-DD`.
    pub theory_exam_date: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStudentResponse {
    pub user_id: i64,
    pub login_name: String,
    pub request_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInstructorRequest {
    pub login_name: String,
    pub password: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Opaque permission map; must be a JSON object when present.
    #[serde(default)]
    pub permissions: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_disabled: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            login_name: user.login_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_disabled: user.is_disabled,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone_id: i64,
    pub name: String,
}

impl From<&Zone> for ZoneInfo {
    fn from(zone: &Zone) -> Self {
        Self {
            zone_id: zone.zone_id(),
            name: zone.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListZonesResponse {
    pub zones: Vec<ZoneInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePermitRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitInfo {
    pub permit_id: i64,
    pub code: String,
    pub description: String,
}

impl From<&Permit> for PermitInfo {
    fn from(permit: &Permit) -> Self {
        Self {
            permit_id: permit.permit_id,
            code: permit.code.clone(),
            description: permit.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePhaseRequest {
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub phase_id: i64,
    pub name: String,
    pub display_order: i32,
}

impl From<&Phase> for PhaseInfo {
    fn from(phase: &Phase) -> Self {
        Self {
            phase_id: phase.phase_id,
            name: phase.name.clone(),
            display_order: phase.display_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPermitPhaseRequest {
    pub phase_id: i64,
    pub order_index: i32,
}

/// One step of a permit's phase sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitPhaseInfo {
    pub permit_id: i64,
    pub phase_id: i64,
    pub phase_name: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPermitPhasesResponse {
    pub permit_id: i64,
    /// Phases in sequence order.
    pub phases: Vec<PermitPhaseInfo>,
}

// ============================================================================
// Availability
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    /// Required when an admin creates the slot on an instructor's behalf.
    pub instructor_id: Option<i64>,
    /// RFC 3339.
    pub start_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub slot_id: i64,
    pub instructor_id: i64,
    pub start_at: String,
    pub is_booked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSlotsResponse {
    pub slots: Vec<SlotInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOutingRequest {
    /// Required when an admin creates the outing on an instructor's behalf.
    pub instructor_id: Option<i64>,
    pub zone_id: i64,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub session: Session,
    /// Seats offered; defaults to three.
    pub quota: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutingInfo {
    pub outing_id: i64,
    pub instructor_id: i64,
    pub zone_id: i64,
    pub date: String,
    pub session: Session,
    pub quota: u32,
    pub remaining_seats: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOutingsResponse {
    pub outings: Vec<OutingInfo>,
}

/// Result of removing a slot or outing, including the bookings removed
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveAvailabilityResponse {
    pub kind: AvailabilityKind,
    pub id: i64,
    pub removed_bookings: Vec<BookingInfo>,
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRequest {
    /// Required when an admin books on a student's behalf.
    pub student_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInfo {
    pub booking_id: i64,
    pub student_id: i64,
    pub kind: AvailabilityKind,
    /// The slot or outing ID, according to `kind`.
    pub target_id: i64,
    pub instructor_id: i64,
    pub state: BookingState,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBookingsResponse {
    pub bookings: Vec<BookingInfo>,
}

// ============================================================================
// Requests and phases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestRequest {
    /// Required when an admin files on a student's behalf.
    pub student_id: Option<i64>,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    /// `YYYY-MM-DD`.
    pub theory_exam_date: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub request_id: i64,
    pub student_id: i64,
    pub zone_id: i64,
    pub permit_id: i64,
    pub preferred_session: Session,
    pub theory_exam_date: Option<String>,
    pub registered_at: String,
    pub notes: String,
    pub state: RequestState,
    pub current_phase_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequestsResponse {
    pub requests: Vec<RequestInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequestStateRequest {
    pub state: RequestState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAttemptRequest {
    pub phase_id: i64,
    pub passed: bool,
    /// RFC 3339; defaults to now.
    pub attempted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptInfo {
    pub attempt_id: i64,
    pub request_id: i64,
    pub phase_id: i64,
    pub attempted_at: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAttemptsResponse {
    pub request_id: i64,
    /// Newest first.
    pub attempts: Vec<AttemptInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePhaseRequest {
    pub phase_id: i64,
}
