// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary for the Autocita scheduling system.
//!
//! Operations here take an explicit acting identity, apply the
//! access-control policy, and then hand off to persistence, which enforces
//! the booking invariants inside a transaction. Errors from the lower
//! layers are translated into [`ApiError`] and never leak through.

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

mod auth;
mod error;
mod handlers;
mod import;
mod policy;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedActor, AuthenticationService, AuthorizationService};
pub use error::{ApiError, AuthError, translate_domain_error, translate_persistence_error};
pub use handlers::{
    add_permit_phase, advance_phase, book_outing, book_slot, cancel_booking, confirm_booking,
    create_instructor, create_outing, create_permit, create_phase, create_request, create_slot,
    create_zone, invite_request, list_attempts, list_available_outings, list_available_slots,
    list_bookings, list_permit_phases, list_requests, list_zones, login, logout, record_attempt,
    register_student, reject_booking, remove_outing, remove_slot, set_request_state, whoami,
};
pub use import::{
    ImportRowResult, ImportRowStatus, ImportSummary, import_students_csv, parse_short_date,
    split_name,
};
pub use policy::{
    authorize_booking_operation, can_mutate_booking, granting_booking_rule, is_admin,
    is_instructor, is_student, scope_bookings, scope_outings, scope_slots,
};
pub use request_response::{
    AddPermitPhaseRequest, AdvancePhaseRequest, AttemptInfo, BookRequest, BookingInfo,
    CreateInstructorRequest, CreateOutingRequest, CreatePermitRequest, CreatePhaseRequest,
    CreateRequestRequest, CreateSlotRequest, CreateZoneRequest, ListAttemptsResponse,
    ListBookingsResponse, ListOutingsResponse, ListPermitPhasesResponse, ListRequestsResponse,
    ListSlotsResponse, ListZonesResponse, LoginRequest, LoginResponse, OutingInfo, PermitInfo,
    PermitPhaseInfo, PhaseInfo, RecordAttemptRequest, RegisterStudentRequest,
    RegisterStudentResponse, RemoveAvailabilityResponse, RequestInfo, SetRequestStateRequest,
    SlotInfo, UserInfo, WhoAmIResponse, ZoneInfo,
};
