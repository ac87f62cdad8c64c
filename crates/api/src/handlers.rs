// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API operations.
//!
//! Every operation takes the acting identity explicitly and checks
//! authorization before it looks at availability or booking state, so a
//! refused caller learns nothing about whether the operation would have
//! succeeded.

use autocita_domain::{
    AvailabilityKind, Booking, BookingOperation, DEFAULT_OUTING_QUOTA, ExamAttempt, Outing,
    Permit, PermitPhase, Phase, Request, RequestState, Role, Slot, User, Zone,
    validate_login_name, validate_password, validate_person_name,
};
use autocita_persistence::{
    BookingFilter, NewRequest, NewStudentRegistration, NewUser, OutingFilter, SlotFilter,
    SqlitePersistence, UserData,
};
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use crate::auth::{AuthenticatedActor, AuthenticationService, AuthorizationService};
use crate::error::{ApiError, translate_domain_error};
use crate::policy::{authorize_booking_operation, scope_bookings, scope_outings, scope_slots};
use crate::request_response::{
    AddPermitPhaseRequest, AdvancePhaseRequest, AttemptInfo, BookRequest, BookingInfo,
    CreateInstructorRequest, CreateOutingRequest, CreatePermitRequest, CreatePhaseRequest,
    CreateRequestRequest, CreateSlotRequest, CreateZoneRequest, ListAttemptsResponse,
    ListBookingsResponse, ListOutingsResponse, ListPermitPhasesResponse, ListRequestsResponse,
    ListSlotsResponse, ListZonesResponse, LoginRequest, LoginResponse, OutingInfo, PermitInfo,
    PermitPhaseInfo, PhaseInfo, RecordAttemptRequest, RegisterStudentRequest,
    RegisterStudentResponse, RemoveAvailabilityResponse, RequestInfo, SetRequestStateRequest,
    SlotInfo, UserInfo, WhoAmIResponse, ZoneInfo,
};

// ============================================================================
// Parsing and formatting
// ============================================================================

fn parse_timestamp(field: &str, value: &str) -> Result<OffsetDateTime, ApiError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map(|ts| ts.to_offset(UtcOffset::UTC))
        .map_err(|e| ApiError::InvalidInput {
            field: String::from(field),
            message: format!("Expected an RFC 3339 timestamp, got '{value}': {e}"),
        })
}

fn parse_date(field: &str, value: &str) -> Result<Date, ApiError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| {
        ApiError::InvalidInput {
            field: String::from(field),
            message: format!("Expected a YYYY-MM-DD date, got '{value}': {e}"),
        }
    })
}

fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<Date>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| parse_date(field, v))
        .transpose()
}

fn format_timestamp(value: OffsetDateTime) -> Result<String, ApiError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal {
            message: format!("Failed to format timestamp: {e}"),
        })
}

fn format_date(value: Date) -> Result<String, ApiError> {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| ApiError::Internal {
            message: format!("Failed to format date: {e}"),
        })
}

fn slot_info(slot: &Slot) -> Result<SlotInfo, ApiError> {
    Ok(SlotInfo {
        slot_id: slot.slot_id,
        instructor_id: slot.instructor_id,
        start_at: format_timestamp(slot.start_at)?,
        is_booked: slot.is_booked,
    })
}

fn outing_info(outing: &Outing) -> Result<OutingInfo, ApiError> {
    Ok(OutingInfo {
        outing_id: outing.outing_id,
        instructor_id: outing.instructor_id,
        zone_id: outing.zone_id,
        date: format_date(outing.date)?,
        session: outing.session,
        quota: outing.quota,
        remaining_seats: outing.remaining_seats(),
    })
}

fn booking_info(booking: &Booking) -> Result<BookingInfo, ApiError> {
    Ok(BookingInfo {
        booking_id: booking.booking_id,
        student_id: booking.student_id,
        kind: booking.target.kind(),
        target_id: booking.target.id(),
        instructor_id: booking.instructor_id,
        state: booking.state,
        created_at: format_timestamp(booking.created_at)?,
        updated_at: format_timestamp(booking.updated_at)?,
    })
}

fn booking_infos(bookings: &[Booking]) -> Result<Vec<BookingInfo>, ApiError> {
    bookings.iter().map(booking_info).collect()
}

fn request_info(request: &Request) -> Result<RequestInfo, ApiError> {
    Ok(RequestInfo {
        request_id: request.request_id,
        student_id: request.student_id,
        zone_id: request.zone_id,
        permit_id: request.permit_id,
        preferred_session: request.preferred_session,
        theory_exam_date: request.theory_exam_date.map(format_date).transpose()?,
        registered_at: format_timestamp(request.registered_at)?,
        notes: request.notes.clone(),
        state: request.state,
        current_phase_id: request.current_phase_id,
    })
}

fn attempt_info(attempt: &ExamAttempt) -> Result<AttemptInfo, ApiError> {
    Ok(AttemptInfo {
        attempt_id: attempt.attempt_id,
        request_id: attempt.request_id,
        phase_id: attempt.phase_id,
        attempted_at: format_timestamp(attempt.attempted_at)?,
        passed: attempt.passed,
    })
}

// ============================================================================
// Lookups
// ============================================================================

fn require_user(persistence: &mut SqlitePersistence, user_id: i64) -> Result<User, ApiError> {
    persistence
        .get_user_by_id(user_id)?
        .as_ref()
        .map(UserData::to_user)
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("User"),
            message: format!("User {user_id} not found"),
        })
}

fn require_role(user: &User, role: Role, field: &str) -> Result<(), ApiError> {
    if user.role == role {
        Ok(())
    } else {
        Err(ApiError::InvalidInput {
            field: String::from(field),
            message: format!("User {} is not a {role}", user.user_id),
        })
    }
}

fn require_zone(persistence: &mut SqlitePersistence, zone_id: i64) -> Result<Zone, ApiError> {
    persistence
        .get_zone_by_id(zone_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Zone"),
            message: format!("Zone {zone_id} not found"),
        })
}

fn require_permit(persistence: &mut SqlitePersistence, permit_id: i64) -> Result<Permit, ApiError> {
    persistence
        .get_permit_by_id(permit_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Permit"),
            message: format!("Permit {permit_id} not found"),
        })
}

fn require_phase(persistence: &mut SqlitePersistence, phase_id: i64) -> Result<Phase, ApiError> {
    persistence
        .get_phase_by_id(phase_id)?
        .ok_or_else(|| phase_not_found(phase_id))
}

fn phase_not_found(phase_id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: String::from("Phase"),
        message: format!("Phase {phase_id} not found"),
    }
}

fn require_booking(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
) -> Result<Booking, ApiError> {
    persistence
        .get_booking(booking_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Booking"),
            message: format!("Booking {booking_id} not found"),
        })
}

fn require_request(
    persistence: &mut SqlitePersistence,
    request_id: i64,
) -> Result<Request, ApiError> {
    persistence
        .get_request(request_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Request"),
            message: format!("Request {request_id} not found"),
        })
}

fn validate_new_account(
    login_name: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), ApiError> {
    validate_login_name(login_name.trim()).map_err(translate_domain_error)?;
    validate_password(password).map_err(translate_domain_error)?;
    validate_person_name(first_name, last_name).map_err(translate_domain_error)?;
    Ok(())
}

// ============================================================================
// Authentication
// ============================================================================

/// Logs a user in and opens a session.
///
/// # Errors
///
/// Returns `AuthenticationFailed` for unknown users, wrong passwords, and
/// disabled accounts.
pub fn login(
    persistence: &mut SqlitePersistence,
    request: &LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let (session_token, actor, _user): (String, AuthenticatedActor, UserData) =
        AuthenticationService::login(persistence, &request.login_name, &request.password)?;

    Ok(LoginResponse {
        session_token,
        user_id: actor.user_id,
        login_name: actor.login_name,
        role: actor.role,
    })
}

/// Ends a session.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub fn logout(persistence: &mut SqlitePersistence, session_token: &str) -> Result<(), ApiError> {
    AuthenticationService::logout(persistence, session_token)?;
    Ok(())
}

/// Describes the acting user.
///
/// # Errors
///
/// Returns `ResourceNotFound` if the account no longer exists.
pub fn whoami(
    persistence: &mut SqlitePersistence,
    actor: &AuthenticatedActor,
) -> Result<WhoAmIResponse, ApiError> {
    let user: User = require_user(persistence, actor.user_id)?;
    Ok(WhoAmIResponse {
        user_id: user.user_id,
        login_name: user.login_name,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
    })
}

// ============================================================================
// Users and registration
// ============================================================================

/// Registers a new student with their first request.
///
/// Registration is open: no acting identity is required. The account,
/// student profile and request are created in one transaction.
///
/// # Errors
///
/// Returns `InvalidInput` for malformed fields, `ResourceNotFound` for an
/// unknown zone or permit, and `Conflict` if the login is taken.
pub fn register_student(
    persistence: &mut SqlitePersistence,
    request: &RegisterStudentRequest,
) -> Result<RegisterStudentResponse, ApiError> {
    validate_new_account(
        &request.login_name,
        &request.password,
        &request.first_name,
        &request.last_name,
    )?;
    let theory_exam_date: Option<Date> =
        parse_optional_date("theory_exam_date", request.theory_exam_date.as_deref())?;
    require_zone(persistence, request.zone_id)?;
    require_permit(persistence, request.permit_id)?;

    let registration: NewStudentRegistration = NewStudentRegistration {
        user: NewUser {
            login_name: request.login_name.clone(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            password: request.password.clone(),
            role: Role::Student,
        },
        phone: request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from),
        profile_notes: None,
        zone_id: request.zone_id,
        permit_id: request.permit_id,
        preferred_session: request.preferred_session,
        theory_exam_date,
        request_notes: request.notes.clone(),
    };

    let (user_id, request_id): (i64, i64) = persistence.register_student(&registration)?;

    info!(user_id, request_id, "Registered student");

    Ok(RegisterStudentResponse {
        user_id,
        login_name: request.login_name.trim().to_lowercase(),
        request_id,
    })
}

/// Creates an instructor account. Admin only.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins, `InvalidInput` for malformed fields
/// or a non-object permission map, and `Conflict` if the login is taken.
pub fn create_instructor(
    persistence: &mut SqlitePersistence,
    request: &CreateInstructorRequest,
    actor: &AuthenticatedActor,
) -> Result<UserInfo, ApiError> {
    AuthorizationService::require_admin(actor, "create_instructor")?;
    validate_new_account(
        &request.login_name,
        &request.password,
        &request.first_name,
        &request.last_name,
    )?;
    let permissions: serde_json::Map<String, serde_json::Value> = match &request.permissions {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            return Err(ApiError::InvalidInput {
                field: String::from("permissions"),
                message: format!("Expected a JSON object, got {other}"),
            });
        }
    };

    let new_user: NewUser = NewUser {
        login_name: request.login_name.clone(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        password: request.password.clone(),
        role: Role::Instructor,
    };
    let user_id: i64 = persistence.create_instructor(&new_user, &permissions)?;

    info!(user_id, created_by = actor.user_id, "Created instructor");

    let user: User = require_user(persistence, user_id)?;
    Ok(UserInfo::from(&user))
}

// ============================================================================
// Catalog
// ============================================================================

/// Creates a zone. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `InvalidInput`, or `Conflict` for an existing zone.
pub fn create_zone(
    persistence: &mut SqlitePersistence,
    request: &CreateZoneRequest,
    actor: &AuthenticatedActor,
) -> Result<ZoneInfo, ApiError> {
    AuthorizationService::require_admin(actor, "create_zone")?;
    let zone: Zone = persistence.create_zone(&request.name)?;
    Ok(ZoneInfo::from(&zone))
}

/// Lists zones. Any authenticated caller.
///
/// # Errors
///
/// Returns an error if the zones cannot be read.
pub fn list_zones(
    persistence: &mut SqlitePersistence,
    _actor: &AuthenticatedActor,
) -> Result<ListZonesResponse, ApiError> {
    let zones: Vec<Zone> = persistence.list_zones()?;
    Ok(ListZonesResponse {
        zones: zones.iter().map(ZoneInfo::from).collect(),
    })
}

/// Creates a permit. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `InvalidInput`, or `Conflict` for an existing code.
pub fn create_permit(
    persistence: &mut SqlitePersistence,
    request: &CreatePermitRequest,
    actor: &AuthenticatedActor,
) -> Result<PermitInfo, ApiError> {
    AuthorizationService::require_admin(actor, "create_permit")?;
    let permit: Permit = persistence.create_permit(&request.code, request.description.trim())?;
    Ok(PermitInfo::from(&permit))
}

/// Creates an exam phase. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `InvalidInput`, or `Conflict` for an existing name.
pub fn create_phase(
    persistence: &mut SqlitePersistence,
    request: &CreatePhaseRequest,
    actor: &AuthenticatedActor,
) -> Result<PhaseInfo, ApiError> {
    AuthorizationService::require_admin(actor, "create_phase")?;
    let phase: Phase = persistence.create_phase(&request.name, request.display_order)?;
    Ok(PhaseInfo::from(&phase))
}

/// Adds a phase to a permit's sequence at `order_index`. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `ResourceNotFound` for an unknown permit or phase,
/// or `Conflict` if the phase is already part of the permit.
pub fn add_permit_phase(
    persistence: &mut SqlitePersistence,
    permit_id: i64,
    request: &AddPermitPhaseRequest,
    actor: &AuthenticatedActor,
) -> Result<PermitPhaseInfo, ApiError> {
    AuthorizationService::require_admin(actor, "add_permit_phase")?;
    let permit_phase: PermitPhase =
        persistence.add_permit_phase(permit_id, request.phase_id, request.order_index)?;
    let phase_name: String = require_phase(persistence, permit_phase.phase_id)?.name;

    Ok(PermitPhaseInfo {
        permit_id: permit_phase.permit_id,
        phase_id: permit_phase.phase_id,
        phase_name,
        order_index: permit_phase.order_index,
    })
}

/// Lists a permit's phases in sequence order. Any authenticated caller.
///
/// # Errors
///
/// Returns `ResourceNotFound` for an unknown permit, or for a sequence entry
/// whose phase no longer exists.
pub fn list_permit_phases(
    persistence: &mut SqlitePersistence,
    permit_id: i64,
    _actor: &AuthenticatedActor,
) -> Result<ListPermitPhasesResponse, ApiError> {
    require_permit(persistence, permit_id)?;
    let names: HashMap<i64, String> = persistence
        .list_phases()?
        .into_iter()
        .map(|phase| (phase.phase_id, phase.name))
        .collect();
    let phases: Vec<PermitPhaseInfo> = persistence
        .list_permit_phases(permit_id)?
        .into_iter()
        .map(|pp| {
            let phase_name: String = names
                .get(&pp.phase_id)
                .cloned()
                .ok_or_else(|| phase_not_found(pp.phase_id))?;
            Ok(PermitPhaseInfo {
                permit_id: pp.permit_id,
                phase_id: pp.phase_id,
                phase_name,
                order_index: pp.order_index,
            })
        })
        .collect::<Result<Vec<PermitPhaseInfo>, ApiError>>()?;

    Ok(ListPermitPhasesResponse { permit_id, phases })
}

// ============================================================================
// Availability
// ============================================================================

/// Publishes a single lesson slot.
///
/// Instructors create slots for themselves; admins create them on behalf
/// of a named instructor.
///
/// # Errors
///
/// Returns `Forbidden` for students or for an instructor naming someone
/// else, `InvalidInput` for a malformed start time or a non-instructor
/// owner, and `duplicate_slot` if the instructor already has a slot at
/// that time.
pub fn create_slot(
    persistence: &mut SqlitePersistence,
    request: &CreateSlotRequest,
    actor: &AuthenticatedActor,
) -> Result<SlotInfo, ApiError> {
    let instructor_id: i64 = AuthorizationService::authorize_instructor_action(
        actor,
        request.instructor_id,
        "create_slot",
    )?;
    let start_at: OffsetDateTime = parse_timestamp("start_at", &request.start_at)?;
    let instructor: User = require_user(persistence, instructor_id)?;
    require_role(&instructor, Role::Instructor, "instructor_id")?;

    let slot: Slot = persistence.create_slot(instructor_id, start_at)?;
    info!(
        slot_id = slot.slot_id,
        instructor_id,
        created_by = actor.user_id,
        "Created slot"
    );
    slot_info(&slot)
}

/// Publishes a practical-exam outing with a seat quota.
///
/// # Errors
///
/// Returns `Forbidden` as for [`create_slot`], `InvalidInput` for a
/// malformed date or a quota below one, `ResourceNotFound` for an unknown
/// zone, and `duplicate_outing` if the instructor already has an outing
/// for that date and session.
pub fn create_outing(
    persistence: &mut SqlitePersistence,
    request: &CreateOutingRequest,
    actor: &AuthenticatedActor,
) -> Result<OutingInfo, ApiError> {
    let instructor_id: i64 = AuthorizationService::authorize_instructor_action(
        actor,
        request.instructor_id,
        "create_outing",
    )?;
    let date: Date = parse_date("date", &request.date)?;
    let instructor: User = require_user(persistence, instructor_id)?;
    require_role(&instructor, Role::Instructor, "instructor_id")?;

    let quota: i64 = request.quota.unwrap_or_else(|| i64::from(DEFAULT_OUTING_QUOTA));
    let outing: Outing = persistence.create_outing(
        instructor_id,
        request.zone_id,
        date,
        request.session,
        quota,
    )?;
    info!(
        outing_id = outing.outing_id,
        instructor_id,
        quota = outing.quota,
        created_by = actor.user_id,
        "Created outing"
    );
    outing_info(&outing)
}

/// Lists the slots the caller may see.
///
/// # Errors
///
/// Returns an error if the slots cannot be read.
pub fn list_available_slots(
    persistence: &mut SqlitePersistence,
    actor: &AuthenticatedActor,
) -> Result<ListSlotsResponse, ApiError> {
    let filter: SlotFilter = match actor.role {
        Role::Admin => SlotFilter::default(),
        Role::Instructor => SlotFilter {
            instructor_id: Some(actor.user_id),
            unbooked_only: false,
        },
        Role::Student => SlotFilter {
            instructor_id: None,
            unbooked_only: true,
        },
    };
    let slots: Vec<Slot> = scope_slots(actor, persistence.list_slots(filter)?);
    Ok(ListSlotsResponse {
        slots: slots.iter().map(slot_info).collect::<Result<_, _>>()?,
    })
}

/// Lists the outings the caller may see, never any dated before `today`.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `actor` - The caller
/// * `today` - The current date; earlier outings are excluded for every role
///
/// # Errors
///
/// Returns an error if the outings cannot be read.
pub fn list_available_outings(
    persistence: &mut SqlitePersistence,
    actor: &AuthenticatedActor,
    today: Date,
) -> Result<ListOutingsResponse, ApiError> {
    let latest_request_zone: Option<i64> = match actor.role {
        Role::Student => persistence
            .latest_request_for_student(actor.user_id)?
            .map(|request| request.zone_id),
        Role::Admin | Role::Instructor => None,
    };

    let filter: OutingFilter = OutingFilter {
        from_date: Some(today),
        instructor_id: match actor.role {
            Role::Instructor => Some(actor.user_id),
            Role::Admin | Role::Student => None,
        },
        zone_id: latest_request_zone,
    };
    let outings: Vec<Outing> = scope_outings(
        actor,
        persistence.list_outings(filter)?,
        latest_request_zone,
    );

    debug!(
        user_id = actor.user_id,
        count = outings.len(),
        "Listed available outings"
    );

    Ok(ListOutingsResponse {
        outings: outings.iter().map(outing_info).collect::<Result<_, _>>()?,
    })
}

/// Removes a slot and any booking on it. Admin or the owning instructor.
///
/// # Errors
///
/// Returns `ResourceNotFound` for an unknown slot and `Forbidden` for
/// anyone else.
pub fn remove_slot(
    persistence: &mut SqlitePersistence,
    slot_id: i64,
    actor: &AuthenticatedActor,
) -> Result<RemoveAvailabilityResponse, ApiError> {
    let slot: Slot = persistence
        .get_slot(slot_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Slot"),
            message: format!("Slot {slot_id} not found"),
        })?;
    AuthorizationService::authorize_instructor_action(
        actor,
        Some(slot.instructor_id),
        "remove_slot",
    )?;

    let (_, removed): (Slot, Vec<Booking>) = persistence.remove_slot(slot_id)?;
    info!(
        slot_id,
        removed_bookings = removed.len(),
        removed_by = actor.user_id,
        "Removed slot"
    );

    Ok(RemoveAvailabilityResponse {
        kind: AvailabilityKind::Slot,
        id: slot_id,
        removed_bookings: booking_infos(&removed)?,
    })
}

/// Removes an outing and its bookings. Admin or the owning instructor.
///
/// # Errors
///
/// Returns `ResourceNotFound` for an unknown outing and `Forbidden` for
/// anyone else.
pub fn remove_outing(
    persistence: &mut SqlitePersistence,
    outing_id: i64,
    actor: &AuthenticatedActor,
) -> Result<RemoveAvailabilityResponse, ApiError> {
    let outing: Outing = persistence
        .get_outing(outing_id)?
        .ok_or_else(|| ApiError::ResourceNotFound {
            resource_type: String::from("Outing"),
            message: format!("Outing {outing_id} not found"),
        })?;
    AuthorizationService::authorize_instructor_action(
        actor,
        Some(outing.instructor_id),
        "remove_outing",
    )?;

    let (_, removed): (Outing, Vec<Booking>) = persistence.remove_outing(outing_id)?;
    info!(
        outing_id,
        removed_bookings = removed.len(),
        removed_by = actor.user_id,
        "Removed outing"
    );

    Ok(RemoveAvailabilityResponse {
        kind: AvailabilityKind::Outing,
        id: outing_id,
        removed_bookings: booking_infos(&removed)?,
    })
}

// ============================================================================
// Bookings
// ============================================================================

/// Books a slot. The booking is confirmed immediately.
///
/// Students book for themselves; admins book on behalf of a named student.
///
/// # Errors
///
/// Returns `Forbidden` for instructors or for a student naming someone
/// else, `ResourceNotFound` for an unknown slot or student, and the rules
/// `self_booking` or `already_booked`.
pub fn book_slot(
    persistence: &mut SqlitePersistence,
    slot_id: i64,
    request: &BookRequest,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    let student_id: i64 =
        AuthorizationService::authorize_student_action(actor, request.student_id, "book_slot")?;

    let booking: Booking = persistence.book_slot(student_id, slot_id)?;
    info!(
        booking_id = booking.booking_id,
        slot_id,
        student_id,
        booked_by = actor.user_id,
        "Booked slot"
    );
    booking_info(&booking)
}

/// Books a seat on an outing. The booking starts pending.
///
/// # Errors
///
/// Returns `Forbidden` as for [`book_slot`], `ResourceNotFound` for an
/// unknown outing or student, and the rules `self_booking`,
/// `duplicate_booking` or `no_seats`, checked in that order.
pub fn book_outing(
    persistence: &mut SqlitePersistence,
    outing_id: i64,
    request: &BookRequest,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    let student_id: i64 =
        AuthorizationService::authorize_student_action(actor, request.student_id, "book_outing")?;

    let booking: Booking = persistence.book_outing(student_id, outing_id)?;
    info!(
        booking_id = booking.booking_id,
        outing_id,
        student_id,
        booked_by = actor.user_id,
        "Booked outing"
    );
    booking_info(&booking)
}

fn apply_booking_operation(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
    op: BookingOperation,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    let booking: Booking = require_booking(persistence, booking_id)?;
    let rule: &'static str = authorize_booking_operation(actor, &booking, op)?;
    debug!(
        booking_id,
        operation = op.as_str(),
        rule,
        "Booking operation authorized"
    );

    let updated: Booking = persistence.transition_booking(booking_id, op)?;
    info!(
        booking_id,
        from = %booking.state,
        to = %updated.state,
        actor = actor.user_id,
        "Applied booking operation"
    );
    booking_info(&updated)
}

/// Confirms a pending booking. Admin or the owning instructor.
///
/// # Errors
///
/// Returns `ResourceNotFound`, `Forbidden`, or `invalid_transition` when
/// the booking is not pending. `Forbidden` is reported before the state is
/// considered.
pub fn confirm_booking(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    apply_booking_operation(persistence, booking_id, BookingOperation::Confirm, actor)
}

/// Rejects a pending booking. Admin or the owning instructor.
///
/// # Errors
///
/// Returns `ResourceNotFound`, `Forbidden`, or `invalid_transition` when
/// the booking is not pending.
pub fn reject_booking(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    apply_booking_operation(persistence, booking_id, BookingOperation::Reject, actor)
}

/// Cancels a booking, deleting it and freeing its slot or seat.
///
/// Admins, the owning instructor, and the booking's student may cancel.
/// Cancelling is allowed whether the booking is pending, confirmed or
/// rejected. The returned booking reports the `cancelled` state.
///
/// # Errors
///
/// Returns `ResourceNotFound` or `Forbidden`.
pub fn cancel_booking(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
    actor: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    apply_booking_operation(persistence, booking_id, BookingOperation::Cancel, actor)
}

/// Lists the bookings the caller may see.
///
/// # Errors
///
/// Returns an error if the bookings cannot be read.
pub fn list_bookings(
    persistence: &mut SqlitePersistence,
    actor: &AuthenticatedActor,
) -> Result<ListBookingsResponse, ApiError> {
    let filter: BookingFilter = match actor.role {
        Role::Admin => BookingFilter::default(),
        Role::Instructor => BookingFilter {
            student_id: None,
            instructor_id: Some(actor.user_id),
        },
        Role::Student => BookingFilter {
            student_id: Some(actor.user_id),
            instructor_id: None,
        },
    };
    let bookings: Vec<Booking> = scope_bookings(actor, persistence.list_bookings(filter)?);
    Ok(ListBookingsResponse {
        bookings: booking_infos(&bookings)?,
    })
}

// ============================================================================
// Requests and phase progression
// ============================================================================

/// Files a request for a permit track.
///
/// Students file for themselves; admins file on behalf of a named student.
///
/// # Errors
///
/// Returns `Forbidden`, `ResourceNotFound` for an unknown student, zone or
/// permit, and `InvalidInput` for a malformed date or a non-student.
pub fn create_request(
    persistence: &mut SqlitePersistence,
    request: &CreateRequestRequest,
    actor: &AuthenticatedActor,
) -> Result<RequestInfo, ApiError> {
    let student_id: i64 = AuthorizationService::authorize_student_action(
        actor,
        request.student_id,
        "create_request",
    )?;
    let theory_exam_date: Option<Date> =
        parse_optional_date("theory_exam_date", request.theory_exam_date.as_deref())?;
    let student: User = require_user(persistence, student_id)?;
    require_role(&student, Role::Student, "student_id")?;
    require_zone(persistence, request.zone_id)?;
    require_permit(persistence, request.permit_id)?;

    let request_id: i64 = persistence.create_request(&NewRequest {
        student_id,
        zone_id: request.zone_id,
        permit_id: request.permit_id,
        preferred_session: request.preferred_session,
        theory_exam_date,
        notes: request.notes.clone(),
    })?;
    info!(request_id, student_id, filed_by = actor.user_id, "Created request");

    request_info(&require_request(persistence, request_id)?)
}

/// Lists requests: all of them for admins, their own for students.
///
/// # Errors
///
/// Returns `Forbidden` for instructors.
pub fn list_requests(
    persistence: &mut SqlitePersistence,
    actor: &AuthenticatedActor,
) -> Result<ListRequestsResponse, ApiError> {
    let student_filter: Option<i64> = match actor.role {
        Role::Admin => None,
        Role::Student => Some(actor.user_id),
        Role::Instructor => {
            return Err(ApiError::Forbidden {
                action: String::from("list_requests"),
                reason: String::from("requires admin or student"),
            });
        }
    };
    let requests: Vec<Request> = persistence.list_requests(student_filter)?;
    Ok(ListRequestsResponse {
        requests: requests.iter().map(request_info).collect::<Result<_, _>>()?,
    })
}

/// Moves a request through its intake lifecycle. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `ResourceNotFound`, or `invalid_transition`.
pub fn set_request_state(
    persistence: &mut SqlitePersistence,
    request_id: i64,
    request: &SetRequestStateRequest,
    actor: &AuthenticatedActor,
) -> Result<RequestInfo, ApiError> {
    AuthorizationService::require_admin(actor, "set_request_state")?;
    let updated: Request = persistence.set_request_state(request_id, request.state)?;
    info!(
        request_id,
        state = %updated.state,
        actor = actor.user_id,
        "Request state changed"
    );
    request_info(&updated)
}

/// Invites a requested or waitlisted student. Admin only.
///
/// # Errors
///
/// Returns `Forbidden`, `ResourceNotFound`, or `invalid_transition`.
pub fn invite_request(
    persistence: &mut SqlitePersistence,
    request_id: i64,
    actor: &AuthenticatedActor,
) -> Result<RequestInfo, ApiError> {
    set_request_state(
        persistence,
        request_id,
        &SetRequestStateRequest {
            state: RequestState::Invited,
        },
        actor,
    )
}

/// Records an exam attempt. Staff only. Never advances the request.
///
/// # Errors
///
/// Returns `Forbidden` for students, `InvalidInput` for a malformed
/// timestamp, and `ResourceNotFound` for an unknown request or phase.
pub fn record_attempt(
    persistence: &mut SqlitePersistence,
    request_id: i64,
    request: &RecordAttemptRequest,
    actor: &AuthenticatedActor,
) -> Result<AttemptInfo, ApiError> {
    AuthorizationService::require_staff(actor, "record_attempt")?;
    let attempted_at: OffsetDateTime = match request.attempted_at.as_deref() {
        Some(value) => parse_timestamp("attempted_at", value)?,
        None => OffsetDateTime::now_utc(),
    };

    let attempt: ExamAttempt =
        persistence.record_attempt(request_id, request.phase_id, attempted_at, request.passed)?;
    info!(
        attempt_id = attempt.attempt_id,
        request_id,
        phase_id = request.phase_id,
        passed = request.passed,
        "Recorded exam attempt"
    );
    attempt_info(&attempt)
}

/// Lists a request's exam attempts, newest first.
///
/// Admins and instructors see any request; students only their own.
///
/// # Errors
///
/// Returns `ResourceNotFound` or `Forbidden`.
pub fn list_attempts(
    persistence: &mut SqlitePersistence,
    request_id: i64,
    actor: &AuthenticatedActor,
) -> Result<ListAttemptsResponse, ApiError> {
    let request: Request = require_request(persistence, request_id)?;
    if actor.role == Role::Student && request.student_id != actor.user_id {
        return Err(ApiError::Forbidden {
            action: String::from("list_attempts"),
            reason: String::from("students may only view their own requests"),
        });
    }

    let attempts: Vec<ExamAttempt> = persistence.list_attempts(request_id)?;
    Ok(ListAttemptsResponse {
        request_id,
        attempts: attempts.iter().map(attempt_info).collect::<Result<_, _>>()?,
    })
}

/// Advances a request to the next phase of its permit. Admin only.
///
/// The target must be the first phase when the request has none yet, or
/// the immediate successor of its current phase.
///
/// # Errors
///
/// Returns `Forbidden`, `ResourceNotFound`, or `invalid_phase_order`.
pub fn advance_phase(
    persistence: &mut SqlitePersistence,
    request_id: i64,
    request: &AdvancePhaseRequest,
    actor: &AuthenticatedActor,
) -> Result<RequestInfo, ApiError> {
    AuthorizationService::require_admin(actor, "advance_phase")?;
    let updated: Request = persistence.advance_phase(request_id, request.phase_id)?;
    info!(
        request_id,
        phase_id = request.phase_id,
        actor = actor.user_id,
        "Advanced request phase"
    );
    request_info(&updated)
}
