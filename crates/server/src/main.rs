// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod session;

use autocita_api::{
    AddPermitPhaseRequest, AdvancePhaseRequest, ApiError, AttemptInfo, BookRequest, BookingInfo,
    CreateInstructorRequest, CreateOutingRequest, CreatePermitRequest, CreatePhaseRequest,
    CreateRequestRequest, CreateSlotRequest, CreateZoneRequest, ImportRowStatus, ImportSummary,
    ListAttemptsResponse, ListBookingsResponse, ListOutingsResponse, ListPermitPhasesResponse,
    ListRequestsResponse, ListSlotsResponse, ListZonesResponse, LoginRequest, LoginResponse,
    OutingInfo, PermitInfo, PermitPhaseInfo, PhaseInfo, RecordAttemptRequest,
    RegisterStudentRequest, RegisterStudentResponse, RemoveAvailabilityResponse, RequestInfo,
    SetRequestStateRequest, SlotInfo, UserInfo, WhoAmIResponse, ZoneInfo, add_permit_phase,
    advance_phase, book_outing, book_slot, cancel_booking, confirm_booking, create_instructor,
    create_outing, create_permit, create_phase, create_request, create_slot, create_zone,
    import_students_csv, invite_request, list_attempts, list_available_outings,
    list_available_slots, list_bookings, list_permit_phases, list_requests, list_zones, login,
    logout, record_attempt, register_student, reject_booking, remove_outing, remove_slot,
    set_request_state, whoami,
};
use autocita_persistence::{DEFAULT_BUSY_TIMEOUT_MS, SqlitePersistence};
use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::session::{BearerToken, SessionUser};

/// Autocita Server - HTTP server for driving-school lesson and exam booking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind the server to
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    bind: IpAddr,

    /// How long a writer waits for the database lock, in milliseconds
    #[arg(long, default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    busy_timeout_ms: u32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import students from a CSV file and exit
    Import {
        /// Path to the CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Permit code to file requests for. Defaults to the first permit.
        #[arg(long)]
        permit: Option<String>,
    },
}

/// Application state shared across handlers.
///
/// One connection serves the whole process; handlers hold the lock only
/// for the duration of a single API call.
#[derive(Clone)]
struct AppState {
    persistence: Arc<Mutex<SqlitePersistence>>,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    error: bool,
    message: String,
    /// Stable identifier of the violated booking or phase rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuccessResponse {
    success: bool,
}

/// Rules that report a conflict with existing bookings or availability.
const CONFLICT_RULES: &[&str] = &[
    "duplicate_slot",
    "duplicate_outing",
    "duplicate_booking",
    "already_booked",
    "no_seats",
];

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    status: StatusCode,
    message: String,
    rule: Option<String>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
            rule: self.rule,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DomainRuleViolation { rule, .. }
                if CONFLICT_RULES.contains(&rule.as_str()) =>
            {
                StatusCode::CONFLICT
            }
            ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable { .. } => {
                warn!(error = %err, "Store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            rule: err.rule().map(String::from),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Handler for POST `/auth/login`.
async fn handle_login(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    info!(login_name = %req.login_name, "Handling login request");

    let mut persistence = app_state.persistence.lock().await;
    let response: LoginResponse = login(&mut persistence, &req)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/auth/logout`.
async fn handle_logout(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    BearerToken(token): BearerToken,
) -> Result<Json<SuccessResponse>, HttpError> {
    info!(user_id = actor.user_id, "Handling logout request");

    let mut persistence = app_state.persistence.lock().await;
    logout(&mut persistence, &token)?;
    drop(persistence);

    Ok(Json(SuccessResponse { success: true }))
}

/// Handler for GET `/auth/whoami`.
async fn handle_whoami(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<WhoAmIResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: WhoAmIResponse = whoami(&mut persistence, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Users and catalog
// ============================================================================

/// Handler for POST `/students/register`. No session required.
async fn handle_register_student(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<RegisterStudentRequest>,
) -> Result<Json<RegisterStudentResponse>, HttpError> {
    info!(login_name = %req.login_name, "Handling register_student request");

    let mut persistence = app_state.persistence.lock().await;
    let response: RegisterStudentResponse = register_student(&mut persistence, &req)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/instructors`.
async fn handle_create_instructor(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreateInstructorRequest>,
) -> Result<Json<UserInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        login_name = %req.login_name,
        "Handling create_instructor request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: UserInfo = create_instructor(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/zones`.
async fn handle_list_zones(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<ListZonesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListZonesResponse = list_zones(&mut persistence, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/zones`.
async fn handle_create_zone(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreateZoneRequest>,
) -> Result<Json<ZoneInfo>, HttpError> {
    info!(user_id = actor.user_id, name = %req.name, "Handling create_zone request");

    let mut persistence = app_state.persistence.lock().await;
    let response: ZoneInfo = create_zone(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/permits`.
async fn handle_create_permit(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreatePermitRequest>,
) -> Result<Json<PermitInfo>, HttpError> {
    info!(user_id = actor.user_id, code = %req.code, "Handling create_permit request");

    let mut persistence = app_state.persistence.lock().await;
    let response: PermitInfo = create_permit(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/phases`.
async fn handle_create_phase(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreatePhaseRequest>,
) -> Result<Json<PhaseInfo>, HttpError> {
    info!(user_id = actor.user_id, name = %req.name, "Handling create_phase request");

    let mut persistence = app_state.persistence.lock().await;
    let response: PhaseInfo = create_phase(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/permits/{permit_id}/phases`.
async fn handle_list_permit_phases(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(permit_id): Path<i64>,
) -> Result<Json<ListPermitPhasesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListPermitPhasesResponse =
        list_permit_phases(&mut persistence, permit_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/permits/{permit_id}/phases`.
async fn handle_add_permit_phase(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(permit_id): Path<i64>,
    Json(req): Json<AddPermitPhaseRequest>,
) -> Result<Json<PermitPhaseInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        permit_id,
        phase_id = req.phase_id,
        "Handling add_permit_phase request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: PermitPhaseInfo = add_permit_phase(&mut persistence, permit_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Availability
// ============================================================================

/// Handler for GET `/slots`.
async fn handle_list_slots(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<ListSlotsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListSlotsResponse = list_available_slots(&mut persistence, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/slots`.
async fn handle_create_slot(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreateSlotRequest>,
) -> Result<Json<SlotInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        start_at = %req.start_at,
        "Handling create_slot request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: SlotInfo = create_slot(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for DELETE `/slots/{slot_id}`.
async fn handle_remove_slot(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(slot_id): Path<i64>,
) -> Result<Json<RemoveAvailabilityResponse>, HttpError> {
    info!(user_id = actor.user_id, slot_id, "Handling remove_slot request");

    let mut persistence = app_state.persistence.lock().await;
    let response: RemoveAvailabilityResponse = remove_slot(&mut persistence, slot_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/slots/{slot_id}/book`.
async fn handle_book_slot(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(slot_id): Path<i64>,
    Json(req): Json<BookRequest>,
) -> Result<Json<BookingInfo>, HttpError> {
    info!(user_id = actor.user_id, slot_id, "Handling book_slot request");

    let mut persistence = app_state.persistence.lock().await;
    let response: BookingInfo = book_slot(&mut persistence, slot_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/outings`.
///
/// Outings dated before today (UTC) are never listed.
async fn handle_list_outings(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<ListOutingsResponse>, HttpError> {
    let today = OffsetDateTime::now_utc().date();

    let mut persistence = app_state.persistence.lock().await;
    let response: ListOutingsResponse = list_available_outings(&mut persistence, &actor, today)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/outings`.
async fn handle_create_outing(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreateOutingRequest>,
) -> Result<Json<OutingInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        zone_id = req.zone_id,
        date = %req.date,
        "Handling create_outing request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: OutingInfo = create_outing(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for DELETE `/outings/{outing_id}`.
async fn handle_remove_outing(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(outing_id): Path<i64>,
) -> Result<Json<RemoveAvailabilityResponse>, HttpError> {
    info!(user_id = actor.user_id, outing_id, "Handling remove_outing request");

    let mut persistence = app_state.persistence.lock().await;
    let response: RemoveAvailabilityResponse =
        remove_outing(&mut persistence, outing_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/outings/{outing_id}/book`.
async fn handle_book_outing(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(outing_id): Path<i64>,
    Json(req): Json<BookRequest>,
) -> Result<Json<BookingInfo>, HttpError> {
    info!(user_id = actor.user_id, outing_id, "Handling book_outing request");

    let mut persistence = app_state.persistence.lock().await;
    let response: BookingInfo = book_outing(&mut persistence, outing_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Bookings
// ============================================================================

/// Handler for GET `/bookings`.
async fn handle_list_bookings(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<ListBookingsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListBookingsResponse = list_bookings(&mut persistence, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/bookings/{booking_id}/confirm`.
async fn handle_confirm_booking(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingInfo>, HttpError> {
    info!(user_id = actor.user_id, booking_id, "Handling confirm_booking request");

    let mut persistence = app_state.persistence.lock().await;
    let response: BookingInfo = confirm_booking(&mut persistence, booking_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/bookings/{booking_id}/reject`.
async fn handle_reject_booking(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingInfo>, HttpError> {
    info!(user_id = actor.user_id, booking_id, "Handling reject_booking request");

    let mut persistence = app_state.persistence.lock().await;
    let response: BookingInfo = reject_booking(&mut persistence, booking_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for DELETE `/bookings/{booking_id}`.
async fn handle_cancel_booking(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingInfo>, HttpError> {
    info!(user_id = actor.user_id, booking_id, "Handling cancel_booking request");

    let mut persistence = app_state.persistence.lock().await;
    let response: BookingInfo = cancel_booking(&mut persistence, booking_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Requests and phases
// ============================================================================

/// Handler for GET `/requests`.
async fn handle_list_requests(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
) -> Result<Json<ListRequestsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListRequestsResponse = list_requests(&mut persistence, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/requests`.
async fn handle_create_request(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Json(req): Json<CreateRequestRequest>,
) -> Result<Json<RequestInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        permit_id = req.permit_id,
        "Handling create_request request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: RequestInfo = create_request(&mut persistence, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/requests/{request_id}/state`.
async fn handle_set_request_state(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(request_id): Path<i64>,
    Json(req): Json<SetRequestStateRequest>,
) -> Result<Json<RequestInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        request_id,
        state = %req.state,
        "Handling set_request_state request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: RequestInfo = set_request_state(&mut persistence, request_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/requests/{request_id}/invite`.
async fn handle_invite_request(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(request_id): Path<i64>,
) -> Result<Json<RequestInfo>, HttpError> {
    info!(user_id = actor.user_id, request_id, "Handling invite_request request");

    let mut persistence = app_state.persistence.lock().await;
    let response: RequestInfo = invite_request(&mut persistence, request_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/requests/{request_id}/attempts`.
async fn handle_list_attempts(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(request_id): Path<i64>,
) -> Result<Json<ListAttemptsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListAttemptsResponse = list_attempts(&mut persistence, request_id, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/requests/{request_id}/attempts`.
async fn handle_record_attempt(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(request_id): Path<i64>,
    Json(req): Json<RecordAttemptRequest>,
) -> Result<Json<AttemptInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        request_id,
        phase_id = req.phase_id,
        passed = req.passed,
        "Handling record_attempt request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: AttemptInfo = record_attempt(&mut persistence, request_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/requests/{request_id}/advance`.
async fn handle_advance_phase(
    AxumState(app_state): AxumState<AppState>,
    SessionUser(actor, _): SessionUser,
    Path(request_id): Path<i64>,
    Json(req): Json<AdvancePhaseRequest>,
) -> Result<Json<RequestInfo>, HttpError> {
    info!(
        user_id = actor.user_id,
        request_id,
        phase_id = req.phase_id,
        "Handling advance_phase request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: RequestInfo = advance_phase(&mut persistence, request_id, &req, &actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/whoami", get(handle_whoami))
        .route("/students/register", post(handle_register_student))
        .route("/instructors", post(handle_create_instructor))
        .route("/zones", get(handle_list_zones).post(handle_create_zone))
        .route("/permits", post(handle_create_permit))
        .route(
            "/permits/{permit_id}/phases",
            get(handle_list_permit_phases).post(handle_add_permit_phase),
        )
        .route("/phases", post(handle_create_phase))
        .route("/slots", get(handle_list_slots).post(handle_create_slot))
        .route("/slots/{slot_id}", delete(handle_remove_slot))
        .route("/slots/{slot_id}/book", post(handle_book_slot))
        .route("/outings", get(handle_list_outings).post(handle_create_outing))
        .route("/outings/{outing_id}", delete(handle_remove_outing))
        .route("/outings/{outing_id}/book", post(handle_book_outing))
        .route("/bookings", get(handle_list_bookings))
        .route("/bookings/{booking_id}", delete(handle_cancel_booking))
        .route("/bookings/{booking_id}/confirm", post(handle_confirm_booking))
        .route("/bookings/{booking_id}/reject", post(handle_reject_booking))
        .route(
            "/requests",
            get(handle_list_requests).post(handle_create_request),
        )
        .route("/requests/{request_id}/state", post(handle_set_request_state))
        .route("/requests/{request_id}/invite", post(handle_invite_request))
        .route(
            "/requests/{request_id}/attempts",
            get(handle_list_attempts).post(handle_record_attempt),
        )
        .route("/requests/{request_id}/advance", post(handle_advance_phase))
        .with_state(app_state)
}

/// Runs the CSV import against `persistence` and logs the per-row outcome.
fn run_import(
    persistence: &mut SqlitePersistence,
    csv_path: &std::path::Path,
    permit_code: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content: String = std::fs::read_to_string(csv_path)?;
    let summary: ImportSummary = import_students_csv(persistence, &content, permit_code)?;

    for row in &summary.rows {
        if row.status != ImportRowStatus::Imported {
            warn!(
                row_number = row.row_number,
                login_name = ?row.login_name,
                status = ?row.status,
                messages = ?row.messages,
                "Row not imported"
            );
        }
    }

    info!(
        permit = %summary.permit_code,
        imported = summary.imported_count,
        skipped = summary.skipped_count,
        invalid = summary.invalid_count,
        "CSV import complete"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Autocita Server");

    let mut persistence: SqlitePersistence = if let Some(db_path) = &args.database {
        info!(path = %db_path.display(), "Using file-based database");
        SqlitePersistence::new_with_file_and_timeout(db_path, args.busy_timeout_ms)?
    } else {
        info!("Using in-memory database");
        SqlitePersistence::new_in_memory()?
    };

    if let Some(Command::Import { csv, permit }) = &args.command {
        if args.database.is_none() {
            return Err("import requires --database".into());
        }
        return run_import(&mut persistence, csv, permit.as_deref());
    }

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
    };

    let app: Router = build_router(app_state);

    let addr: SocketAddr = SocketAddr::new(args.bind, args.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocita_domain::Role;
    use autocita_persistence::NewUser;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const TEST_PASSWORD: &str = "password";
    const FUTURE_DATE: &str = "2099-06-01";

    /// Helper to create test app state with in-memory persistence.
    fn create_test_app_state() -> AppState {
        let persistence: SqlitePersistence =
            SqlitePersistence::new_in_memory().expect("Failed to create in-memory persistence");
        AppState {
            persistence: Arc::new(Mutex::new(persistence)),
        }
    }

    async fn create_test_admin(app_state: &AppState) {
        let mut persistence = app_state.persistence.lock().await;
        persistence
            .create_user(&NewUser {
                login_name: String::from("admin"),
                first_name: String::from("Admin"),
                last_name: String::new(),
                password: String::from(TEST_PASSWORD),
                role: Role::Admin,
            })
            .unwrap();
    }

    /// Sends one request and returns the status and JSON body.
    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (HttpStatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status: HttpStatusCode = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap()
        };
        (status, value)
    }

    async fn login_as(app: &Router, login_name: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login_name": login_name, "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK, "{body}");
        body["session_token"].as_str().unwrap().to_string()
    }

    struct Fixture {
        app: Router,
        admin: String,
        instructor: String,
        instructor_id: i64,
        zone_id: i64,
        permit_id: i64,
    }

    /// Admin, one instructor, one zone and permit "B".
    async fn create_test_fixture() -> Fixture {
        let app_state: AppState = create_test_app_state();
        create_test_admin(&app_state).await;
        let app: Router = build_router(app_state);
        let admin: String = login_as(&app, "admin").await;

        let (_, zone) =
            send(&app, "POST", "/zones", Some(&admin), Some(json!({ "name": "centro" }))).await;
        let (_, permit) = send(
            &app,
            "POST",
            "/permits",
            Some(&admin),
            Some(json!({ "code": "B", "description": "Car" })),
        )
        .await;
        let (status, instructor) = send(
            &app,
            "POST",
            "/instructors",
            Some(&admin),
            Some(json!({
                "login_name": "ana",
                "password": TEST_PASSWORD,
                "first_name": "Ana",
                "last_name": "Ruiz",
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK, "{instructor}");
        let instructor_token: String = login_as(&app, "ana").await;

        Fixture {
            app,
            admin,
            instructor: instructor_token,
            instructor_id: instructor["user_id"].as_i64().unwrap(),
            zone_id: zone["zone_id"].as_i64().unwrap(),
            permit_id: permit["permit_id"].as_i64().unwrap(),
        }
    }

    async fn register_and_login(fixture: &Fixture, login_name: &str) -> String {
        let (status, body) = send(
            &fixture.app,
            "POST",
            "/students/register",
            None,
            Some(json!({
                "login_name": login_name,
                "password": TEST_PASSWORD,
                "first_name": "Student",
                "zone_id": fixture.zone_id,
                "permit_id": fixture.permit_id,
                "preferred_session": "morning",
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK, "{body}");
        login_as(&fixture.app, login_name).await
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app: Router = build_router(create_test_app_state());

        let (status, body) = send(&app, "GET", "/slots", None, None).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app_state: AppState = create_test_app_state();
        create_test_admin(&app_state).await;
        let app: Router = build_router(app_state);

        let (status, _) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login_name": "admin", "password": "wrong-password" })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let fixture: Fixture = create_test_fixture().await;

        let (status, me) =
            send(&fixture.app, "GET", "/auth/whoami", Some(&fixture.admin), None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(me["role"], "admin");

        let (status, _) =
            send(&fixture.app, "POST", "/auth/logout", Some(&fixture.admin), None).await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, _) =
            send(&fixture.app, "GET", "/auth/whoami", Some(&fixture.admin), None).await;
        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_outing_booking_flow_maps_statuses() {
        let fixture: Fixture = create_test_fixture().await;
        let first: String = register_and_login(&fixture, "maria").await;
        let second: String = register_and_login(&fixture, "juan").await;

        let (status, outing) = send(
            &fixture.app,
            "POST",
            "/outings",
            Some(&fixture.instructor),
            Some(json!({
                "zone_id": fixture.zone_id,
                "date": FUTURE_DATE,
                "session": "morning",
                "quota": 1,
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK, "{outing}");
        assert_eq!(outing["instructor_id"], fixture.instructor_id);
        let outing_id: i64 = outing["outing_id"].as_i64().unwrap();

        let (_, listed) = send(&fixture.app, "GET", "/outings", Some(&first), None).await;
        assert_eq!(listed["outings"].as_array().unwrap().len(), 1);

        let book_uri: String = format!("/outings/{outing_id}/book");
        let (status, booking) =
            send(&fixture.app, "POST", &book_uri, Some(&first), Some(json!({}))).await;
        assert_eq!(status, HttpStatusCode::OK, "{booking}");
        assert_eq!(booking["state"], "pending");
        let booking_id: i64 = booking["booking_id"].as_i64().unwrap();

        let (status, body) =
            send(&fixture.app, "POST", &book_uri, Some(&second), Some(json!({}))).await;
        assert_eq!(status, HttpStatusCode::CONFLICT);
        assert_eq!(body["rule"], "no_seats");

        let confirm_uri: String = format!("/bookings/{booking_id}/confirm");
        let (status, _) = send(&fixture.app, "POST", &confirm_uri, Some(&first), None).await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, confirmed) =
            send(&fixture.app, "POST", &confirm_uri, Some(&fixture.instructor), None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(confirmed["state"], "confirmed");

        let (status, body) =
            send(&fixture.app, "POST", &confirm_uri, Some(&fixture.instructor), None).await;
        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rule"], "invalid_transition");

        let cancel_uri: String = format!("/bookings/{booking_id}");
        let (status, cancelled) =
            send(&fixture.app, "DELETE", &cancel_uri, Some(&first), None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(cancelled["state"], "cancelled");

        let (status, _) = send(&fixture.app, "DELETE", &cancel_uri, Some(&first), None).await;
        assert_eq!(status, HttpStatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slot_double_booking_conflicts() {
        let fixture: Fixture = create_test_fixture().await;
        let first: String = register_and_login(&fixture, "maria").await;
        let second: String = register_and_login(&fixture, "juan").await;

        let (_, slot) = send(
            &fixture.app,
            "POST",
            "/slots",
            Some(&fixture.instructor),
            Some(json!({ "start_at": format!("{FUTURE_DATE}T09:00:00Z") })),
        )
        .await;
        let book_uri: String = format!("/slots/{}/book", slot["slot_id"]);

        let (status, booking) =
            send(&fixture.app, "POST", &book_uri, Some(&first), Some(json!({}))).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(booking["state"], "confirmed");

        let (status, body) =
            send(&fixture.app, "POST", &book_uri, Some(&second), Some(json!({}))).await;
        assert_eq!(status, HttpStatusCode::CONFLICT);
        assert_eq!(body["rule"], "already_booked");

        let (_, listed) = send(&fixture.app, "GET", "/slots", Some(&second), None).await;
        assert!(listed["slots"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_start_time_is_bad_request() {
        let fixture: Fixture = create_test_fixture().await;

        let (status, body) = send(
            &fixture.app,
            "POST",
            "/slots",
            Some(&fixture.instructor),
            Some(json!({ "start_at": "next tuesday" })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn test_self_booking_is_unprocessable() {
        let fixture: Fixture = create_test_fixture().await;
        let (_, slot) = send(
            &fixture.app,
            "POST",
            "/slots",
            Some(&fixture.instructor),
            Some(json!({ "start_at": format!("{FUTURE_DATE}T09:00:00Z") })),
        )
        .await;

        let (status, body) = send(
            &fixture.app,
            "POST",
            &format!("/slots/{}/book", slot["slot_id"]),
            Some(&fixture.admin),
            Some(json!({ "student_id": fixture.instructor_id })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rule"], "self_booking");
    }

    #[tokio::test]
    async fn test_instructor_cannot_list_requests() {
        let fixture: Fixture = create_test_fixture().await;

        let (status, _) =
            send(&fixture.app, "GET", "/requests", Some(&fixture.instructor), None).await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, body) =
            send(&fixture.app, "GET", "/requests", Some(&fixture.admin), None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert!(body["requests"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_phase_advance_out_of_order_is_unprocessable() {
        let fixture: Fixture = create_test_fixture().await;
        let student: String = register_and_login(&fixture, "maria").await;

        let mut phase_ids: Vec<i64> = Vec::new();
        for (order, name) in [(1, "Theory"), (2, "Maneuvering")] {
            let (_, phase) = send(
                &fixture.app,
                "POST",
                "/phases",
                Some(&fixture.admin),
                Some(json!({ "name": name, "display_order": order })),
            )
            .await;
            let phase_id: i64 = phase["phase_id"].as_i64().unwrap();
            let (status, _) = send(
                &fixture.app,
                "POST",
                &format!("/permits/{}/phases", fixture.permit_id),
                Some(&fixture.admin),
                Some(json!({ "phase_id": phase_id, "order_index": order })),
            )
            .await;
            assert_eq!(status, HttpStatusCode::OK);
            phase_ids.push(phase_id);
        }

        let (_, requests) = send(&fixture.app, "GET", "/requests", Some(&student), None).await;
        let request_id: i64 = requests["requests"][0]["request_id"].as_i64().unwrap();
        let advance_uri: String = format!("/requests/{request_id}/advance");

        let (status, body) = send(
            &fixture.app,
            "POST",
            &advance_uri,
            Some(&fixture.admin),
            Some(json!({ "phase_id": phase_ids[1] })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rule"], "invalid_phase_order");

        let (status, advanced) = send(
            &fixture.app,
            "POST",
            &advance_uri,
            Some(&fixture.admin),
            Some(json!({ "phase_id": phase_ids[0] })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(advanced["current_phase_id"], phase_ids[0]);
    }

    #[tokio::test]
    async fn test_duplicate_zone_conflicts() {
        let fixture: Fixture = create_test_fixture().await;

        let (status, _) = send(
            &fixture.app,
            "POST",
            "/zones",
            Some(&fixture.admin),
            Some(json!({ "name": "CENTRO" })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::CONFLICT);
    }

    #[test]
    fn test_rule_status_mapping() {
        let no_seats: HttpError = HttpError::from(ApiError::DomainRuleViolation {
            rule: String::from("no_seats"),
            message: String::from("full"),
        });
        assert_eq!(no_seats.status, StatusCode::CONFLICT);
        assert_eq!(no_seats.rule.as_deref(), Some("no_seats"));

        let transition: HttpError = HttpError::from(ApiError::DomainRuleViolation {
            rule: String::from("invalid_transition"),
            message: String::from("nope"),
        });
        assert_eq!(transition.status, StatusCode::UNPROCESSABLE_ENTITY);

        let busy: HttpError = HttpError::from(ApiError::Unavailable {
            message: String::from("locked"),
        });
        assert_eq!(busy.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(busy.rule.is_none());
    }
}
