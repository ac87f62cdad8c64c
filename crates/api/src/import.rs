// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bulk import of students from CSV.
//!
//! Expected headers: `name`, `phone`, `session`, `theory_date`, `zone`,
//! `notes`. Only `name`, `phone` and `zone` are required. Each imported row
//! becomes a student account (the phone number is both the login and the
//! initial password), a student profile, and a request for the chosen
//! permit. Rows whose login already exists are skipped, never updated.

use autocita_domain::{
    Permit, Role, Session, Zone, validate_login_name, validate_password, validate_person_name,
};
use autocita_persistence::{NewStudentRegistration, NewUser, PersistenceError, SqlitePersistence};
use csv::StringRecord;
use std::collections::HashMap;
use time::{Date, Month};
use tracing::{info, warn};

use crate::error::{ApiError, translate_persistence_error};

/// Outcome of one CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRowStatus {
    /// Account, profile and request were created.
    Imported,
    /// A user with this login already exists.
    Skipped,
    /// The row could not be imported.
    Invalid,
}

/// Result for a single CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRowResult {
    /// The row number (1-based, excluding header).
    pub row_number: usize,
    /// The login derived from the phone column, if present.
    pub login_name: Option<String>,
    pub status: ImportRowStatus,
    /// Why the row was skipped or rejected.
    pub messages: Vec<String>,
}

/// Result of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// The permit every imported request was filed for.
    pub permit_code: String,
    pub rows: Vec<ImportRowResult>,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub invalid_count: usize,
}

const REQUIRED_HEADERS: &[&str] = &["name", "phone", "zone"];

/// A parsed CSV row, ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StudentRow {
    first_name: String,
    last_name: String,
    phone: String,
    session: Session,
    theory_exam_date: Option<Date>,
    zone_name: String,
    notes: String,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

fn validate_headers(headers: &StringRecord) -> Result<HashMap<String, usize>, ApiError> {
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| (normalize_header(header), idx))
        .collect();

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !header_map.contains_key(*required))
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("csv"),
            message: format!("Missing required headers: {}", missing.join(", ")),
        });
    }

    Ok(header_map)
}

/// Parses a `DD/MM/YY` date.
///
/// Two-digit years 69 to 99 are 1900s and 00 to 68 are 2000s, the usual
/// POSIX pivot. Anything unparseable yields `None`.
#[must_use]
pub fn parse_short_date(value: &str) -> Option<Date> {
    let mut parts = value.trim().split('/');
    let day: u8 = parts.next()?.trim().parse().ok()?;
    let month: u8 = parts.next()?.trim().parse().ok()?;
    let year_part: &str = parts.next()?.trim();
    if parts.next().is_some() || year_part.len() != 2 {
        return None;
    }
    let short_year: i32 = year_part.parse().ok()?;
    let year: i32 = if short_year >= 69 {
        1900 + short_year
    } else {
        2000 + short_year
    };
    let month: Month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Splits a full name into first name (the first word) and last name (the
/// rest).
#[must_use]
pub fn split_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first: String = words.next().unwrap_or_default().to_string();
    let rest: String = words.collect::<Vec<&str>>().join(" ");
    (first, rest)
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<StudentRow, Vec<String>> {
    let get_field = |name: &str| -> String {
        header_map
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let mut errors: Vec<String> = Vec::new();

    let (first_name, last_name): (String, String) = split_name(&get_field("name"));
    if let Err(e) = validate_person_name(&first_name, &last_name) {
        errors.push(format!("name: {e}"));
    }

    let phone: String = get_field("phone");
    if let Err(e) = validate_login_name(&phone) {
        errors.push(format!("phone: {e}"));
    } else if let Err(e) = validate_password(&phone) {
        errors.push(format!("phone: {e}"));
    }

    let zone_name: String = get_field("zone");
    if zone_name.is_empty() {
        errors.push(String::from("zone: required field is missing or empty"));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(StudentRow {
        first_name,
        last_name,
        phone,
        session: Session::from_hint(&get_field("session")),
        theory_exam_date: parse_short_date(&get_field("theory_date")),
        zone_name,
        notes: get_field("notes"),
    })
}

fn resolve_permit(
    persistence: &mut SqlitePersistence,
    permit_code: Option<&str>,
) -> Result<Permit, ApiError> {
    let permit: Option<Permit> = match permit_code {
        Some(code) => persistence.get_permit_by_code(&code.trim().to_uppercase())?,
        None => persistence.list_permits()?.into_iter().next(),
    };
    permit.ok_or_else(|| ApiError::ResourceNotFound {
        resource_type: String::from("Permit"),
        message: permit_code.map_or_else(
            || String::from("No permits are defined"),
            |code| format!("Permit '{code}' does not exist"),
        ),
    })
}

/// Outcome of importing one parsed row.
enum RowOutcome {
    Imported { user_id: i64, request_id: i64 },
    Skipped(String),
    Rejected(String),
}

fn import_row(
    persistence: &mut SqlitePersistence,
    row: &StudentRow,
    permit: &Permit,
) -> Result<RowOutcome, ApiError> {
    if persistence.get_user_by_login(&row.phone)?.is_some() {
        return Ok(RowOutcome::Skipped(format!(
            "User with phone {} already exists",
            row.phone
        )));
    }

    let (zone, created): (Zone, bool) = persistence.get_or_create_zone(&row.zone_name)?;
    if created {
        info!(zone_id = zone.zone_id(), name = zone.name(), "Created zone during import");
    }

    let registration: NewStudentRegistration = NewStudentRegistration {
        user: NewUser {
            login_name: row.phone.clone(),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            password: row.phone.clone(),
            role: Role::Student,
        },
        phone: Some(row.phone.clone()),
        profile_notes: None,
        zone_id: zone.zone_id(),
        permit_id: permit.permit_id,
        preferred_session: row.session,
        theory_exam_date: row.theory_exam_date,
        request_notes: row.notes.clone(),
    };

    match persistence.register_student(&registration) {
        Ok((user_id, request_id)) => Ok(RowOutcome::Imported {
            user_id,
            request_id,
        }),
        Err(PersistenceError::DomainViolation(err)) => Ok(RowOutcome::Rejected(err.to_string())),
        Err(err) => Err(translate_persistence_error(err)),
    }
}

/// Imports students from CSV content.
///
/// Requests are filed for the permit with `permit_code`, or for the first
/// permit when no code is given. Row problems are reported per row and do
/// not stop the import.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `csv_content` - The raw CSV content
/// * `permit_code` - The permit to file requests for
///
/// # Errors
///
/// Returns an error if the headers are missing or malformed, if the permit
/// does not exist, or if the store fails.
pub fn import_students_csv(
    persistence: &mut SqlitePersistence,
    csv_content: &str,
    permit_code: Option<&str>,
) -> Result<ImportSummary, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_content.as_bytes());

    let headers: StringRecord = reader
        .headers()
        .map_err(|e| ApiError::InvalidInput {
            field: String::from("csv"),
            message: format!("Failed to read CSV headers: {e}"),
        })?
        .clone();
    let header_map: HashMap<String, usize> = validate_headers(&headers)?;

    let permit: Permit = resolve_permit(persistence, permit_code)?;
    info!(permit = %permit.code, "Importing students");

    let mut rows: Vec<ImportRowResult> = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let row_number: usize = idx + 1;

        let record: StringRecord = match result {
            Ok(record) => record,
            Err(e) => {
                rows.push(ImportRowResult {
                    row_number,
                    login_name: None,
                    status: ImportRowStatus::Invalid,
                    messages: vec![format!("CSV parse error: {e}")],
                });
                continue;
            }
        };

        let row: StudentRow = match parse_row(&record, &header_map) {
            Ok(row) => row,
            Err(messages) => {
                warn!(row_number, "Rejected CSV row");
                rows.push(ImportRowResult {
                    row_number,
                    login_name: None,
                    status: ImportRowStatus::Invalid,
                    messages,
                });
                continue;
            }
        };

        let (status, messages): (ImportRowStatus, Vec<String>) =
            match import_row(persistence, &row, &permit)? {
                RowOutcome::Imported {
                    user_id,
                    request_id,
                } => {
                    info!(row_number, user_id, request_id, "Imported student");
                    (ImportRowStatus::Imported, Vec::new())
                }
                RowOutcome::Skipped(message) => {
                    warn!(row_number, login_name = %row.phone, "{message}");
                    (ImportRowStatus::Skipped, vec![message])
                }
                RowOutcome::Rejected(message) => {
                    warn!(row_number, login_name = %row.phone, "{message}");
                    (ImportRowStatus::Invalid, vec![message])
                }
            };

        rows.push(ImportRowResult {
            row_number,
            login_name: Some(row.phone.to_lowercase()),
            status,
            messages,
        });
    }

    let count = |status: ImportRowStatus| rows.iter().filter(|r| r.status == status).count();
    let summary: ImportSummary = ImportSummary {
        permit_code: permit.code.clone(),
        imported_count: count(ImportRowStatus::Imported),
        skipped_count: count(ImportRowStatus::Skipped),
        invalid_count: count(ImportRowStatus::Invalid),
        rows,
    };

    info!(
        imported = summary.imported_count,
        skipped = summary.skipped_count,
        invalid = summary.invalid_count,
        "Import finished"
    );

    Ok(summary)
}
