// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;

const MAX_NAME_LENGTH: usize = 150;
const MAX_PERMIT_CODE_LENGTH: usize = 2;
const MIN_PASSWORD_LENGTH: usize = 4;

/// Validates a person's first name.
///
/// Last names may be empty; the first name may not.
///
/// # Errors
///
/// Returns `DomainError::InvalidName` if the name is empty or too long.
pub fn validate_person_name(first_name: &str, last_name: &str) -> Result<(), DomainError> {
    if first_name.trim().is_empty() {
        return Err(DomainError::InvalidName(String::from(
            "First name cannot be empty",
        )));
    }

    if first_name.chars().count() > MAX_NAME_LENGTH || last_name.chars().count() > MAX_NAME_LENGTH
    {
        return Err(DomainError::InvalidName(format!(
            "Names cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Validates a login name.
///
/// # Errors
///
/// Returns `DomainError::InvalidLoginName` if the login is empty, too long,
/// or contains whitespace.
pub fn validate_login_name(login_name: &str) -> Result<(), DomainError> {
    if login_name.is_empty() {
        return Err(DomainError::InvalidLoginName(String::from(
            "Login name cannot be empty",
        )));
    }

    if login_name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::InvalidLoginName(format!(
            "Login name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    if login_name.chars().any(char::is_whitespace) {
        return Err(DomainError::InvalidLoginName(String::from(
            "Login name cannot contain whitespace",
        )));
    }

    Ok(())
}

/// Validates a plain-text password before hashing.
///
/// # Errors
///
/// Returns `DomainError::InvalidPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::InvalidPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Normalizes a zone name: trims it, uppercases the first character and
/// lowercases the rest.
#[must_use]
pub fn normalize_zone_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Validates a zone name.
///
/// # Errors
///
/// Returns `DomainError::InvalidZoneName` if the name is blank or too long.
pub fn validate_zone_name(name: &str) -> Result<(), DomainError> {
    let trimmed: &str = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidZoneName(String::from(
            "Zone name cannot be empty",
        )));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::InvalidZoneName(format!(
            "Zone name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validates a permit code such as "B" or "A2".
///
/// # Errors
///
/// Returns `DomainError::InvalidPermitCode` if the code is empty, longer than
/// two characters, or not alphanumeric.
pub fn validate_permit_code(code: &str) -> Result<(), DomainError> {
    if code.is_empty() || code.chars().count() > MAX_PERMIT_CODE_LENGTH {
        return Err(DomainError::InvalidPermitCode(format!(
            "Permit code must be 1 to {MAX_PERMIT_CODE_LENGTH} characters"
        )));
    }
    if !code.chars().all(char::is_alphanumeric) {
        return Err(DomainError::InvalidPermitCode(String::from(
            "Permit code must be alphanumeric",
        )));
    }
    Ok(())
}

/// Validates a phase name.
///
/// # Errors
///
/// Returns `DomainError::InvalidPhaseName` if the name is blank or too long.
pub fn validate_phase_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidPhaseName(String::from(
            "Phase name cannot be empty",
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::InvalidPhaseName(format!(
            "Phase name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}
