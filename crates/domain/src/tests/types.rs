// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{DomainError, InstructorProfile, Role, Session, User, Zone, ensure_role};

fn create_test_user(role: Role) -> User {
    User {
        user_id: 1,
        login_name: String::from("600123123"),
        first_name: String::from("Lucia"),
        last_name: String::from("Martin Ruiz"),
        role,
        is_disabled: false,
    }
}

#[test]
fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!("instructor".parse::<Role>().unwrap(), Role::Instructor);
    assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
    assert!(matches!(
        "profesor".parse::<Role>(),
        Err(DomainError::InvalidRole(_))
    ));
}

#[test]
fn test_role_predicates_use_explicit_role() {
    let admin: User = create_test_user(Role::Admin);
    let instructor: User = create_test_user(Role::Instructor);
    let student: User = create_test_user(Role::Student);

    assert!(admin.is_admin() && !admin.is_instructor() && !admin.is_student());
    assert!(instructor.is_instructor() && !instructor.is_admin());
    assert!(student.is_student() && !student.is_instructor());
}

#[test]
fn test_full_name_omits_empty_last_name() {
    let mut user: User = create_test_user(Role::Student);
    assert_eq!(user.full_name(), "Lucia Martin Ruiz");

    user.last_name = String::new();
    assert_eq!(user.full_name(), "Lucia");
}

#[test]
fn test_session_from_hint() {
    assert_eq!(Session::from_hint("Mañana"), Session::Morning);
    assert_eq!(Session::from_hint("tarde"), Session::Afternoon);
    assert_eq!(Session::from_hint("M/T"), Session::Both);
    assert_eq!(Session::from_hint("mañana y tarde"), Session::Both);
    assert_eq!(Session::from_hint(""), Session::Morning);
    assert_eq!(Session::from_hint("cualquiera"), Session::Morning);
}

#[test]
fn test_session_parsing_rejects_unknown_values() {
    assert_eq!("afternoon".parse::<Session>().unwrap(), Session::Afternoon);
    assert!(matches!(
        "evening".parse::<Session>(),
        Err(DomainError::InvalidSession(_))
    ));
}

#[test]
fn test_instructor_profile_requires_object_permissions() {
    let profile: InstructorProfile =
        InstructorProfile::new(2, serde_json::json!({"B": true, "A2": false})).unwrap();
    assert_eq!(profile.permissions.len(), 2);

    let empty: InstructorProfile = InstructorProfile::new(2, serde_json::Value::Null).unwrap();
    assert!(empty.permissions.is_empty());

    let result = InstructorProfile::new(2, serde_json::json!(["B"]));
    assert!(matches!(result, Err(DomainError::InvalidPermissions(_))));
}

#[test]
fn test_zone_matches_name_case_insensitively() {
    let zone: Zone = Zone::with_id(1, String::from("Getafe"));
    assert!(zone.matches_name("getafe"));
    assert!(zone.matches_name("  GETAFE "));
    assert!(!zone.matches_name("Leganes"));
}

#[test]
fn test_ensure_role() {
    assert!(ensure_role(4, Role::Student, Role::Student).is_ok());

    let err: DomainError = ensure_role(4, Role::Admin, Role::Student).unwrap_err();
    assert_eq!(
        err,
        DomainError::RoleMismatch {
            user_id: 4,
            expected: Role::Student,
            actual: Role::Admin,
        }
    );
    assert_eq!(err.to_string(), "User 4 has role admin, expected student");
}
