// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use autocita_domain::{
    Booking, BookingState, BookingTarget, Outing, Role, Session, Slot,
};
use autocita_persistence::{NewUser, SqlitePersistence};
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

use crate::{
    AuthenticatedActor, BookRequest, CreateOutingRequest, CreateSlotRequest,
    RegisterStudentRequest, create_outing, create_slot, register_student,
};

pub const TEST_PASSWORD: &str = "password";

pub fn create_test_persistence() -> SqlitePersistence {
    SqlitePersistence::new_in_memory().expect("Failed to create in-memory persistence")
}

pub fn create_test_actor(user_id: i64, role: Role) -> AuthenticatedActor {
    AuthenticatedActor::new(user_id, format!("user-{user_id}"), role)
}

fn create_test_new_user(login_name: &str, role: Role) -> NewUser {
    NewUser {
        login_name: login_name.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::from(TEST_PASSWORD),
        role,
    }
}

pub fn create_test_admin(persistence: &mut SqlitePersistence) -> AuthenticatedActor {
    let user_id: i64 = persistence
        .create_user(&create_test_new_user("admin", Role::Admin))
        .unwrap();
    AuthenticatedActor::new(user_id, String::from("admin"), Role::Admin)
}

pub fn create_test_instructor(
    persistence: &mut SqlitePersistence,
    login_name: &str,
) -> AuthenticatedActor {
    let user_id: i64 = persistence
        .create_instructor(
            &create_test_new_user(login_name, Role::Instructor),
            &serde_json::Map::new(),
        )
        .unwrap();
    AuthenticatedActor::new(user_id, login_name.to_string(), Role::Instructor)
}

pub fn create_test_zone(persistence: &mut SqlitePersistence, name: &str) -> i64 {
    persistence.create_zone(name).unwrap().zone_id()
}

pub fn create_test_permit(persistence: &mut SqlitePersistence) -> i64 {
    persistence.create_permit("B", "Car").unwrap().permit_id
}

pub fn create_test_registration(
    login_name: &str,
    zone_id: i64,
    permit_id: i64,
) -> RegisterStudentRequest {
    RegisterStudentRequest {
        login_name: login_name.to_string(),
        password: String::from(TEST_PASSWORD),
        first_name: String::from("Test"),
        last_name: String::from("Student"),
        phone: Some(String::from("600000000")),
        zone_id,
        permit_id,
        preferred_session: Session::Morning,
        theory_exam_date: None,
        notes: String::new(),
    }
}

/// Registers a student whose first request is for `zone_id`.
pub fn create_test_student(
    persistence: &mut SqlitePersistence,
    login_name: &str,
    zone_id: i64,
    permit_id: i64,
) -> AuthenticatedActor {
    let response = register_student(
        persistence,
        &create_test_registration(login_name, zone_id, permit_id),
    )
    .unwrap();
    AuthenticatedActor::new(response.user_id, response.login_name, Role::Student)
}

/// Creates a student account with a profile but no request.
pub fn create_test_student_without_request(
    persistence: &mut SqlitePersistence,
    login_name: &str,
) -> AuthenticatedActor {
    let user_id: i64 = persistence
        .create_user(&create_test_new_user(login_name, Role::Student))
        .unwrap();
    persistence
        .create_student_profile(user_id, None, None)
        .unwrap();
    AuthenticatedActor::new(user_id, login_name.to_string(), Role::Student)
}

/// A day before every test outing.
pub const fn create_test_today() -> Date {
    date!(2030 - 01 - 01)
}

pub const fn create_test_outing_date() -> Date {
    date!(2030 - 06 - 01)
}

pub fn create_test_slot(
    persistence: &mut SqlitePersistence,
    instructor: &AuthenticatedActor,
    start_at: &str,
) -> i64 {
    create_slot(
        persistence,
        &CreateSlotRequest {
            instructor_id: None,
            start_at: start_at.to_string(),
        },
        instructor,
    )
    .unwrap()
    .slot_id
}

pub fn create_test_outing(
    persistence: &mut SqlitePersistence,
    instructor: &AuthenticatedActor,
    zone_id: i64,
    date: &str,
    quota: i64,
) -> i64 {
    create_outing(
        persistence,
        &CreateOutingRequest {
            instructor_id: None,
            zone_id,
            date: date.to_string(),
            session: Session::Morning,
            quota: Some(quota),
        },
        instructor,
    )
    .unwrap()
    .outing_id
}

pub const fn create_test_book_request() -> BookRequest {
    BookRequest { student_id: None }
}

// Pure values for policy tests.

const TEST_TIMESTAMP: OffsetDateTime = datetime!(2030-06-01 09:00 UTC);

pub const fn create_test_slot_value(slot_id: i64, instructor_id: i64, is_booked: bool) -> Slot {
    Slot {
        slot_id,
        instructor_id,
        start_at: TEST_TIMESTAMP,
        is_booked,
    }
}

pub const fn create_test_outing_value(outing_id: i64, instructor_id: i64, zone_id: i64) -> Outing {
    Outing {
        outing_id,
        instructor_id,
        zone_id,
        date: create_test_outing_date(),
        session: Session::Morning,
        quota: 3,
        active_bookings: 0,
    }
}

pub const fn create_test_booking_value(
    booking_id: i64,
    student_id: i64,
    instructor_id: i64,
    state: BookingState,
) -> Booking {
    Booking {
        booking_id,
        student_id,
        target: BookingTarget::Outing(1),
        instructor_id,
        state,
        created_at: TEST_TIMESTAMP,
        updated_at: TEST_TIMESTAMP,
    }
}
