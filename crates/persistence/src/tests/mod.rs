// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod availability_tests;
mod catalog_tests;

use autocita_domain::{Role, Session};
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

use crate::{NewRequest, NewUser, SqlitePersistence};

pub fn create_test_new_user(login_name: &str, role: Role) -> NewUser {
    NewUser {
        login_name: login_name.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::from("password"),
        role,
    }
}

pub fn create_test_admin(persistence: &mut SqlitePersistence) -> i64 {
    persistence
        .create_user(&create_test_new_user("admin", Role::Admin))
        .unwrap()
}

pub fn create_test_instructor(persistence: &mut SqlitePersistence, login_name: &str) -> i64 {
    persistence
        .create_instructor(
            &create_test_new_user(login_name, Role::Instructor),
            &serde_json::Map::new(),
        )
        .unwrap()
}

pub fn create_test_student(persistence: &mut SqlitePersistence, login_name: &str) -> i64 {
    let user_id: i64 = persistence
        .create_user(&create_test_new_user(login_name, Role::Student))
        .unwrap();
    persistence
        .create_student_profile(user_id, Some("600000000"), None)
        .unwrap();
    user_id
}

pub fn create_test_zone(persistence: &mut SqlitePersistence) -> i64 {
    persistence.create_zone("Centro").unwrap().zone_id()
}

/// Returns a date far enough ahead to count as upcoming.
pub const fn create_test_outing_date() -> Date {
    date!(2030 - 06 - 01)
}

pub const fn create_test_start_at() -> OffsetDateTime {
    datetime!(2030-06-01 09:00 UTC)
}

pub fn create_test_request(
    persistence: &mut SqlitePersistence,
    student_id: i64,
    zone_id: i64,
    permit_id: i64,
) -> i64 {
    persistence
        .create_request(&NewRequest {
            student_id,
            zone_id,
            permit_id,
            preferred_session: Session::Morning,
            theory_exam_date: None,
            notes: String::new(),
        })
        .unwrap()
}
