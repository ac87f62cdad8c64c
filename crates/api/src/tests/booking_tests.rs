// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use autocita_domain::{AvailabilityKind, BookingState};
use autocita_persistence::SqlitePersistence;

use crate::tests::helpers::{
    create_test_admin, create_test_book_request, create_test_instructor, create_test_outing,
    create_test_permit, create_test_persistence, create_test_slot, create_test_student,
    create_test_today, create_test_zone,
};
use crate::{
    ApiError, AuthenticatedActor, BookRequest, BookingInfo, book_outing, book_slot,
    cancel_booking, confirm_booking, list_available_outings, list_available_slots,
    list_bookings, reject_booking,
};

struct World {
    persistence: SqlitePersistence,
    admin: AuthenticatedActor,
    instructor: AuthenticatedActor,
    other_instructor: AuthenticatedActor,
    students: Vec<AuthenticatedActor>,
    zone_id: i64,
}

fn create_test_world() -> World {
    let mut persistence: SqlitePersistence = create_test_persistence();
    let admin: AuthenticatedActor = create_test_admin(&mut persistence);
    let instructor: AuthenticatedActor = create_test_instructor(&mut persistence, "ana");
    let other_instructor: AuthenticatedActor = create_test_instructor(&mut persistence, "luis");
    let zone_id: i64 = create_test_zone(&mut persistence, "Centro");
    let permit_id: i64 = create_test_permit(&mut persistence);
    let students: Vec<AuthenticatedActor> = ["s1", "s2", "s3"]
        .iter()
        .map(|login| create_test_student(&mut persistence, login, zone_id, permit_id))
        .collect();

    World {
        persistence,
        admin,
        instructor,
        other_instructor,
        students,
        zone_id,
    }
}

fn book_as(
    persistence: &mut SqlitePersistence,
    outing_id: i64,
    student: &AuthenticatedActor,
) -> Result<BookingInfo, ApiError> {
    book_outing(persistence, outing_id, &create_test_book_request(), student)
}

#[test]
fn test_slot_booking_lifecycle() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    let booking: BookingInfo = book_slot(
        &mut w.persistence,
        slot_id,
        &create_test_book_request(),
        &w.students[0],
    )
    .unwrap();
    assert_eq!(booking.state, BookingState::Confirmed);
    assert_eq!(booking.kind, AvailabilityKind::Slot);
    assert_eq!(booking.target_id, slot_id);
    assert_eq!(booking.instructor_id, w.instructor.user_id);
    assert_eq!(booking.student_id, w.students[0].user_id);

    let second = book_slot(
        &mut w.persistence,
        slot_id,
        &create_test_book_request(),
        &w.students[1],
    );
    assert_eq!(second.unwrap_err().rule(), Some("already_booked"));

    let visible = list_available_slots(&mut w.persistence, &w.students[1]).unwrap();
    assert!(visible.slots.is_empty());

    let cancelled: BookingInfo =
        cancel_booking(&mut w.persistence, booking.booking_id, &w.students[0]).unwrap();
    assert_eq!(cancelled.state, BookingState::Cancelled);
    assert!(
        w.persistence
            .get_booking(booking.booking_id)
            .unwrap()
            .is_none()
    );

    let visible = list_available_slots(&mut w.persistence, &w.students[1]).unwrap();
    assert_eq!(visible.slots.len(), 1);
    assert_eq!(visible.slots[0].slot_id, slot_id);
}

#[test]
fn test_outing_quota_lifecycle() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);

    let first: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();
    let second: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[1]).unwrap();
    assert_eq!(first.state, BookingState::Pending);
    assert_eq!(second.state, BookingState::Pending);

    let third = book_as(&mut w.persistence, outing_id, &w.students[2]);
    assert_eq!(third.unwrap_err().rule(), Some("no_seats"));

    let confirmed: BookingInfo =
        confirm_booking(&mut w.persistence, first.booking_id, &w.instructor).unwrap();
    assert_eq!(confirmed.state, BookingState::Confirmed);

    let refused = reject_booking(&mut w.persistence, second.booking_id, &w.other_instructor);
    assert!(matches!(refused, Err(ApiError::Forbidden { .. })));

    let rejected: BookingInfo =
        reject_booking(&mut w.persistence, second.booking_id, &w.instructor).unwrap();
    assert_eq!(rejected.state, BookingState::Rejected);

    let listed =
        list_available_outings(&mut w.persistence, &w.students[2], create_test_today()).unwrap();
    assert_eq!(listed.outings[0].remaining_seats, 1);

    let third: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[2]).unwrap();
    assert_eq!(third.state, BookingState::Pending);
}

#[test]
fn test_confirm_twice_is_invalid_transition() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();

    confirm_booking(&mut w.persistence, booking.booking_id, &w.instructor).unwrap();
    let again = confirm_booking(&mut w.persistence, booking.booking_id, &w.instructor);

    assert_eq!(again.unwrap_err().rule(), Some("invalid_transition"));
}

#[test]
fn test_forbidden_is_reported_before_invalid_transition() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();
    confirm_booking(&mut w.persistence, booking.booking_id, &w.instructor).unwrap();

    let result = confirm_booking(&mut w.persistence, booking.booking_id, &w.other_instructor);

    match result.unwrap_err() {
        ApiError::Forbidden { action, .. } => assert_eq!(action, "confirm_booking"),
        other => panic!("Expected Forbidden, got: {other:?}"),
    }
}

#[test]
fn test_student_cannot_confirm_own_booking() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();

    let result = confirm_booking(&mut w.persistence, booking.booking_id, &w.students[0]);

    assert!(matches!(result, Err(ApiError::Forbidden { .. })));
}

#[test]
fn test_admin_confirms_any_booking() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();

    let confirmed: BookingInfo =
        confirm_booking(&mut w.persistence, booking.booking_id, &w.admin).unwrap();

    assert_eq!(confirmed.state, BookingState::Confirmed);
}

#[test]
fn test_cancel_is_allowed_after_confirm_and_reject() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let confirmed: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();
    let rejected: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[1]).unwrap();
    confirm_booking(&mut w.persistence, confirmed.booking_id, &w.instructor).unwrap();
    reject_booking(&mut w.persistence, rejected.booking_id, &w.instructor).unwrap();

    let first = cancel_booking(&mut w.persistence, confirmed.booking_id, &w.students[0]).unwrap();
    let second = cancel_booking(&mut w.persistence, rejected.booking_id, &w.instructor).unwrap();

    assert_eq!(first.state, BookingState::Cancelled);
    assert_eq!(second.state, BookingState::Cancelled);
    assert!(list_bookings(&mut w.persistence, &w.admin)
        .unwrap()
        .bookings
        .is_empty());
}

#[test]
fn test_other_student_cannot_cancel() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();

    let result = cancel_booking(&mut w.persistence, booking.booking_id, &w.students[1]);

    assert!(matches!(result, Err(ApiError::Forbidden { .. })));
}

#[test]
fn test_cancelled_booking_is_not_found_afterwards() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 2);
    let booking: BookingInfo = book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();
    cancel_booking(&mut w.persistence, booking.booking_id, &w.students[0]).unwrap();

    let result = cancel_booking(&mut w.persistence, booking.booking_id, &w.students[0]);

    assert!(matches!(result, Err(ApiError::ResourceNotFound { .. })));
}

#[test]
fn test_duplicate_outing_booking_is_rejected() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 3);
    book_as(&mut w.persistence, outing_id, &w.students[0]).unwrap();

    let again = book_as(&mut w.persistence, outing_id, &w.students[0]);

    assert_eq!(again.unwrap_err().rule(), Some("duplicate_booking"));
}

#[test]
fn test_admin_booking_instructor_onto_own_slot_is_self_booking() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    let result = book_slot(
        &mut w.persistence,
        slot_id,
        &BookRequest {
            student_id: Some(w.instructor.user_id),
        },
        &w.admin,
    );

    assert_eq!(result.unwrap_err().rule(), Some("self_booking"));
}

#[test]
fn test_admin_books_on_behalf_of_student() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    let booking: BookingInfo = book_slot(
        &mut w.persistence,
        slot_id,
        &BookRequest {
            student_id: Some(w.students[1].user_id),
        },
        &w.admin,
    )
    .unwrap();

    assert_eq!(booking.student_id, w.students[1].user_id);
}

#[test]
fn test_admin_cannot_book_slot_for_non_student() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    for user_id in [w.other_instructor.user_id, w.admin.user_id] {
        let result = book_slot(
            &mut w.persistence,
            slot_id,
            &BookRequest {
                student_id: Some(user_id),
            },
            &w.admin,
        );

        match result.unwrap_err() {
            ApiError::InvalidInput { field, .. } => assert_eq!(field, "student_id"),
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    let slots = list_available_slots(&mut w.persistence, &w.students[0]).unwrap();
    assert_eq!(slots.slots.len(), 1);
}

#[test]
fn test_admin_cannot_book_outing_for_non_student() {
    let mut w: World = create_test_world();
    let outing_id: i64 =
        create_test_outing(&mut w.persistence, &w.instructor, w.zone_id, "2030-06-01", 3);

    let result = book_outing(
        &mut w.persistence,
        outing_id,
        &BookRequest {
            student_id: Some(w.other_instructor.user_id),
        },
        &w.admin,
    );

    match result.unwrap_err() {
        ApiError::InvalidInput { field, .. } => assert_eq!(field, "student_id"),
        other => panic!("Expected InvalidInput, got: {other:?}"),
    }
    assert!(list_bookings(&mut w.persistence, &w.admin).unwrap().bookings.is_empty());
}

#[test]
fn test_student_cannot_book_for_another_student() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    let result = book_slot(
        &mut w.persistence,
        slot_id,
        &BookRequest {
            student_id: Some(w.students[1].user_id),
        },
        &w.students[0],
    );

    assert!(matches!(result, Err(ApiError::Forbidden { .. })));
}

#[test]
fn test_instructor_cannot_book() {
    let mut w: World = create_test_world();
    let slot_id: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");

    let result = book_slot(
        &mut w.persistence,
        slot_id,
        &create_test_book_request(),
        &w.other_instructor,
    );

    match result.unwrap_err() {
        ApiError::Forbidden { action, .. } => assert_eq!(action, "book_slot"),
        other => panic!("Expected Forbidden, got: {other:?}"),
    }
}

#[test]
fn test_booking_unknown_outing_is_not_found() {
    let mut w: World = create_test_world();

    let result = book_as(&mut w.persistence, 4242, &w.students[0]);

    assert!(matches!(result, Err(ApiError::ResourceNotFound { .. })));
}

#[test]
fn test_list_bookings_is_scoped_by_role() {
    let mut w: World = create_test_world();
    let own_slot: i64 = create_test_slot(&mut w.persistence, &w.instructor, "2030-06-01T09:00:00Z");
    let other_slot: i64 =
        create_test_slot(&mut w.persistence, &w.other_instructor, "2030-06-01T09:00:00Z");
    book_slot(
        &mut w.persistence,
        own_slot,
        &create_test_book_request(),
        &w.students[0],
    )
    .unwrap();
    book_slot(
        &mut w.persistence,
        other_slot,
        &create_test_book_request(),
        &w.students[1],
    )
    .unwrap();

    let admin_view = list_bookings(&mut w.persistence, &w.admin).unwrap();
    assert_eq!(admin_view.bookings.len(), 2);

    let instructor_view = list_bookings(&mut w.persistence, &w.instructor).unwrap();
    assert_eq!(instructor_view.bookings.len(), 1);
    assert_eq!(instructor_view.bookings[0].target_id, own_slot);

    let student_view = list_bookings(&mut w.persistence, &w.students[1]).unwrap();
    assert_eq!(student_view.bookings.len(), 1);
    assert_eq!(student_view.bookings[0].target_id, other_slot);

    let idle_view = list_bookings(&mut w.persistence, &w.students[2]).unwrap();
    assert!(idle_view.bookings.is_empty());
}
