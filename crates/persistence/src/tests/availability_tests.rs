// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for the availability catalog: creation, listing and removal.

use autocita_domain::{BookingState, BookingTarget, DomainError, Role, Session};
use time::macros::{date, datetime};

use crate::tests::{
    create_test_instructor, create_test_outing_date, create_test_start_at, create_test_student,
    create_test_zone,
};
use crate::{OutingFilter, PersistenceError, SlotFilter, SqlitePersistence};

#[test]
fn test_create_slot_and_read_back() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");

    let slot = persistence
        .create_slot(instructor_id, create_test_start_at())
        .unwrap();

    assert!(slot.is_available());
    assert_eq!(persistence.get_slot(slot.slot_id).unwrap().unwrap(), slot);
}

#[test]
fn test_duplicate_slot_is_rejected() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    persistence
        .create_slot(instructor_id, create_test_start_at())
        .unwrap();

    // Same instant expressed in another offset.
    let same_instant = datetime!(2030-06-01 11:00 +02:00);
    match persistence.create_slot(instructor_id, same_instant).unwrap_err() {
        PersistenceError::DomainViolation(DomainError::DuplicateSlot {
            instructor_id: id, ..
        }) => assert_eq!(id, instructor_id),
        other => panic!("Expected DuplicateSlot, got: {other:?}"),
    }

    // A different instructor may use the same start time.
    let other_id = create_test_instructor(&mut persistence, "rosa");
    assert!(
        persistence
            .create_slot(other_id, create_test_start_at())
            .is_ok()
    );
}

#[test]
fn test_create_slot_for_unknown_instructor_fails() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    assert!(matches!(
        persistence.create_slot(42, create_test_start_at()),
        Err(PersistenceError::DomainViolation(DomainError::UserNotFound(42)))
    ));
}

#[test]
fn test_availability_owner_must_be_instructor() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let student_id = create_test_student(&mut persistence, "ana");
    let zone_id = create_test_zone(&mut persistence);

    match persistence.create_slot(student_id, create_test_start_at()).unwrap_err() {
        PersistenceError::DomainViolation(DomainError::RoleMismatch { expected, actual, .. }) => {
            assert_eq!(expected, Role::Instructor);
            assert_eq!(actual, Role::Student);
        }
        other => panic!("Expected RoleMismatch, got: {other:?}"),
    }
    assert!(matches!(
        persistence.create_outing(
            student_id,
            zone_id,
            create_test_outing_date(),
            Session::Morning,
            2
        ),
        Err(PersistenceError::DomainViolation(DomainError::RoleMismatch { .. }))
    ));
    assert!(persistence.list_slots(SlotFilter::default()).unwrap().is_empty());
}

#[test]
fn test_create_outing_defaults_and_duplicates() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let zone_id = create_test_zone(&mut persistence);

    let outing = persistence
        .create_outing(
            instructor_id,
            zone_id,
            create_test_outing_date(),
            Session::Morning,
            3,
        )
        .unwrap();
    assert_eq!(outing.quota, 3);
    assert_eq!(outing.remaining_seats(), 3);
    assert_eq!(persistence.get_outing(outing.outing_id).unwrap().unwrap(), outing);

    match persistence
        .create_outing(
            instructor_id,
            zone_id,
            create_test_outing_date(),
            Session::Morning,
            2,
        )
        .unwrap_err()
    {
        PersistenceError::DomainViolation(DomainError::DuplicateOuting { session, .. }) => {
            assert_eq!(session, Session::Morning);
        }
        other => panic!("Expected DuplicateOuting, got: {other:?}"),
    }

    // Another session on the same date is a different outing.
    assert!(
        persistence
            .create_outing(
                instructor_id,
                zone_id,
                create_test_outing_date(),
                Session::Afternoon,
                2,
            )
            .is_ok()
    );
}

#[test]
fn test_create_outing_rejects_invalid_quota_and_zone() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let zone_id = create_test_zone(&mut persistence);

    assert!(matches!(
        persistence.create_outing(
            instructor_id,
            zone_id,
            create_test_outing_date(),
            Session::Both,
            0
        ),
        Err(PersistenceError::DomainViolation(DomainError::InvalidQuota { quota: 0 }))
    ));
    assert!(matches!(
        persistence.create_outing(
            instructor_id,
            999,
            create_test_outing_date(),
            Session::Both,
            3
        ),
        Err(PersistenceError::DomainViolation(DomainError::ZoneNotFound(_)))
    ));
}

#[test]
fn test_list_slots_filters() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let pedro = create_test_instructor(&mut persistence, "pedro");
    let rosa = create_test_instructor(&mut persistence, "rosa");
    let student_id = create_test_student(&mut persistence, "ana");

    let booked = persistence
        .create_slot(pedro, datetime!(2030-06-01 09:00 UTC))
        .unwrap();
    let open = persistence
        .create_slot(pedro, datetime!(2030-06-01 10:00 UTC))
        .unwrap();
    persistence
        .create_slot(rosa, datetime!(2030-06-01 09:00 UTC))
        .unwrap();
    persistence.book_slot(student_id, booked.slot_id).unwrap();

    assert_eq!(persistence.list_slots(SlotFilter::default()).unwrap().len(), 3);

    let pedro_slots = persistence
        .list_slots(SlotFilter {
            instructor_id: Some(pedro),
            unbooked_only: false,
        })
        .unwrap();
    assert_eq!(pedro_slots.len(), 2);
    assert!(pedro_slots[0].is_booked);

    let pedro_open = persistence
        .list_slots(SlotFilter {
            instructor_id: Some(pedro),
            unbooked_only: true,
        })
        .unwrap();
    assert_eq!(pedro_open.len(), 1);
    assert_eq!(pedro_open[0].slot_id, open.slot_id);
}

#[test]
fn test_list_outings_excludes_past_dates() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let zone_id = create_test_zone(&mut persistence);

    let past = persistence
        .create_outing(instructor_id, zone_id, date!(2030 - 05 - 31), Session::Morning, 3)
        .unwrap();
    let today = persistence
        .create_outing(instructor_id, zone_id, date!(2030 - 06 - 01), Session::Morning, 3)
        .unwrap();
    let future = persistence
        .create_outing(instructor_id, zone_id, date!(2030 - 06 - 02), Session::Morning, 3)
        .unwrap();

    let ids: Vec<i64> = persistence
        .list_outings(OutingFilter {
            from_date: Some(date!(2030 - 06 - 01)),
            ..OutingFilter::default()
        })
        .unwrap()
        .iter()
        .map(|outing| outing.outing_id)
        .collect();

    assert!(!ids.contains(&past.outing_id));
    assert_eq!(ids, vec![today.outing_id, future.outing_id]);
}

#[test]
fn test_list_outings_reports_active_bookings() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let zone_id = create_test_zone(&mut persistence);
    let ana = create_test_student(&mut persistence, "ana");
    let luis = create_test_student(&mut persistence, "luis");

    let outing = persistence
        .create_outing(
            instructor_id,
            zone_id,
            create_test_outing_date(),
            Session::Morning,
            3,
        )
        .unwrap();
    persistence.book_outing(ana, outing.outing_id).unwrap();
    let rejected = persistence.book_outing(luis, outing.outing_id).unwrap();
    persistence
        .transition_booking(
            rejected.booking_id,
            autocita_domain::BookingOperation::Reject,
        )
        .unwrap();

    let listed = persistence
        .list_outings(OutingFilter {
            zone_id: Some(zone_id),
            ..OutingFilter::default()
        })
        .unwrap();
    assert_eq!(listed.len(), 1);
    // Rejected bookings do not hold a seat.
    assert_eq!(listed[0].active_bookings, 1);
    assert_eq!(listed[0].remaining_seats(), 2);
}

#[test]
fn test_remove_slot_returns_removed_booking() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let student_id = create_test_student(&mut persistence, "ana");
    let slot = persistence
        .create_slot(instructor_id, create_test_start_at())
        .unwrap();
    let booking = persistence.book_slot(student_id, slot.slot_id).unwrap();

    let (removed_slot, removed) = persistence.remove_slot(slot.slot_id).unwrap();

    assert_eq!(removed_slot.slot_id, slot.slot_id);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].booking_id, booking.booking_id);
    assert!(persistence.get_slot(slot.slot_id).unwrap().is_none());
    assert!(persistence.get_booking(booking.booking_id).unwrap().is_none());
}

#[test]
fn test_remove_outing_returns_every_booking() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let instructor_id = create_test_instructor(&mut persistence, "pedro");
    let zone_id = create_test_zone(&mut persistence);
    let ana = create_test_student(&mut persistence, "ana");
    let luis = create_test_student(&mut persistence, "luis");
    let outing = persistence
        .create_outing(
            instructor_id,
            zone_id,
            create_test_outing_date(),
            Session::Both,
            3,
        )
        .unwrap();
    persistence.book_outing(ana, outing.outing_id).unwrap();
    let second = persistence.book_outing(luis, outing.outing_id).unwrap();
    persistence
        .transition_booking(second.booking_id, autocita_domain::BookingOperation::Confirm)
        .unwrap();

    let (_, removed) = persistence.remove_outing(outing.outing_id).unwrap();

    assert_eq!(removed.len(), 2);
    assert!(
        removed
            .iter()
            .all(|booking| booking.target == BookingTarget::Outing(outing.outing_id))
    );
    assert_eq!(removed[1].state, BookingState::Confirmed);
    assert!(persistence.get_outing(outing.outing_id).unwrap().is_none());
    assert!(
        persistence
            .list_bookings(crate::BookingFilter::default())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_remove_missing_availability_fails() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    assert!(matches!(
        persistence.remove_slot(7),
        Err(PersistenceError::DomainViolation(DomainError::SlotNotFound(7)))
    ));
    assert!(matches!(
        persistence.remove_outing(8),
        Err(PersistenceError::DomainViolation(DomainError::OutingNotFound(8)))
    ));
}
