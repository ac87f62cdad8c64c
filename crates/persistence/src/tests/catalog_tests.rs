// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use autocita_domain::DomainError;

use crate::{PersistenceError, SqlitePersistence};

#[test]
fn test_create_zone_normalizes_name() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();

    let zone = persistence.create_zone("  sAN blas ").unwrap();
    assert_eq!(zone.name(), "San blas");

    let found = persistence.find_zone_by_name("SAN BLAS").unwrap().unwrap();
    assert_eq!(found, zone);
}

#[test]
fn test_duplicate_zone_is_case_insensitive() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    persistence.create_zone("Centro").unwrap();

    match persistence.create_zone("CENTRO").unwrap_err() {
        PersistenceError::DomainViolation(DomainError::DuplicateZone(name)) => {
            assert_eq!(name, "Centro");
        }
        other => panic!("Expected DuplicateZone, got: {other:?}"),
    }
}

#[test]
fn test_blank_zone_name_is_rejected() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    assert!(matches!(
        persistence.create_zone("   "),
        Err(PersistenceError::DomainViolation(DomainError::InvalidZoneName(_)))
    ));
}

#[test]
fn test_get_or_create_zone_reuses_existing() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();

    let (first, created) = persistence.get_or_create_zone("norte").unwrap();
    assert!(created);
    assert_eq!(first.name(), "Norte");

    let (second, created) = persistence.get_or_create_zone(" NORTE").unwrap();
    assert!(!created);
    assert_eq!(second, first);
    assert_eq!(persistence.list_zones().unwrap().len(), 1);
}

#[test]
fn test_create_permit_uppercases_code() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();

    let permit = persistence.create_permit("a2", "Motorbike").unwrap();
    assert_eq!(permit.code, "A2");

    let found = persistence.get_permit_by_code("A2").unwrap().unwrap();
    assert_eq!(found, permit);

    match persistence.create_permit("A2", "Again").unwrap_err() {
        PersistenceError::DomainViolation(DomainError::DuplicatePermit(code)) => {
            assert_eq!(code, "A2");
        }
        other => panic!("Expected DuplicatePermit, got: {other:?}"),
    }
}

#[test]
fn test_invalid_permit_code_is_rejected() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    assert!(matches!(
        persistence.create_permit("ABC", "Too long"),
        Err(PersistenceError::DomainViolation(DomainError::InvalidPermitCode(_)))
    ));
}

#[test]
fn test_duplicate_phase_is_rejected() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    persistence.create_phase("Theory", 1).unwrap();

    assert!(matches!(
        persistence.create_phase("Theory", 2),
        Err(PersistenceError::DomainViolation(DomainError::DuplicatePhase(_)))
    ));
}

#[test]
fn test_permit_phases_are_listed_in_order_index() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let permit = persistence.create_permit("B", "Car").unwrap();
    let circulation = persistence.create_phase("Circulation", 3).unwrap();
    let theory = persistence.create_phase("Theory", 1).unwrap();
    let maneuvering = persistence.create_phase("Maneuvering", 2).unwrap();

    // Inserted out of order; order_index decides.
    persistence
        .add_permit_phase(permit.permit_id, circulation.phase_id, 30)
        .unwrap();
    persistence
        .add_permit_phase(permit.permit_id, theory.phase_id, 10)
        .unwrap();
    persistence
        .add_permit_phase(permit.permit_id, maneuvering.phase_id, 20)
        .unwrap();

    let ids: Vec<i64> = persistence
        .list_permit_phases(permit.permit_id)
        .unwrap()
        .iter()
        .map(|permit_phase| permit_phase.phase_id)
        .collect();
    assert_eq!(
        ids,
        vec![theory.phase_id, maneuvering.phase_id, circulation.phase_id]
    );
}

#[test]
fn test_add_permit_phase_rejects_duplicates_and_unknown_ids() {
    let mut persistence = SqlitePersistence::new_in_memory().unwrap();
    let permit = persistence.create_permit("B", "Car").unwrap();
    let theory = persistence.create_phase("Theory", 1).unwrap();

    persistence
        .add_permit_phase(permit.permit_id, theory.phase_id, 1)
        .unwrap();

    match persistence
        .add_permit_phase(permit.permit_id, theory.phase_id, 2)
        .unwrap_err()
    {
        PersistenceError::DomainViolation(DomainError::DuplicatePermitPhase {
            permit_id,
            phase_id,
        }) => {
            assert_eq!(permit_id, permit.permit_id);
            assert_eq!(phase_id, theory.phase_id);
        }
        other => panic!("Expected DuplicatePermitPhase, got: {other:?}"),
    }

    assert!(matches!(
        persistence.add_permit_phase(999, theory.phase_id, 1),
        Err(PersistenceError::DomainViolation(DomainError::PermitNotFound(_)))
    ));
    assert!(matches!(
        persistence.add_permit_phase(permit.permit_id, 999, 1),
        Err(PersistenceError::DomainViolation(DomainError::PhaseNotFound(999)))
    ));
}
