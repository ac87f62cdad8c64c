// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Permits, exam phases and the ordering rule between them.

use crate::error::DomainError;

/// A licence category a student can request (e.g. "B").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub permit_id: i64,
    /// Unique short code.
    pub code: String,
    pub description: String,
}

/// One exam stage, shared across permits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub phase_id: i64,
    /// Unique name.
    pub name: String,
    /// Default display order.
    pub display_order: i32,
}

/// Membership of a phase in a permit's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitPhase {
    pub permit_id: i64,
    pub phase_id: i64,
    /// Position in the permit's sequence; lower comes first.
    pub order_index: i32,
}

/// The ordered phase sequence of one permit.
///
/// The order comes from `PermitPhase::order_index`. Ties are broken by
/// phase ID so the sequence is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSequence {
    phase_ids: Vec<i64>,
}

impl PhaseSequence {
    /// Builds the sequence for a permit from its phase memberships.
    #[must_use]
    pub fn from_permit_phases(permit_phases: &[PermitPhase]) -> Self {
        let mut ordered: Vec<&PermitPhase> = permit_phases.iter().collect();
        ordered.sort_by_key(|pp| (pp.order_index, pp.phase_id));
        Self {
            phase_ids: ordered.iter().map(|pp| pp.phase_id).collect(),
        }
    }

    /// Returns the phase IDs in sequence order.
    #[must_use]
    pub fn phase_ids(&self) -> &[i64] {
        &self.phase_ids
    }

    #[must_use]
    pub fn first(&self) -> Option<i64> {
        self.phase_ids.first().copied()
    }

    /// Returns the position of `phase_id` in the sequence.
    #[must_use]
    pub fn position(&self, phase_id: i64) -> Option<usize> {
        self.phase_ids.iter().position(|id| *id == phase_id)
    }

    /// Returns the phase immediately after `phase_id`, if any.
    #[must_use]
    pub fn successor_of(&self, phase_id: i64) -> Option<i64> {
        self.position(phase_id)
            .and_then(|idx| self.phase_ids.get(idx + 1).copied())
    }

    /// Decides whether a request currently at `current` may move to `target`.
    ///
    /// A request that has no current phase, or whose current phase is not
    /// part of this sequence, may only move to the first phase. Otherwise it
    /// may only move to the immediate successor of its current phase.
    #[must_use]
    pub fn can_advance(&self, current: Option<i64>, target: i64) -> bool {
        match current.and_then(|phase_id| self.position(phase_id).map(|_| phase_id)) {
            Some(phase_id) => self.successor_of(phase_id) == Some(target),
            None => self.first() == Some(target),
        }
    }

    /// Validates an advance for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhaseOrder` if `can_advance` is false.
    pub fn validate_advance(
        &self,
        request_id: i64,
        current: Option<i64>,
        target: i64,
    ) -> Result<(), DomainError> {
        if self.can_advance(current, target) {
            Ok(())
        } else {
            Err(DomainError::InvalidPhaseOrder {
                request_id,
                current_phase_id: current,
                target_phase_id: target,
            })
        }
    }
}
