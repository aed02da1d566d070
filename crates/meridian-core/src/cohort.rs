// SPDX-License-Identifier: Apache-2.0
//! Military cohorts: population assigned to a security force.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};

/// Military cohort identifier (shared with the source population cohort).
pub type MilitaryCohortId = u64;

/// Errors surfaced by the military cohort registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CohortError {
    /// Zero cohort id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Cohort already in military service.
    #[error("duplicate cohort id")]
    DuplicateId,
    /// Unknown cohort.
    #[error("cohort not found")]
    NotFound,
    /// Registry at capacity.
    #[error("cohort registry full")]
    Full,
    /// A negative adjustment exceeds the current count.
    #[error("insufficient cohort count")]
    Insufficient,
    /// A positive adjustment overflowed the count.
    #[error("cohort count overflow")]
    Overflow,
}

impl From<RegistryError> for CohortError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Battlefield role of a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MilitaryRole {
    /// Ground infantry (the mobilization default).
    #[default]
    Infantry,
    /// Vessel crew.
    Crew,
    /// Static security.
    Security,
    /// Logistics and support.
    Support,
}

impl MilitaryRole {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Infantry => 0,
            Self::Crew => 1,
            Self::Security => 2,
            Self::Support => 3,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Infantry),
            1 => Some(Self::Crew),
            2 => Some(Self::Security),
            3 => Some(Self::Support),
            _ => None,
        }
    }
}

/// A cohort under military assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MilitaryCohort {
    /// Cohort id, nonzero.
    pub cohort_id: MilitaryCohortId,
    /// Force this cohort serves, zero after release.
    pub assigned_force_id: u64,
    /// Personnel count.
    pub count: u32,
    /// Battlefield role.
    pub role: MilitaryRole,
    /// Casualty bookkeeping reference.
    pub casualty_tracking_ref: u64,
}

impl Keyed for MilitaryCohort {
    fn key(&self) -> u64 {
        self.cohort_id
    }
}

/// Id-sorted military cohort table.
#[derive(Debug)]
pub struct MilitaryCohortRegistry {
    cohorts: Registry<MilitaryCohort>,
}

impl MilitaryCohortRegistry {
    /// Creates an empty registry bounded at `capacity` cohorts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cohorts: Registry::with_capacity(capacity),
        }
    }

    /// Registers a cohort assignment.
    pub fn register(&mut self, cohort: MilitaryCohort) -> Result<(), CohortError> {
        self.cohorts.insert(cohort)?;
        Ok(())
    }

    /// Looks up a cohort.
    #[must_use]
    pub fn get(&self, cohort_id: MilitaryCohortId) -> Option<&MilitaryCohort> {
        self.cohorts.get(cohort_id)
    }

    /// True when all cohorts have been released or none registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Number of registered cohorts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    /// Bound on cohort count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cohorts.capacity()
    }

    /// Adjusts a cohort's count, rejecting underflow/overflow, and returns
    /// the new count.
    pub fn adjust_count(
        &mut self,
        cohort_id: MilitaryCohortId,
        delta: i32,
    ) -> Result<u32, CohortError> {
        let cohort = self
            .cohorts
            .get_mut(cohort_id)
            .ok_or(CohortError::NotFound)?;
        let next = i64::from(cohort.count) + i64::from(delta);
        if next < 0 {
            return Err(CohortError::Insufficient);
        }
        let next = u32::try_from(next).map_err(|_| CohortError::Overflow)?;
        cohort.count = next;
        Ok(next)
    }

    /// Releases a cohort from service: assignment and count drop to zero,
    /// the record is removed.
    pub fn release(&mut self, cohort_id: MilitaryCohortId) -> Result<(), CohortError> {
        let mut cohort = self.cohorts.remove(cohort_id)?;
        cohort.assigned_force_id = 0;
        cohort.count = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(id: u64, count: u32) -> MilitaryCohort {
        MilitaryCohort {
            cohort_id: id,
            assigned_force_id: 9,
            count,
            role: MilitaryRole::Infantry,
            casualty_tracking_ref: 0,
        }
    }

    #[test]
    fn adjust_count_clamps_at_zero() {
        let mut reg = MilitaryCohortRegistry::with_capacity(4);
        reg.register(cohort(1, 8)).unwrap();
        assert_eq!(reg.adjust_count(1, -3).unwrap(), 5);
        assert_eq!(reg.adjust_count(1, -6).unwrap_err(), CohortError::Insufficient);
    }

    #[test]
    fn release_removes_the_record() {
        let mut reg = MilitaryCohortRegistry::with_capacity(4);
        reg.register(cohort(1, 8)).unwrap();
        reg.release(1).unwrap();
        assert!(reg.get(1).is_none());
        // The cohort id is free for a fresh mobilization.
        reg.register(cohort(1, 4)).unwrap();
    }
}
