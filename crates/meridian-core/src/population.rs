// SPDX-License-Identifier: Apache-2.0
//! Population cohorts: the recruitment pool for mobilization.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};

/// Population cohort identifier.
pub type PopulationCohortId = u64;

/// Errors surfaced by the population registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PopulationError {
    /// Zero cohort id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Cohort id already registered.
    #[error("duplicate cohort id")]
    DuplicateId,
    /// Unknown cohort.
    #[error("cohort not found")]
    NotFound,
    /// Registry at capacity.
    #[error("population registry full")]
    Full,
    /// A negative adjustment exceeds the current count.
    #[error("insufficient population")]
    Insufficient,
    /// A positive adjustment overflowed the count.
    #[error("population overflow")]
    Overflow,
}

impl From<RegistryError> for PopulationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// A body of population at one settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PopulationCohort {
    /// Cohort id, nonzero.
    pub cohort_id: PopulationCohortId,
    /// Individuals in the cohort.
    pub count: u32,
}

impl Keyed for PopulationCohort {
    fn key(&self) -> u64 {
        self.cohort_id
    }
}

/// Id-sorted cohort table.
#[derive(Debug)]
pub struct PopulationRegistry {
    cohorts: Registry<PopulationCohort>,
}

impl PopulationRegistry {
    /// Creates an empty registry bounded at `capacity` cohorts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cohorts: Registry::with_capacity(capacity),
        }
    }

    /// Registers a cohort.
    pub fn register(&mut self, cohort: PopulationCohort) -> Result<(), PopulationError> {
        self.cohorts.insert(cohort)?;
        Ok(())
    }

    /// Looks up a cohort.
    #[must_use]
    pub fn get(&self, cohort_id: PopulationCohortId) -> Option<&PopulationCohort> {
        self.cohorts.get(cohort_id)
    }

    /// Adjusts a cohort's count, rejecting underflow and overflow, and
    /// returns the new count.
    pub fn adjust_count(
        &mut self,
        cohort_id: PopulationCohortId,
        delta: i32,
    ) -> Result<u32, PopulationError> {
        let cohort = self
            .cohorts
            .get_mut(cohort_id)
            .ok_or(PopulationError::NotFound)?;
        let next = i64::from(cohort.count) + i64::from(delta);
        if next < 0 {
            return Err(PopulationError::Insufficient);
        }
        let next = u32::try_from(next).map_err(|_| PopulationError::Overflow)?;
        cohort.count = next;
        Ok(next)
    }
}
