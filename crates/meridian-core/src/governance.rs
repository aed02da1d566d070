// SPDX-License-Identifier: Apache-2.0
//! Governance collaborators of the war pipelines: legitimacy states and
//! enforcement capacities.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};

/// Legitimacy state identifier.
pub type LegitimacyId = u64;
/// Enforcement capacity identifier.
pub type EnforcementId = u64;

/// Full scale of a legitimacy value.
pub const LEGITIMACY_SCALE: u32 = 1000;

/// Errors surfaced by the governance registries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernanceError {
    /// Zero id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Id already registered.
    #[error("duplicate id")]
    DuplicateId,
    /// Unknown id.
    #[error("not found")]
    NotFound,
    /// Registry at capacity.
    #[error("registry full")]
    Full,
}

impl From<RegistryError> for GovernanceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Perceived legitimacy of an owning organization, `0..=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegitimacyState {
    /// State id, nonzero.
    pub legitimacy_id: LegitimacyId,
    /// Current value, clamped to the scale.
    pub value: u32,
}

impl Keyed for LegitimacyState {
    fn key(&self) -> u64 {
        self.legitimacy_id
    }
}

/// Id-sorted legitimacy table.
#[derive(Debug)]
pub struct LegitimacyRegistry {
    states: Registry<LegitimacyState>,
}

impl LegitimacyRegistry {
    /// Creates an empty registry bounded at `capacity` states.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Registry::with_capacity(capacity),
        }
    }

    /// Registers a state, clamping the starting value to the scale.
    pub fn register(&mut self, legitimacy_id: LegitimacyId, value: u32) -> Result<(), GovernanceError> {
        self.states.insert(LegitimacyState {
            legitimacy_id,
            value: value.min(LEGITIMACY_SCALE),
        })?;
        Ok(())
    }

    /// Looks up a state.
    #[must_use]
    pub fn get(&self, legitimacy_id: LegitimacyId) -> Option<&LegitimacyState> {
        self.states.get(legitimacy_id)
    }

    /// Applies a clamped delta; unknown ids report `NotFound`.
    pub fn apply_delta(
        &mut self,
        legitimacy_id: LegitimacyId,
        delta: i32,
    ) -> Result<u32, GovernanceError> {
        let state = self
            .states
            .get_mut(legitimacy_id)
            .ok_or(GovernanceError::NotFound)?;
        let next = (i64::from(state.value) + i64::from(delta))
            .clamp(0, i64::from(LEGITIMACY_SCALE));
        state.value = next as u32;
        Ok(state.value)
    }
}

/// Enforcers available to back a mobilization with authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnforcementCapacity {
    /// Capacity id, nonzero.
    pub capacity_id: EnforcementId,
    /// Enforcers currently available.
    pub available_enforcers: u32,
}

impl Keyed for EnforcementCapacity {
    fn key(&self) -> u64 {
        self.capacity_id
    }
}

/// Id-sorted enforcement table.
#[derive(Debug)]
pub struct EnforcementRegistry {
    capacities: Registry<EnforcementCapacity>,
}

impl EnforcementRegistry {
    /// Creates an empty registry bounded at `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacities: Registry::with_capacity(capacity),
        }
    }

    /// Registers a capacity record.
    pub fn register(&mut self, record: EnforcementCapacity) -> Result<(), GovernanceError> {
        self.capacities.insert(record)?;
        Ok(())
    }

    /// Looks up a capacity record.
    #[must_use]
    pub fn get(&self, capacity_id: EnforcementId) -> Option<&EnforcementCapacity> {
        self.capacities.get(capacity_id)
    }
}
