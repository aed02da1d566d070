// SPDX-License-Identifier: Apache-2.0
//! Aerodynamic properties and per-vessel flight state.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};

/// Vessel identifier.
pub type VesselId = u64;

/// Errors surfaced by the aero registries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AeroError {
    /// Zero vessel id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Vessel already has a record.
    #[error("duplicate vessel id")]
    DuplicateId,
    /// Unknown vessel.
    #[error("vessel not found")]
    NotFound,
    /// Registry at capacity.
    #[error("aero registry full")]
    Full,
}

impl From<RegistryError> for AeroError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Static aerodynamic properties of a vessel (28-byte save record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeroProps {
    /// Vessel described, nonzero.
    pub vessel_id: VesselId,
    /// Drag coefficient in Q16.16.
    pub drag_coeff_q16: i32,
    /// Reference area in Q16.16 square meters.
    pub ref_area_q16: i32,
    /// Dry mass in kilograms.
    pub mass_kg: u32,
    /// Maximum tolerable heating in watts; meaningful iff `has_max_heat`.
    pub max_heat_w: u32,
    /// Whether `max_heat_w` is set.
    pub has_max_heat: bool,
}

impl Keyed for AeroProps {
    fn key(&self) -> u64 {
        self.vessel_id
    }
}

/// Dynamic flight state of a vessel (20-byte save record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeroState {
    /// Vessel described, nonzero.
    pub vessel_id: VesselId,
    /// Airspeed in Q16.16 meters per second.
    pub airspeed_q16: i32,
    /// Current heating in watts.
    pub heat_w: u32,
    /// Regime flags.
    pub flags: u32,
}

impl Keyed for AeroState {
    fn key(&self) -> u64 {
        self.vessel_id
    }
}

/// Id-sorted aero property and state tables.
#[derive(Debug)]
pub struct AeroRegistry {
    props: Registry<AeroProps>,
    states: Registry<AeroState>,
}

impl AeroRegistry {
    /// Creates empty tables bounded at `capacity` vessels each.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            props: Registry::with_capacity(capacity),
            states: Registry::with_capacity(capacity),
        }
    }

    /// Registers vessel properties.
    pub fn register_props(&mut self, props: AeroProps) -> Result<(), AeroError> {
        self.props.insert(props)?;
        Ok(())
    }

    /// Registers vessel state.
    pub fn register_state(&mut self, state: AeroState) -> Result<(), AeroError> {
        self.states.insert(state)?;
        Ok(())
    }

    /// Looks up properties.
    #[must_use]
    pub fn props(&self, vessel_id: VesselId) -> Option<&AeroProps> {
        self.props.get(vessel_id)
    }

    /// Looks up state.
    #[must_use]
    pub fn state(&self, vessel_id: VesselId) -> Option<&AeroState> {
        self.states.get(vessel_id)
    }

    /// Number of property records.
    #[must_use]
    pub fn props_len(&self) -> usize {
        self.props.len()
    }

    /// Number of state records.
    #[must_use]
    pub fn states_len(&self) -> usize {
        self.states.len()
    }

    /// Resets both tables (save-load entry point).
    pub fn reset(&mut self) {
        self.props.clear();
        self.states.clear();
    }

    /// Canonical AERP chunk payload.
    pub fn encode_props_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.props.len() as u32).to_le_bytes());
        for props in self.props.iter() {
            out.extend_from_slice(&props.vessel_id.to_le_bytes());
            out.extend_from_slice(&props.drag_coeff_q16.to_le_bytes());
            out.extend_from_slice(&props.ref_area_q16.to_le_bytes());
            out.extend_from_slice(&props.mass_kg.to_le_bytes());
            out.extend_from_slice(&props.max_heat_w.to_le_bytes());
            out.extend_from_slice(&u32::from(props.has_max_heat).to_le_bytes());
        }
    }

    /// Canonical AERS chunk payload.
    pub fn encode_states_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.states.len() as u32).to_le_bytes());
        for state in self.states.iter() {
            out.extend_from_slice(&state.vessel_id.to_le_bytes());
            out.extend_from_slice(&state.airspeed_q16.to_le_bytes());
            out.extend_from_slice(&state.heat_w.to_le_bytes());
            out.extend_from_slice(&state.flags.to_le_bytes());
        }
    }
}
