// SPDX-License-Identifier: Apache-2.0
//! Security forces: mobilized formations with equipment and logistics
//! dependencies.

use thiserror::Error;

use crate::epistemic::{EpistemicState, EpistemicView};
use crate::registry::{Keyed, Registry, RegistryError};
use crate::stores::{AssetId, StoreId};
use crate::tick::{Tick, TICK_NONE};

/// Security force identifier.
pub type ForceId = u64;

/// Maximum equipment lines per force.
pub const FORCE_MAX_EQUIPMENT: usize = 8;
/// Maximum logistics dependencies per force.
pub const FORCE_MAX_LOGISTICS: usize = 8;

/// Errors surfaced by the force registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForceError {
    /// Zero id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Force id already registered.
    #[error("duplicate force id")]
    DuplicateId,
    /// Unknown force.
    #[error("force not found")]
    NotFound,
    /// Registry at capacity.
    #[error("force registry full")]
    Full,
    /// Equipment or logistics list at its bound.
    #[error("force attachment list full")]
    AttachmentFull,
}

impl From<RegistryError> for ForceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Operational domain a force can fight in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainScope {
    /// Settlement-level operations.
    #[default]
    Local,
    /// One planet.
    Planetary,
    /// Orbital space around one body.
    Orbital,
    /// Between star systems.
    Interstellar,
    /// Galaxy-wide.
    Galactic,
}

impl DomainScope {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Local => 0,
            Self::Planetary => 1,
            Self::Orbital => 2,
            Self::Interstellar => 3,
            Self::Galactic => 4,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Local),
            1 => Some(Self::Planetary),
            2 => Some(Self::Orbital),
            3 => Some(Self::Interstellar),
            4 => Some(Self::Galactic),
            _ => None,
        }
    }
}

/// Lifecycle status of a force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForceStatus {
    /// Registered but not yet mobilizing.
    #[default]
    Inactive,
    /// Ramping up after mobilization.
    Mobilizing,
    /// Fully operational.
    Active,
    /// Stood down; awaiting release.
    Demobilized,
}

/// One equipment line on a force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentLine {
    /// Equipment asset id.
    pub asset_id: AssetId,
    /// Quantity held.
    pub qty: u32,
}

/// A mobilized security force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityForce {
    /// Force id, nonzero.
    pub force_id: ForceId,
    /// Owning organization or jurisdiction.
    pub owner: u64,
    /// Domain the force operates in.
    pub domain_scope: DomainScope,
    /// Military cohort providing personnel.
    pub cohort_ref: u64,
    /// Equipment lines, sorted ascending by asset id, at most
    /// [`FORCE_MAX_EQUIPMENT`].
    pub equipment: Vec<EquipmentLine>,
    /// Logistics dependency store refs, sorted, unique, at most
    /// [`FORCE_MAX_LOGISTICS`].
    pub logistics_deps: Vec<StoreId>,
    /// Readiness state backing this force.
    pub readiness_ref: u64,
    /// Morale state backing this force.
    pub morale_ref: u64,
    /// Minimum of the backing states' next due ticks.
    pub next_due_tick: Tick,
    /// Provenance of the mobilization.
    pub provenance_ref: u64,
    /// Lifecycle status.
    pub status: ForceStatus,
}

impl Keyed for SecurityForce {
    fn key(&self) -> u64 {
        self.force_id
    }
}

impl SecurityForce {
    /// Total equipment units across all lines.
    #[must_use]
    pub fn equipment_total(&self) -> u32 {
        self.equipment.iter().fold(0u32, |acc, l| acc.saturating_add(l.qty))
    }
}

/// Id-sorted force table with the auto-assignment counter.
#[derive(Debug)]
pub struct SecurityForceRegistry {
    forces: Registry<SecurityForce>,
    next_force_id: ForceId,
}

impl SecurityForceRegistry {
    /// Creates an empty registry bounded at `capacity` forces;
    /// auto-assignment starts at `start_force_id` (zero maps to one).
    #[must_use]
    pub fn with_capacity(capacity: usize, start_force_id: ForceId) -> Self {
        Self {
            forces: Registry::with_capacity(capacity),
            next_force_id: if start_force_id == 0 { 1 } else { start_force_id },
        }
    }

    /// Next id that auto-assignment would hand out.
    #[must_use]
    pub fn next_force_id(&self) -> ForceId {
        self.next_force_id
    }

    /// Claims the next auto-assigned force id, advancing the counter.
    pub fn claim_force_id(&mut self) -> ForceId {
        let id = self.next_force_id;
        self.next_force_id += 1;
        id
    }

    /// Registers a new force with empty attachments.
    pub fn register(
        &mut self,
        force_id: ForceId,
        owner: u64,
        domain_scope: DomainScope,
        cohort_ref: u64,
        provenance_ref: u64,
    ) -> Result<(), ForceError> {
        self.forces.insert(SecurityForce {
            force_id,
            owner,
            domain_scope,
            cohort_ref,
            equipment: Vec::new(),
            logistics_deps: Vec::new(),
            readiness_ref: 0,
            morale_ref: 0,
            next_due_tick: TICK_NONE,
            provenance_ref,
            status: ForceStatus::Inactive,
        })?;
        // Keep the auto-assignment counter ahead of explicit registrations.
        if force_id >= self.next_force_id {
            self.next_force_id = force_id + 1;
        }
        Ok(())
    }

    /// Looks up a force.
    #[must_use]
    pub fn get(&self, force_id: ForceId) -> Option<&SecurityForce> {
        self.forces.get(force_id)
    }

    /// Looks up a force for mutation.
    #[must_use]
    pub fn get_mut(&mut self, force_id: ForceId) -> Option<&mut SecurityForce> {
        self.forces.get_mut(force_id)
    }

    /// Number of registered forces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    /// True when no forces are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// True when no further force can be registered.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.forces.is_full()
    }

    /// Iterates forces in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &SecurityForce> {
        self.forces.iter()
    }

    /// Adds equipment to a force, merging quantity into an existing line.
    pub fn add_equipment(
        &mut self,
        force_id: ForceId,
        asset_id: AssetId,
        qty: u32,
    ) -> Result<(), ForceError> {
        if asset_id == 0 || qty == 0 {
            return Err(ForceError::InvalidArgument);
        }
        let force = self.forces.get_mut(force_id).ok_or(ForceError::NotFound)?;
        match force
            .equipment
            .binary_search_by_key(&asset_id, |l| l.asset_id)
        {
            Ok(idx) => {
                force.equipment[idx].qty = force.equipment[idx].qty.saturating_add(qty);
            }
            Err(idx) => {
                if force.equipment.len() >= FORCE_MAX_EQUIPMENT {
                    return Err(ForceError::AttachmentFull);
                }
                force.equipment.insert(idx, EquipmentLine { asset_id, qty });
            }
        }
        Ok(())
    }

    /// Adds a logistics dependency, keeping the list sorted and unique.
    pub fn add_logistics_dependency(
        &mut self,
        force_id: ForceId,
        store_ref: StoreId,
    ) -> Result<(), ForceError> {
        if store_ref == 0 {
            return Err(ForceError::InvalidArgument);
        }
        let force = self.forces.get_mut(force_id).ok_or(ForceError::NotFound)?;
        match force.logistics_deps.binary_search(&store_ref) {
            Ok(_) => Ok(()),
            Err(idx) => {
                if force.logistics_deps.len() >= FORCE_MAX_LOGISTICS {
                    return Err(ForceError::AttachmentFull);
                }
                force.logistics_deps.insert(idx, store_ref);
                Ok(())
            }
        }
    }

    /// Binds readiness/morale state refs.
    pub fn set_states(
        &mut self,
        force_id: ForceId,
        readiness_ref: u64,
        morale_ref: u64,
    ) -> Result<(), ForceError> {
        let force = self.forces.get_mut(force_id).ok_or(ForceError::NotFound)?;
        force.readiness_ref = readiness_ref;
        force.morale_ref = morale_ref;
        Ok(())
    }

    /// Sets the lifecycle status.
    pub fn set_status(&mut self, force_id: ForceId, status: ForceStatus) -> Result<(), ForceError> {
        let force = self.forces.get_mut(force_id).ok_or(ForceError::NotFound)?;
        force.status = status;
        Ok(())
    }
}

/// What an observer can say about a force's strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceEstimate {
    /// Personnel count, bucketed by 10 when not exactly known.
    pub estimated_count: u32,
    /// Readiness level, bucketed by 50 when not exactly known.
    pub estimated_readiness: u32,
    /// Morale level, bucketed by 50 when not exactly known.
    pub estimated_morale: u32,
    /// Uncertainty of the underlying view.
    pub uncertainty_q16: u32,
    /// Whether the estimate carries exact values.
    pub is_exact: bool,
}

fn bucket_u32(value: u32, bucket: u32) -> u32 {
    if bucket == 0 {
        value
    } else {
        value / bucket * bucket
    }
}

/// Buckets force strength through an epistemic view: exact only for KNOWN
/// and certain views, otherwise coarse presentation buckets.
#[must_use]
pub fn force_estimate_from_view(
    view: Option<&EpistemicView>,
    actual_count: u32,
    readiness_level: u32,
    morale_level: u32,
) -> ForceEstimate {
    let is_known = view.is_some_and(|v| v.state == EpistemicState::Known && !v.is_uncertain);
    if is_known {
        return ForceEstimate {
            estimated_count: actual_count,
            estimated_readiness: readiness_level,
            estimated_morale: morale_level,
            uncertainty_q16: view.map_or(0, |v| v.uncertainty_q16),
            is_exact: true,
        };
    }
    ForceEstimate {
        estimated_count: bucket_u32(actual_count, 10),
        estimated_readiness: bucket_u32(readiness_level, 50),
        estimated_morale: bucket_u32(morale_level, 50),
        uncertainty_q16: view.map_or(0xFFFF, |v| v.uncertainty_q16),
        is_exact: false,
    }
}
