// SPDX-License-Identifier: Apache-2.0
//! Faction registry with per-faction resource ledgers.

use thiserror::Error;

use crate::economy::ScopeKind;
use crate::station::ResourceId;

/// Faction identifier.
pub type FactionId = u64;

/// Factions may create stations.
pub const POLICY_ALLOW_STATION: u32 = 1 << 0;
/// Factions may create routes and move goods.
pub const POLICY_ALLOW_ROUTE: u32 = 1 << 1;
/// Factions may schedule macro events.
pub const POLICY_ALLOW_EVENTS: u32 = 1 << 2;

/// Errors surfaced by the faction registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactionError {
    /// Zero id, scope, or seed.
    #[error("invalid argument")]
    InvalidArgument,
    /// Faction id already registered.
    #[error("duplicate faction id")]
    DuplicateId,
    /// Unknown faction.
    #[error("faction not found")]
    NotFound,
    /// Known-node list is not strictly ascending.
    #[error("invalid faction data")]
    InvalidData,
    /// A negative delta exceeds the held quantity.
    #[error("insufficient faction resources")]
    Insufficient,
    /// A delta over- or underflowed i64.
    #[error("faction resource overflow")]
    Overflow,
}

/// High-level planning posture of a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PolicyKind {
    /// Balance expansion and reserves.
    #[default]
    Balanced,
    /// Prefer expansion.
    Expansion,
    /// Prefer conserving stockpiles.
    Conserve,
}

impl PolicyKind {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Balanced => 0,
            Self::Expansion => 1,
            Self::Conserve => 2,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Balanced),
            1 => Some(Self::Expansion),
            2 => Some(Self::Conserve),
            _ => None,
        }
    }
}

/// One resource delta of an update batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDelta {
    /// Resource adjusted, nonzero.
    pub resource_id: ResourceId,
    /// Signed adjustment.
    pub delta: i64,
}

/// A registered faction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faction {
    /// Faction id, nonzero.
    pub faction_id: FactionId,
    /// Home scope kind.
    pub home_scope_kind: ScopeKind,
    /// Home scope id, nonzero.
    pub home_scope_id: u64,
    /// Planning posture.
    pub policy_kind: PolicyKind,
    /// `POLICY_ALLOW_*` bit set.
    pub policy_flags: u32,
    /// Seed folded into AI planning digests, nonzero.
    pub ai_seed: u64,
    /// Known node ids, strictly ascending.
    pub known_nodes: Vec<u64>,
    // (resource_id, qty), sorted, qty > 0
    resources: Vec<(ResourceId, i64)>,
}

impl Faction {
    /// Held quantity of a resource, zero when absent.
    #[must_use]
    pub fn resource(&self, resource_id: ResourceId) -> i64 {
        self.resources
            .binary_search_by_key(&resource_id, |(id, _)| *id)
            .map_or(0, |idx| self.resources[idx].1)
    }

    /// Resource rows in ascending resource-id order.
    #[must_use]
    pub fn resources(&self) -> &[(ResourceId, i64)] {
        &self.resources
    }
}

/// Descriptor for registering a faction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionDesc {
    /// Faction id, nonzero.
    pub faction_id: FactionId,
    /// Home scope kind.
    pub home_scope_kind: ScopeKind,
    /// Home scope id, nonzero.
    pub home_scope_id: u64,
    /// Planning posture.
    pub policy_kind: PolicyKind,
    /// `POLICY_ALLOW_*` bit set.
    pub policy_flags: u32,
    /// Seed folded into AI planning digests, nonzero.
    pub ai_seed: u64,
    /// Known node ids; must be strictly ascending.
    pub known_nodes: Vec<u64>,
}

/// Id-sorted faction table.
#[derive(Debug, Default)]
pub struct FactionRegistry {
    factions: Vec<Faction>,
}

impl FactionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a faction after validation.
    pub fn register(&mut self, desc: FactionDesc) -> Result<(), FactionError> {
        if desc.faction_id == 0 || desc.home_scope_id == 0 || desc.ai_seed == 0 {
            return Err(FactionError::InvalidArgument);
        }
        if desc.known_nodes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FactionError::InvalidData);
        }
        match self
            .factions
            .binary_search_by_key(&desc.faction_id, |f| f.faction_id)
        {
            Ok(_) => Err(FactionError::DuplicateId),
            Err(idx) => {
                self.factions.insert(
                    idx,
                    Faction {
                        faction_id: desc.faction_id,
                        home_scope_kind: desc.home_scope_kind,
                        home_scope_id: desc.home_scope_id,
                        policy_kind: desc.policy_kind,
                        policy_flags: desc.policy_flags,
                        ai_seed: desc.ai_seed,
                        known_nodes: desc.known_nodes,
                        resources: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Looks up a faction.
    #[must_use]
    pub fn get(&self, faction_id: FactionId) -> Option<&Faction> {
        self.factions
            .binary_search_by_key(&faction_id, |f| f.faction_id)
            .ok()
            .map(|idx| &self.factions[idx])
    }

    /// Iterates factions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.iter()
    }

    /// Number of registered factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// True when no factions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Resets the registry (save-load entry point).
    pub fn reset(&mut self) {
        self.factions.clear();
    }

    /// Applies a delta batch atomically, in resource-id order.
    ///
    /// Every delta is validated against the post-state before any row is
    /// written: a batch that would drive any resource negative fails with
    /// `Insufficient`, a batch that overflows fails with `Overflow`, and in
    /// both cases the ledger is untouched.
    pub fn update_resources(
        &mut self,
        faction_id: FactionId,
        deltas: &[ResourceDelta],
    ) -> Result<(), FactionError> {
        let idx = self
            .factions
            .binary_search_by_key(&faction_id, |f| f.faction_id)
            .map_err(|_| FactionError::NotFound)?;
        let mut ordered = deltas.to_vec();
        for delta in &ordered {
            if delta.resource_id == 0 {
                return Err(FactionError::InvalidArgument);
            }
        }
        ordered.sort_by_key(|d| d.resource_id);

        // Dry run against a scratch view of the affected rows.
        let faction = &self.factions[idx];
        let mut staged: Vec<(ResourceId, i64)> = Vec::with_capacity(ordered.len());
        for delta in &ordered {
            let current = staged
                .iter()
                .rev()
                .find(|(id, _)| *id == delta.resource_id)
                .map_or_else(|| faction.resource(delta.resource_id), |(_, q)| *q);
            let next = current
                .checked_add(delta.delta)
                .ok_or(FactionError::Overflow)?;
            if next < 0 {
                return Err(FactionError::Insufficient);
            }
            staged.push((delta.resource_id, next));
        }

        // Commit: the last staged value per resource wins.
        let faction = &mut self.factions[idx];
        for (resource_id, next) in staged {
            match faction
                .resources
                .binary_search_by_key(&resource_id, |(id, _)| *id)
            {
                Ok(row) => {
                    if next == 0 {
                        faction.resources.remove(row);
                    } else {
                        faction.resources[row].1 = next;
                    }
                }
                Err(row) => {
                    if next != 0 {
                        faction.resources.insert(row, (resource_id, next));
                    }
                }
            }
        }
        Ok(())
    }

    /// Canonical state blob: count, then per faction header, known nodes,
    /// and resource rows in id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.factions.len() as u32).to_le_bytes());
        for faction in &self.factions {
            out.extend_from_slice(&faction.faction_id.to_le_bytes());
            out.extend_from_slice(&faction.home_scope_kind.code().to_le_bytes());
            out.extend_from_slice(&faction.home_scope_id.to_le_bytes());
            out.extend_from_slice(&faction.policy_kind.code().to_le_bytes());
            out.extend_from_slice(&faction.policy_flags.to_le_bytes());
            out.extend_from_slice(&faction.ai_seed.to_le_bytes());
            out.extend_from_slice(&(faction.known_nodes.len() as u32).to_le_bytes());
            out.extend_from_slice(&(faction.resources.len() as u32).to_le_bytes());
            for node in &faction.known_nodes {
                out.extend_from_slice(&node.to_le_bytes());
            }
            for (resource_id, qty) in &faction.resources {
                out.extend_from_slice(&resource_id.to_le_bytes());
                out.extend_from_slice(&qty.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: u64) -> FactionDesc {
        FactionDesc {
            faction_id: id,
            home_scope_kind: ScopeKind::System,
            home_scope_id: 5,
            policy_kind: PolicyKind::Balanced,
            policy_flags: POLICY_ALLOW_ROUTE | POLICY_ALLOW_EVENTS,
            ai_seed: 99,
            known_nodes: vec![1, 2, 3],
        }
    }

    #[test]
    fn unsorted_known_nodes_rejected() {
        let mut reg = FactionRegistry::new();
        let mut bad = desc(1);
        bad.known_nodes = vec![3, 1];
        assert_eq!(reg.register(bad).unwrap_err(), FactionError::InvalidData);
        let mut dup = desc(1);
        dup.known_nodes = vec![2, 2];
        assert_eq!(reg.register(dup).unwrap_err(), FactionError::InvalidData);
    }

    #[test]
    fn resource_batch_is_atomic() {
        let mut reg = FactionRegistry::new();
        reg.register(desc(1)).unwrap();
        reg.update_resources(
            1,
            &[ResourceDelta {
                resource_id: 700,
                delta: 10,
            }],
        )
        .unwrap();
        // Second delta would go negative: nothing applies.
        let err = reg
            .update_resources(
                1,
                &[
                    ResourceDelta {
                        resource_id: 700,
                        delta: 5,
                    },
                    ResourceDelta {
                        resource_id: 800,
                        delta: -1,
                    },
                ],
            )
            .unwrap_err();
        assert_eq!(err, FactionError::Insufficient);
        assert_eq!(reg.get(1).unwrap().resource(700), 10);
        assert_eq!(reg.get(1).unwrap().resource(800), 0);
    }

    #[test]
    fn zero_rows_are_erased() {
        let mut reg = FactionRegistry::new();
        reg.register(desc(1)).unwrap();
        reg.update_resources(
            1,
            &[ResourceDelta {
                resource_id: 700,
                delta: 4,
            }],
        )
        .unwrap();
        reg.update_resources(
            1,
            &[ResourceDelta {
                resource_id: 700,
                delta: -4,
            }],
        )
        .unwrap();
        assert!(reg.get(1).unwrap().resources().is_empty());
    }

    #[test]
    fn overflow_is_detected() {
        let mut reg = FactionRegistry::new();
        reg.register(desc(1)).unwrap();
        reg.update_resources(
            1,
            &[ResourceDelta {
                resource_id: 700,
                delta: i64::MAX,
            }],
        )
        .unwrap();
        assert_eq!(
            reg.update_resources(
                1,
                &[ResourceDelta {
                    resource_id: 700,
                    delta: 1,
                }],
            )
            .unwrap_err(),
            FactionError::Overflow
        );
    }
}
