// SPDX-License-Identifier: Apache-2.0
//! Macro economy aggregates, scoped per system or galaxy.
//!
//! Each scope carries three sorted maps (production rates, demand rates,
//! stockpile) plus a flag word. Writing a zero rate or quantity erases the
//! key, so every stored value is nonzero and scope listings are canonical.

use thiserror::Error;

use crate::station::ResourceId;

/// Errors surfaced by the macro economy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconomyError {
    /// Zero scope or resource id, or an unknown scope kind.
    #[error("invalid argument")]
    InvalidArgument,
    /// Scope already registered.
    #[error("duplicate scope id")]
    DuplicateId,
    /// Unknown scope.
    #[error("scope not found")]
    NotFound,
    /// Rate or stockpile delta overflowed i64.
    #[error("economy overflow")]
    Overflow,
}

/// Scope kind for macro aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScopeKind {
    /// A single star system.
    System,
    /// A whole galaxy.
    Galaxy,
}

impl ScopeKind {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::System => 1,
            Self::Galaxy => 2,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::System),
            2 => Some(Self::Galaxy),
            _ => None,
        }
    }
}

/// One rate or stockpile line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceAmount {
    /// Resource keyed.
    pub resource_id: ResourceId,
    /// Nonzero signed amount.
    pub amount: i64,
}

/// Aggregates for one scope.
#[derive(Debug, Clone, Default)]
pub struct MacroScope {
    /// Scope id, nonzero.
    pub scope_id: u64,
    /// Bit flags applied by macro events.
    pub flags: u32,
    production: Vec<ResourceAmount>,
    demand: Vec<ResourceAmount>,
    stockpile: Vec<ResourceAmount>,
}

fn map_get(map: &[ResourceAmount], resource_id: ResourceId) -> i64 {
    map.binary_search_by_key(&resource_id, |e| e.resource_id)
        .map_or(0, |idx| map[idx].amount)
}

fn map_set(map: &mut Vec<ResourceAmount>, resource_id: ResourceId, amount: i64) {
    match map.binary_search_by_key(&resource_id, |e| e.resource_id) {
        Ok(idx) => {
            if amount == 0 {
                map.remove(idx);
            } else {
                map[idx].amount = amount;
            }
        }
        Err(idx) => {
            if amount != 0 {
                map.insert(
                    idx,
                    ResourceAmount {
                        resource_id,
                        amount,
                    },
                );
            }
        }
    }
}

impl MacroScope {
    /// Production rate lines sorted by resource id.
    #[must_use]
    pub fn production(&self) -> &[ResourceAmount] {
        &self.production
    }

    /// Demand rate lines sorted by resource id.
    #[must_use]
    pub fn demand(&self) -> &[ResourceAmount] {
        &self.demand
    }

    /// Stockpile lines sorted by resource id.
    #[must_use]
    pub fn stockpile(&self) -> &[ResourceAmount] {
        &self.stockpile
    }
}

/// Per-kind scope lists, sorted by scope id.
#[derive(Debug, Default)]
pub struct MacroEconomy {
    systems: Vec<MacroScope>,
    galaxies: Vec<MacroScope>,
}

impl MacroEconomy {
    /// Creates an empty economy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn scopes(&self, kind: ScopeKind) -> &Vec<MacroScope> {
        match kind {
            ScopeKind::System => &self.systems,
            ScopeKind::Galaxy => &self.galaxies,
        }
    }

    fn scopes_mut(&mut self, kind: ScopeKind) -> &mut Vec<MacroScope> {
        match kind {
            ScopeKind::System => &mut self.systems,
            ScopeKind::Galaxy => &mut self.galaxies,
        }
    }

    /// Registers a scope.
    pub fn register(&mut self, kind: ScopeKind, scope_id: u64) -> Result<(), EconomyError> {
        if scope_id == 0 {
            return Err(EconomyError::InvalidArgument);
        }
        let scopes = self.scopes_mut(kind);
        match scopes.binary_search_by_key(&scope_id, |s| s.scope_id) {
            Ok(_) => Err(EconomyError::DuplicateId),
            Err(idx) => {
                scopes.insert(
                    idx,
                    MacroScope {
                        scope_id,
                        ..MacroScope::default()
                    },
                );
                Ok(())
            }
        }
    }

    /// Looks up a scope.
    #[must_use]
    pub fn get(&self, kind: ScopeKind, scope_id: u64) -> Option<&MacroScope> {
        let scopes = self.scopes(kind);
        scopes
            .binary_search_by_key(&scope_id, |s| s.scope_id)
            .ok()
            .map(|idx| &scopes[idx])
    }

    fn get_mut(&mut self, kind: ScopeKind, scope_id: u64) -> Result<&mut MacroScope, EconomyError> {
        let scopes = self.scopes_mut(kind);
        match scopes.binary_search_by_key(&scope_id, |s| s.scope_id) {
            Ok(idx) => Ok(&mut scopes[idx]),
            Err(_) => Err(EconomyError::NotFound),
        }
    }

    /// Iterates scopes of one kind in ascending id order.
    pub fn iter(&self, kind: ScopeKind) -> impl Iterator<Item = &MacroScope> {
        self.scopes(kind).iter()
    }

    /// Number of scopes of one kind.
    #[must_use]
    pub fn len(&self, kind: ScopeKind) -> usize {
        self.scopes(kind).len()
    }

    /// True when no scope of either kind exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty() && self.galaxies.is_empty()
    }

    /// Reads `(production_rate, demand_rate)` for a resource.
    pub fn rate_get(
        &self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
    ) -> Result<(i64, i64), EconomyError> {
        if resource_id == 0 {
            return Err(EconomyError::InvalidArgument);
        }
        let scope = self.get(kind, scope_id).ok_or(EconomyError::NotFound)?;
        Ok((
            map_get(&scope.production, resource_id),
            map_get(&scope.demand, resource_id),
        ))
    }

    /// Writes both rates; zero values erase their key.
    pub fn rate_set(
        &mut self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
        production_rate: i64,
        demand_rate: i64,
    ) -> Result<(), EconomyError> {
        if resource_id == 0 {
            return Err(EconomyError::InvalidArgument);
        }
        let scope = self.get_mut(kind, scope_id)?;
        map_set(&mut scope.production, resource_id, production_rate);
        map_set(&mut scope.demand, resource_id, demand_rate);
        Ok(())
    }

    /// Adjusts both rates with overflow detection.
    pub fn rate_delta(
        &mut self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
        production_delta: i64,
        demand_delta: i64,
    ) -> Result<(), EconomyError> {
        let (prod, demand) = self.rate_get(kind, scope_id, resource_id)?;
        let new_prod = prod
            .checked_add(production_delta)
            .ok_or(EconomyError::Overflow)?;
        let new_demand = demand
            .checked_add(demand_delta)
            .ok_or(EconomyError::Overflow)?;
        self.rate_set(kind, scope_id, resource_id, new_prod, new_demand)
    }

    /// Reads a stockpile quantity.
    pub fn stockpile_get(
        &self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
    ) -> Result<i64, EconomyError> {
        if resource_id == 0 {
            return Err(EconomyError::InvalidArgument);
        }
        let scope = self.get(kind, scope_id).ok_or(EconomyError::NotFound)?;
        Ok(map_get(&scope.stockpile, resource_id))
    }

    /// Writes a stockpile quantity; zero erases the key.
    pub fn stockpile_set(
        &mut self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
        quantity: i64,
    ) -> Result<(), EconomyError> {
        if resource_id == 0 {
            return Err(EconomyError::InvalidArgument);
        }
        let scope = self.get_mut(kind, scope_id)?;
        map_set(&mut scope.stockpile, resource_id, quantity);
        Ok(())
    }

    /// Adjusts a stockpile quantity with overflow detection.
    pub fn stockpile_delta(
        &mut self,
        kind: ScopeKind,
        scope_id: u64,
        resource_id: ResourceId,
        delta: i64,
    ) -> Result<(), EconomyError> {
        let current = self.stockpile_get(kind, scope_id, resource_id)?;
        let next = current.checked_add(delta).ok_or(EconomyError::Overflow)?;
        self.stockpile_set(kind, scope_id, resource_id, next)
    }

    /// Applies flag masks: set bits, then clear bits.
    pub fn flags_apply(
        &mut self,
        kind: ScopeKind,
        scope_id: u64,
        flags_set: u32,
        flags_clear: u32,
    ) -> Result<(), EconomyError> {
        let scope = self.get_mut(kind, scope_id)?;
        scope.flags |= flags_set;
        scope.flags &= !flags_clear;
        Ok(())
    }

    /// Resets both scope lists (save-load entry point).
    pub fn reset(&mut self) {
        self.systems.clear();
        self.galaxies.clear();
    }

    /// Canonical state blob: total scope count, then scopes in
    /// (kind, scope_id) order with their three maps.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        let total = self.systems.len() + self.galaxies.len();
        out.extend_from_slice(&(total as u32).to_le_bytes());
        for (kind, scopes) in [
            (ScopeKind::System, &self.systems),
            (ScopeKind::Galaxy, &self.galaxies),
        ] {
            for scope in scopes {
                out.extend_from_slice(&kind.code().to_le_bytes());
                out.extend_from_slice(&scope.scope_id.to_le_bytes());
                out.extend_from_slice(&scope.flags.to_le_bytes());
                out.extend_from_slice(&(scope.production.len() as u32).to_le_bytes());
                out.extend_from_slice(&(scope.demand.len() as u32).to_le_bytes());
                out.extend_from_slice(&(scope.stockpile.len() as u32).to_le_bytes());
                for map in [&scope.production, &scope.demand, &scope.stockpile] {
                    for entry in map {
                        out.extend_from_slice(&entry.resource_id.to_le_bytes());
                        out.extend_from_slice(&entry.amount.to_le_bytes());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_erases_key() {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::System, 5).unwrap();
        econ.rate_set(ScopeKind::System, 5, 700, 10, 3).unwrap();
        assert_eq!(econ.rate_get(ScopeKind::System, 5, 700).unwrap(), (10, 3));
        econ.rate_set(ScopeKind::System, 5, 700, 0, 0).unwrap();
        assert!(econ.get(ScopeKind::System, 5).unwrap().production().is_empty());
        assert!(econ.get(ScopeKind::System, 5).unwrap().demand().is_empty());
    }

    #[test]
    fn rate_delta_detects_overflow() {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::Galaxy, 1).unwrap();
        econ.rate_set(ScopeKind::Galaxy, 1, 700, i64::MAX, 0).unwrap();
        assert_eq!(
            econ.rate_delta(ScopeKind::Galaxy, 1, 700, 1, 0).unwrap_err(),
            EconomyError::Overflow
        );
    }

    #[test]
    fn flags_set_then_clear() {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::System, 2).unwrap();
        econ.flags_apply(ScopeKind::System, 2, 0b1010, 0).unwrap();
        econ.flags_apply(ScopeKind::System, 2, 0b0001, 0b1000).unwrap();
        assert_eq!(econ.get(ScopeKind::System, 2).unwrap().flags, 0b0011);
    }

    #[test]
    fn kinds_are_disjoint_keyspaces() {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::System, 9).unwrap();
        econ.register(ScopeKind::Galaxy, 9).unwrap();
        assert_eq!(
            econ.register(ScopeKind::System, 9).unwrap_err(),
            EconomyError::DuplicateId
        );
    }

    #[test]
    fn stockpile_delta_round_trip() {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::System, 1).unwrap();
        econ.stockpile_delta(ScopeKind::System, 1, 700, 40).unwrap();
        econ.stockpile_delta(ScopeKind::System, 1, 700, -40).unwrap();
        assert_eq!(econ.stockpile_get(ScopeKind::System, 1, 700).unwrap(), 0);
        assert!(econ.get(ScopeKind::System, 1).unwrap().stockpile().is_empty());
    }
}
