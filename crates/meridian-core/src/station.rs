// SPDX-License-Identifier: Apache-2.0
//! Station registry and per-station inventories.
//!
//! Inventories are sorted maps `resource_id -> quantity` with the invariant
//! that stored quantities are strictly positive: a resource that reaches
//! zero is erased, so "absent" and "zero" are the same observable state.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};

/// Station identifier.
pub type StationId = u64;
/// Resource identifier.
pub type ResourceId = u64;
/// Celestial body identifier.
pub type BodyId = u64;
/// Reference-frame identifier.
pub type FrameId = u64;

/// Errors surfaced by the station registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StationError {
    /// Zero id or non-positive amount.
    #[error("invalid argument")]
    InvalidArgument,
    /// Station id already registered.
    #[error("duplicate station id")]
    DuplicateId,
    /// Unknown station or resource.
    #[error("not found")]
    NotFound,
    /// Registry at capacity.
    #[error("station registry full")]
    Full,
    /// Removal exceeds the stored quantity.
    #[error("insufficient inventory")]
    Insufficient,
    /// Addition would overflow the stored quantity.
    #[error("inventory overflow")]
    Overflow,
}

impl From<RegistryError> for StationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// One inventory line: a resource held in positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryEntry {
    /// Resource held.
    pub resource_id: ResourceId,
    /// Stored quantity, always `> 0`.
    pub quantity: i64,
}

/// Station descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationDesc {
    /// Station id, nonzero.
    pub station_id: StationId,
    /// Body the station is anchored to, nonzero.
    pub body_id: BodyId,
    /// Reference frame of the station.
    pub frame_id: FrameId,
}

/// A registered station and its inventory.
#[derive(Debug, Clone)]
pub struct Station {
    desc: StationDesc,
    inventory: Vec<InventoryEntry>,
}

impl Keyed for Station {
    fn key(&self) -> u64 {
        self.desc.station_id
    }
}

impl Station {
    /// Station descriptor.
    #[must_use]
    pub fn desc(&self) -> &StationDesc {
        &self.desc
    }

    /// Inventory lines sorted ascending by resource id.
    #[must_use]
    pub fn inventory(&self) -> &[InventoryEntry] {
        &self.inventory
    }

    /// Quantity of `resource_id`, zero when absent.
    #[must_use]
    pub fn quantity(&self, resource_id: ResourceId) -> i64 {
        self.inventory
            .binary_search_by_key(&resource_id, |e| e.resource_id)
            .map_or(0, |idx| self.inventory[idx].quantity)
    }

    fn add(&mut self, resource_id: ResourceId, amount: i64) -> Result<(), StationError> {
        match self
            .inventory
            .binary_search_by_key(&resource_id, |e| e.resource_id)
        {
            Ok(idx) => {
                let entry = &mut self.inventory[idx];
                entry.quantity = entry
                    .quantity
                    .checked_add(amount)
                    .ok_or(StationError::Overflow)?;
                Ok(())
            }
            Err(idx) => {
                self.inventory.insert(
                    idx,
                    InventoryEntry {
                        resource_id,
                        quantity: amount,
                    },
                );
                Ok(())
            }
        }
    }

    fn remove(&mut self, resource_id: ResourceId, amount: i64) -> Result<(), StationError> {
        let idx = self
            .inventory
            .binary_search_by_key(&resource_id, |e| e.resource_id)
            .map_err(|_| StationError::Insufficient)?;
        let entry = &mut self.inventory[idx];
        if entry.quantity < amount {
            return Err(StationError::Insufficient);
        }
        entry.quantity -= amount;
        if entry.quantity == 0 {
            self.inventory.remove(idx);
        }
        Ok(())
    }
}

/// Id-sorted station store.
#[derive(Debug)]
pub struct StationRegistry {
    stations: Registry<Station>,
}

impl StationRegistry {
    /// Creates an empty registry bounded at `capacity` stations.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stations: Registry::with_capacity(capacity),
        }
    }

    /// Registers a station with an empty inventory.
    pub fn register(&mut self, desc: StationDesc) -> Result<(), StationError> {
        if desc.station_id == 0 || desc.body_id == 0 {
            return Err(StationError::InvalidArgument);
        }
        self.stations.insert(Station {
            desc,
            inventory: Vec::new(),
        })?;
        Ok(())
    }

    /// Looks up a station.
    #[must_use]
    pub fn get(&self, station_id: StationId) -> Option<&Station> {
        self.stations.get(station_id)
    }

    /// Number of registered stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when no stations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterates stations in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    /// Quantity of `resource_id` at `station_id`; `NotFound` for an unknown
    /// station, zero for an absent resource.
    pub fn inventory_get(
        &self,
        station_id: StationId,
        resource_id: ResourceId,
    ) -> Result<i64, StationError> {
        let station = self.stations.get(station_id).ok_or(StationError::NotFound)?;
        Ok(station.quantity(resource_id))
    }

    /// Adds `amount > 0` of a resource, inserting the line if absent.
    pub fn inventory_add(
        &mut self,
        station_id: StationId,
        resource_id: ResourceId,
        amount: i64,
    ) -> Result<(), StationError> {
        if resource_id == 0 || amount <= 0 {
            return Err(StationError::InvalidArgument);
        }
        let station = self
            .stations
            .get_mut(station_id)
            .ok_or(StationError::NotFound)?;
        station.add(resource_id, amount)
    }

    /// Removes `amount > 0` of a resource, erasing the line at zero.
    pub fn inventory_remove(
        &mut self,
        station_id: StationId,
        resource_id: ResourceId,
        amount: i64,
    ) -> Result<(), StationError> {
        if resource_id == 0 || amount <= 0 {
            return Err(StationError::InvalidArgument);
        }
        let station = self
            .stations
            .get_mut(station_id)
            .ok_or(StationError::NotFound)?;
        station.remove(resource_id, amount)
    }

    /// Resets the registry to empty (save-load entry point).
    pub fn reset(&mut self) {
        self.stations.clear();
    }

    /// Canonical little-endian state blob: station count, then per station
    /// `(station_id, body_id, frame_id, inv_count, entries…)` in id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.stations.len() as u32).to_le_bytes());
        for station in self.stations.iter() {
            out.extend_from_slice(&station.desc.station_id.to_le_bytes());
            out.extend_from_slice(&station.desc.body_id.to_le_bytes());
            out.extend_from_slice(&station.desc.frame_id.to_le_bytes());
            out.extend_from_slice(&(station.inventory.len() as u32).to_le_bytes());
            for entry in &station.inventory {
                out.extend_from_slice(&entry.resource_id.to_le_bytes());
                out.extend_from_slice(&entry.quantity.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: u64) -> StationDesc {
        StationDesc {
            station_id: id,
            body_id: 100,
            frame_id: 1,
        }
    }

    #[test]
    fn zero_quantity_entries_do_not_exist() {
        let mut reg = StationRegistry::with_capacity(4);
        reg.register(desc(1)).unwrap();
        reg.inventory_add(1, 700, 30).unwrap();
        reg.inventory_remove(1, 700, 30).unwrap();
        assert!(reg.get(1).unwrap().inventory().is_empty());
        assert_eq!(reg.inventory_get(1, 700).unwrap(), 0);
    }

    #[test]
    fn remove_requires_sufficient_quantity() {
        let mut reg = StationRegistry::with_capacity(4);
        reg.register(desc(1)).unwrap();
        reg.inventory_add(1, 700, 10).unwrap();
        assert_eq!(
            reg.inventory_remove(1, 700, 11).unwrap_err(),
            StationError::Insufficient
        );
        assert_eq!(reg.inventory_get(1, 700).unwrap(), 10);
    }

    #[test]
    fn inventory_stays_sorted_by_resource() {
        let mut reg = StationRegistry::with_capacity(4);
        reg.register(desc(1)).unwrap();
        for res in [900, 100, 500] {
            reg.inventory_add(1, res, 1).unwrap();
        }
        let ids: Vec<u64> = reg
            .get(1)
            .unwrap()
            .inventory()
            .iter()
            .map(|e| e.resource_id)
            .collect();
        assert_eq!(ids, vec![100, 500, 900]);
    }

    #[test]
    fn add_overflow_is_reported() {
        let mut reg = StationRegistry::with_capacity(4);
        reg.register(desc(1)).unwrap();
        reg.inventory_add(1, 700, i64::MAX).unwrap();
        assert_eq!(
            reg.inventory_add(1, 700, 1).unwrap_err(),
            StationError::Overflow
        );
    }

    #[test]
    fn duplicate_station_rejected() {
        let mut reg = StationRegistry::with_capacity(4);
        reg.register(desc(1)).unwrap();
        assert_eq!(reg.register(desc(1)).unwrap_err(), StationError::DuplicateId);
    }
}
