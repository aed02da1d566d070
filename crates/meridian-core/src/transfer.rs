// SPDX-License-Identifier: Apache-2.0
//! In-flight transfer scheduler.
//!
//! Transfers deduct from the source inventory when scheduled and credit the
//! destination when their arrival tick is reached. The queue is kept sorted
//! by `(arrival_tick, transfer_id)` so arrivals drain in a deterministic
//! order, and `update` is batch-invariant: one call at `t2` credits exactly
//! what per-tick calls from `t1+1..=t2` would have.

use thiserror::Error;

use crate::route::{RouteGraph, RouteId};
use crate::station::{ResourceId, StationRegistry};
use crate::tick::Tick;

/// Transfer identifier.
pub type TransferId = u64;

/// Errors surfaced by the transfer scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// Zero route id, empty entry list, zero resource, or non-positive
    /// quantity.
    #[error("invalid argument")]
    InvalidArgument,
    /// Unknown route.
    #[error("route not found")]
    NotFound,
    /// Merged entries are malformed (save-load path).
    #[error("invalid transfer data")]
    InvalidData,
    /// Total units exceed the route capacity.
    #[error("route capacity exceeded")]
    CapacityExceeded,
    /// Source inventory cannot cover an entry.
    #[error("insufficient source inventory")]
    Insufficient,
    /// Quantity merge or arrival arithmetic overflowed.
    #[error("transfer overflow")]
    Overflow,
    /// Inventory mutation failed after validation (registry invariant
    /// violation).
    #[error("transfer scheduler internal error")]
    Internal,
}

/// One line of a transfer manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransferEntry {
    /// Resource moved.
    pub resource_id: ResourceId,
    /// Units moved, `> 0`.
    pub quantity: i64,
}

/// An in-flight shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Transfer id, unique and monotone.
    pub transfer_id: TransferId,
    /// Route being traversed.
    pub route_id: RouteId,
    /// Tick the transfer departed.
    pub start_tick: Tick,
    /// Tick the transfer arrives, `> start_tick`.
    pub arrival_tick: Tick,
    /// Manifest, sorted by resource id with no duplicates.
    pub entries: Vec<TransferEntry>,
    /// Sum of entry quantities.
    pub total_units: u64,
}

/// Arrival-ordered transfer queue.
#[derive(Debug)]
pub struct TransferScheduler {
    transfers: Vec<TransferRecord>,
    next_id: TransferId,
}

impl Default for TransferScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transfers: Vec::new(),
            next_id: 1,
        }
    }

    /// Number of in-flight transfers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    /// True when nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// In-flight records in `(arrival_tick, transfer_id)` order.
    #[must_use]
    pub fn records(&self) -> &[TransferRecord] {
        &self.transfers
    }

    /// Looks up an in-flight transfer.
    #[must_use]
    pub fn get(&self, transfer_id: TransferId) -> Option<&TransferRecord> {
        self.transfers.iter().find(|t| t.transfer_id == transfer_id)
    }

    /// Resets the queue (save-load entry point).
    pub fn reset(&mut self) {
        self.transfers.clear();
        self.next_id = 1;
    }

    /// Sorts entries by resource id and merges duplicates, summing
    /// quantities with overflow checks. Returns the total unit count.
    fn normalize(entries: &[TransferEntry]) -> Result<(Vec<TransferEntry>, u64), TransferError> {
        if entries.is_empty() {
            return Err(TransferError::InvalidArgument);
        }
        let mut sorted = entries.to_vec();
        for entry in &sorted {
            if entry.resource_id == 0 || entry.quantity <= 0 {
                return Err(TransferError::InvalidArgument);
            }
        }
        sorted.sort_by_key(|e| e.resource_id);
        let mut merged: Vec<TransferEntry> = Vec::with_capacity(sorted.len());
        for entry in sorted {
            match merged.last_mut() {
                Some(last) if last.resource_id == entry.resource_id => {
                    last.quantity = last
                        .quantity
                        .checked_add(entry.quantity)
                        .ok_or(TransferError::Overflow)?;
                }
                _ => merged.push(entry),
            }
        }
        let mut total: u64 = 0;
        for entry in &merged {
            total = total
                .checked_add(entry.quantity as u64)
                .ok_or(TransferError::Overflow)?;
        }
        Ok((merged, total))
    }

    fn insert_sorted(&mut self, record: TransferRecord) {
        let pos = self
            .transfers
            .partition_point(|t| (t.arrival_tick, t.transfer_id) < (record.arrival_tick, record.transfer_id));
        self.transfers.insert(pos, record);
    }

    /// Schedules a transfer departing at `now`.
    ///
    /// Validation happens before any state change; on failure the source
    /// inventory is untouched.
    pub fn schedule(
        &mut self,
        routes: &RouteGraph,
        stations: &mut StationRegistry,
        route_id: RouteId,
        entries: &[TransferEntry],
        now: Tick,
    ) -> Result<TransferId, TransferError> {
        if route_id == 0 {
            return Err(TransferError::InvalidArgument);
        }
        let route = *routes.get(route_id).ok_or(TransferError::NotFound)?;
        let (normalized, total_units) = Self::normalize(entries)?;
        if total_units > route.capacity_units {
            return Err(TransferError::CapacityExceeded);
        }
        for entry in &normalized {
            let have = stations
                .inventory_get(route.src_station_id, entry.resource_id)
                .map_err(|_| TransferError::Insufficient)?;
            if have < entry.quantity {
                return Err(TransferError::Insufficient);
            }
        }
        for entry in &normalized {
            stations
                .inventory_remove(route.src_station_id, entry.resource_id, entry.quantity)
                .map_err(|_| TransferError::Internal)?;
        }

        let arrival_tick = now
            .checked_add(route.duration_ticks)
            .ok_or(TransferError::Overflow)?;
        let transfer_id = self.next_id;
        self.next_id += 1;
        self.insert_sorted(TransferRecord {
            transfer_id,
            route_id,
            start_tick: now,
            arrival_tick,
            entries: normalized,
            total_units,
        });
        Ok(transfer_id)
    }

    /// Re-inserts a persisted in-flight transfer (save-load path).
    ///
    /// The record is taken as already departed: no inventory is deducted.
    /// Entries must be sorted strictly by resource id with positive
    /// quantities summing to `total_units`.
    pub fn add_loaded(
        &mut self,
        routes: &RouteGraph,
        record: TransferRecord,
    ) -> Result<(), TransferError> {
        if record.transfer_id == 0 || record.route_id == 0 || record.entries.is_empty() {
            return Err(TransferError::InvalidArgument);
        }
        let route = routes.get(record.route_id).ok_or(TransferError::NotFound)?;
        if record.arrival_tick <= record.start_tick {
            return Err(TransferError::InvalidData);
        }
        let mut total: u64 = 0;
        let mut last_resource = 0u64;
        for entry in &record.entries {
            if entry.resource_id == 0 || entry.quantity <= 0 || entry.resource_id <= last_resource {
                return Err(TransferError::InvalidData);
            }
            last_resource = entry.resource_id;
            total = total
                .checked_add(entry.quantity as u64)
                .ok_or(TransferError::Overflow)?;
        }
        if total != record.total_units || total > route.capacity_units {
            return Err(TransferError::InvalidData);
        }
        if self.get(record.transfer_id).is_some() {
            return Err(TransferError::InvalidData);
        }
        self.next_id = self.next_id.max(record.transfer_id + 1);
        self.insert_sorted(record);
        Ok(())
    }

    /// Credits every transfer with `arrival_tick <= now` to its destination,
    /// in queue order, and removes it.
    pub fn update(
        &mut self,
        routes: &RouteGraph,
        stations: &mut StationRegistry,
        now: Tick,
    ) -> Result<(), TransferError> {
        while let Some(first) = self.transfers.first() {
            if first.arrival_tick > now {
                break;
            }
            let record = self.transfers.remove(0);
            let route = routes.get(record.route_id).ok_or(TransferError::NotFound)?;
            for entry in &record.entries {
                stations
                    .inventory_add(route.dst_station_id, entry.resource_id, entry.quantity)
                    .map_err(|_| TransferError::Internal)?;
            }
        }
        Ok(())
    }

    /// Canonical state blob: count, then per transfer
    /// `(id, route, start, arrival, entry_count, entries…)` in queue order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.transfers.len() as u32).to_le_bytes());
        for record in &self.transfers {
            out.extend_from_slice(&record.transfer_id.to_le_bytes());
            out.extend_from_slice(&record.route_id.to_le_bytes());
            out.extend_from_slice(&record.start_tick.to_le_bytes());
            out.extend_from_slice(&record.arrival_tick.to_le_bytes());
            out.extend_from_slice(&(record.entries.len() as u32).to_le_bytes());
            for entry in &record.entries {
                out.extend_from_slice(&entry.resource_id.to_le_bytes());
                out.extend_from_slice(&entry.quantity.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Route;
    use crate::station::StationDesc;

    fn world() -> (RouteGraph, StationRegistry) {
        let mut stations = StationRegistry::with_capacity(8);
        for id in [1u64, 2] {
            stations
                .register(StationDesc {
                    station_id: id,
                    body_id: 10,
                    frame_id: 1,
                })
                .unwrap();
        }
        let mut routes = RouteGraph::with_capacity(8);
        routes
            .register(Route {
                route_id: 1,
                src_station_id: 1,
                dst_station_id: 2,
                duration_ticks: 3,
                capacity_units: 50,
            })
            .unwrap();
        (routes, stations)
    }

    #[test]
    fn schedule_deducts_and_update_credits() {
        let (routes, mut stations) = world();
        stations.inventory_add(1, 700, 30).unwrap();
        let mut sched = TransferScheduler::new();
        sched
            .schedule(
                &routes,
                &mut stations,
                1,
                &[TransferEntry {
                    resource_id: 700,
                    quantity: 10,
                }],
                1,
            )
            .unwrap();
        assert_eq!(stations.inventory_get(1, 700).unwrap(), 20);
        assert_eq!(stations.inventory_get(2, 700).unwrap(), 0);

        sched.update(&routes, &mut stations, 4).unwrap();
        assert_eq!(stations.inventory_get(1, 700).unwrap(), 20);
        assert_eq!(stations.inventory_get(2, 700).unwrap(), 10);
        assert!(sched.is_empty());
    }

    #[test]
    fn duplicate_resources_merge_before_capacity_check() {
        let (routes, mut stations) = world();
        stations.inventory_add(1, 700, 100).unwrap();
        let mut sched = TransferScheduler::new();
        let entries = [
            TransferEntry {
                resource_id: 700,
                quantity: 30,
            },
            TransferEntry {
                resource_id: 700,
                quantity: 30,
            },
        ];
        assert_eq!(
            sched
                .schedule(&routes, &mut stations, 1, &entries, 0)
                .unwrap_err(),
            TransferError::CapacityExceeded
        );
        // No state change on refusal.
        assert_eq!(stations.inventory_get(1, 700).unwrap(), 100);
    }

    #[test]
    fn insufficient_source_leaves_state_untouched() {
        let (routes, mut stations) = world();
        stations.inventory_add(1, 700, 5).unwrap();
        let mut sched = TransferScheduler::new();
        let err = sched
            .schedule(
                &routes,
                &mut stations,
                1,
                &[TransferEntry {
                    resource_id: 700,
                    quantity: 10,
                }],
                0,
            )
            .unwrap_err();
        assert_eq!(err, TransferError::Insufficient);
        assert_eq!(stations.inventory_get(1, 700).unwrap(), 5);
        assert!(sched.is_empty());
    }

    #[test]
    fn queue_orders_by_arrival_then_id() {
        let (mut routes, mut stations) = world();
        routes
            .register(Route {
                route_id: 2,
                src_station_id: 1,
                dst_station_id: 2,
                duration_ticks: 1,
                capacity_units: 50,
            })
            .unwrap();
        stations.inventory_add(1, 700, 100).unwrap();
        let mut sched = TransferScheduler::new();
        let slow = sched
            .schedule(
                &routes,
                &mut stations,
                1,
                &[TransferEntry {
                    resource_id: 700,
                    quantity: 1,
                }],
                0,
            )
            .unwrap();
        let fast = sched
            .schedule(
                &routes,
                &mut stations,
                2,
                &[TransferEntry {
                    resource_id: 700,
                    quantity: 1,
                }],
                0,
            )
            .unwrap();
        let order: Vec<TransferId> = sched.records().iter().map(|r| r.transfer_id).collect();
        assert_eq!(order, vec![fast, slow]);
    }

    #[test]
    fn add_loaded_preserves_id_monotonicity() {
        let (routes, _stations) = world();
        let mut sched = TransferScheduler::new();
        sched
            .add_loaded(
                &routes,
                TransferRecord {
                    transfer_id: 9,
                    route_id: 1,
                    start_tick: 0,
                    arrival_tick: 3,
                    entries: vec![TransferEntry {
                        resource_id: 700,
                        quantity: 4,
                    }],
                    total_units: 4,
                },
            )
            .unwrap();
        let (routes2, mut stations2) = world();
        stations2.inventory_add(1, 700, 10).unwrap();
        let next = sched
            .schedule(
                &routes2,
                &mut stations2,
                1,
                &[TransferEntry {
                    resource_id: 700,
                    quantity: 1,
                }],
                0,
            )
            .unwrap();
        assert_eq!(next, 10);
    }
}
