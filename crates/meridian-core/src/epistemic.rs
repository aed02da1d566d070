// SPDX-License-Identifier: Apache-2.0
//! Epistemic capability snapshots and view queries.
//!
//! Producers append capability entries to a snapshot buffer; finalization
//! sorts them by the triple `(capability_id, subject_kind, subject_id)`.
//! A query never exposes state that is not present in the snapshot — an
//! absent or expired capability reads as UNKNOWN, and staleness/uncertainty
//! bits drive presentation bucketing rather than exact values.

use crate::tick::{Tick, TICK_NONE};

/// Expiry sentinel: the entry never expires.
pub const EXPIRES_NEVER: Tick = TICK_NONE;

/// Whether a capability's subject is known to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EpistemicState {
    /// Nothing is known.
    #[default]
    Unknown,
    /// The subject is known (possibly stale or uncertain).
    Known,
}

/// Capability kinds observable through snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum CapabilityKind {
    /// Current time readout.
    TimeReadout = 1,
    /// Calendar access.
    CalendarView = 2,
    /// Map access.
    MapView = 3,
    /// Position estimates.
    PositionEstimate = 4,
    /// Health status of subjects.
    HealthStatus = 5,
    /// Inventory summaries.
    InventorySummary = 6,
    /// Economic account access.
    EconomicAccount = 7,
    /// Market quotes.
    MarketQuotes = 8,
    /// Communications reach.
    Communications = 9,
    /// Command status of forces.
    CommandStatus = 10,
    /// Environmental readings.
    EnvironmentalStatus = 11,
    /// Legal standing.
    LegalStatus = 12,
}

/// One observed capability for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapabilityEntry {
    /// Capability observed, nonzero.
    pub capability_id: u32,
    /// Kind of subject the capability refers to.
    pub subject_kind: u32,
    /// Subject identifier.
    pub subject_id: u64,
    /// Known/unknown state.
    pub state: EpistemicState,
    /// Q16.16 uncertainty; zero means exact.
    pub uncertainty_q16: u32,
    /// Permitted information age before the entry reads stale.
    pub latency_ticks: u32,
    /// Tick the observation was made.
    pub observed_tick: Tick,
    /// Tick the entry stops being valid; [`EXPIRES_NEVER`] for none.
    pub expires_tick: Tick,
    /// Bitmask of contributing sources.
    pub source_mask: u32,
}

impl CapabilityEntry {
    fn sort_key(&self) -> (u32, u32, u64) {
        (self.capability_id, self.subject_kind, self.subject_id)
    }
}

/// Bounded, sortable capability buffer.
#[derive(Debug, Clone)]
pub struct CapabilitySnapshot {
    entries: Vec<CapabilityEntry>,
    capacity: usize,
    /// Tick the snapshot was produced at.
    pub snapshot_tick: Tick,
}

impl CapabilitySnapshot {
    /// Creates an empty snapshot bounded at `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            snapshot_tick: 0,
        }
    }

    /// Entries in their current order (sorted after `finalize`).
    #[must_use]
    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    /// Number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries; capacity is retained.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Appends an entry. Fails (returns `false`) on a zero capability id or
    /// a full buffer.
    pub fn add(&mut self, entry: CapabilityEntry) -> bool {
        if entry.capability_id == 0 || self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Sorts entries by `(capability_id, subject_kind, subject_id)`.
    ///
    /// Insertion order breaks ties, so adding the same set of entries in
    /// any order yields byte-identical finalized snapshots.
    pub fn finalize(&mut self) {
        // Insertion sort: snapshots are small and mostly sorted already.
        for i in 1..self.entries.len() {
            let key = self.entries[i];
            let mut j = i;
            while j > 0 && self.entries[j - 1].sort_key() > key.sort_key() {
                self.entries[j] = self.entries[j - 1];
                j -= 1;
            }
            self.entries[j] = key;
        }
    }

    /// Linear scan for the exact triple.
    #[must_use]
    pub fn find(
        &self,
        capability_id: u32,
        subject_kind: u32,
        subject_id: u64,
    ) -> Option<&CapabilityEntry> {
        self.entries.iter().find(|e| {
            e.capability_id == capability_id
                && e.subject_kind == subject_kind
                && e.subject_id == subject_id
        })
    }
}

/// What a query reveals about one capability triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpistemicView {
    /// Known/unknown state.
    pub state: EpistemicState,
    /// Q16.16 uncertainty carried from the entry.
    pub uncertainty_q16: u32,
    /// Observation tick carried from the entry.
    pub observed_tick: Tick,
    /// Latency carried from the entry.
    pub latency_ticks: u32,
    /// Information older than its latency allowance.
    pub is_stale: bool,
    /// Nonzero uncertainty.
    pub is_uncertain: bool,
}

/// Queries a snapshot at `now_tick`.
///
/// Missing and expired entries yield the zero UNKNOWN view.
#[must_use]
pub fn epistemic_query(
    snapshot: &CapabilitySnapshot,
    capability_id: u32,
    subject_kind: u32,
    subject_id: u64,
    now_tick: Tick,
) -> EpistemicView {
    let Some(entry) = snapshot.find(capability_id, subject_kind, subject_id) else {
        return EpistemicView::default();
    };
    if entry.expires_tick != EXPIRES_NEVER && entry.expires_tick <= now_tick {
        return EpistemicView::default();
    }
    let mut view = EpistemicView {
        state: entry.state,
        uncertainty_q16: entry.uncertainty_q16,
        observed_tick: entry.observed_tick,
        latency_ticks: entry.latency_ticks,
        is_stale: false,
        is_uncertain: entry.uncertainty_q16 != 0,
    };
    if entry.latency_ticks > 0 {
        let age = now_tick.saturating_sub(entry.observed_tick);
        if age > u64::from(entry.latency_ticks) {
            view.is_stale = true;
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cap: u32, kind: u32, subject: u64) -> CapabilityEntry {
        CapabilityEntry {
            capability_id: cap,
            subject_kind: kind,
            subject_id: subject,
            state: EpistemicState::Known,
            uncertainty_q16: 0,
            latency_ticks: 0,
            observed_tick: 10,
            expires_tick: EXPIRES_NEVER,
            source_mask: 0,
        }
    }

    #[test]
    fn finalize_orders_by_triple() {
        let mut snap = CapabilitySnapshot::with_capacity(8);
        assert!(snap.add(entry(3, 0, 0)));
        assert!(snap.add(entry(1, 2, 9)));
        assert!(snap.add(entry(1, 2, 4)));
        assert!(snap.add(entry(1, 1, 9)));
        snap.finalize();
        let keys: Vec<(u32, u32, u64)> = snap
            .entries()
            .iter()
            .map(|e| (e.capability_id, e.subject_kind, e.subject_id))
            .collect();
        assert_eq!(keys, vec![(1, 1, 9), (1, 2, 4), (1, 2, 9), (3, 0, 0)]);
    }

    #[test]
    fn absent_capability_is_unknown() {
        let snap = CapabilitySnapshot::with_capacity(4);
        let view = epistemic_query(&snap, 1, 0, 0, 11);
        assert_eq!(view.state, EpistemicState::Unknown);
        assert_eq!(view.observed_tick, 0);
    }

    #[test]
    fn expired_entry_reads_unknown() {
        let mut snap = CapabilitySnapshot::with_capacity(4);
        let mut e = entry(1, 0, 0);
        e.expires_tick = 20;
        assert!(snap.add(e));
        assert_eq!(
            epistemic_query(&snap, 1, 0, 0, 19).state,
            EpistemicState::Known
        );
        assert_eq!(
            epistemic_query(&snap, 1, 0, 0, 20).state,
            EpistemicState::Unknown
        );
    }

    #[test]
    fn latency_drives_staleness() {
        let mut snap = CapabilitySnapshot::with_capacity(4);
        let mut e = entry(CapabilityKind::TimeReadout as u32, 0, 0);
        e.uncertainty_q16 = 4096;
        e.latency_ticks = 5;
        assert!(snap.add(e));
        let view = epistemic_query(&snap, CapabilityKind::TimeReadout as u32, 0, 0, 20);
        assert_eq!(view.state, EpistemicState::Known);
        assert!(view.is_stale);
        assert!(view.is_uncertain);

        let fresh = epistemic_query(&snap, CapabilityKind::TimeReadout as u32, 0, 0, 15);
        assert!(!fresh.is_stale);
    }

    #[test]
    fn zero_capability_id_rejected() {
        let mut snap = CapabilitySnapshot::with_capacity(4);
        assert!(!snap.add(entry(0, 0, 0)));
    }

    #[test]
    fn capacity_is_bounded() {
        let mut snap = CapabilitySnapshot::with_capacity(1);
        assert!(snap.add(entry(1, 0, 0)));
        assert!(!snap.add(entry(2, 0, 0)));
    }
}
