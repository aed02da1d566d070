// SPDX-License-Identifier: Apache-2.0
//! Readiness state and its due-time scheduler.
//!
//! Readiness is a clamped `0..=1000` level per subject. The scheduler owns
//! a sparse event table (liveness = `Some`) plus one due handle per active
//! event; events are plain deltas or supply checks that consume from a
//! store on success and apply a shortage delta on failure. A fired event
//! retires itself and the subject's `next_due_tick` is recomputed as the
//! minimum trigger over its remaining live events.

use thiserror::Error;

use crate::due::{DueDisposition, DueError, DueQueue, DueSource};
use crate::registry::{Keyed, Registry, RegistryError};
use crate::stores::{AssetId, StoreId, StoreRegistry};
use crate::tick::{Tick, TICK_NONE};

/// Readiness state identifier.
pub type ReadinessId = u64;

/// Full scale of a readiness level.
pub const READINESS_SCALE: u32 = 1000;

/// Errors surfaced by readiness storage and scheduling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    /// Zero id.
    #[error("invalid argument")]
    InvalidArgument,
    /// State id already registered.
    #[error("duplicate readiness id")]
    DuplicateId,
    /// Unknown state.
    #[error("readiness state not found")]
    NotFound,
    /// Registry or event table at capacity.
    #[error("readiness capacity exhausted")]
    Full,
    /// The due queue rejected the drain.
    #[error("readiness scheduler error: {0}")]
    Scheduler(#[from] DueError),
}

impl From<RegistryError> for ReadinessError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Readiness level and rates for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadinessState {
    /// State id, nonzero.
    pub readiness_id: ReadinessId,
    /// Current level, `0..=1000`.
    pub level: u32,
    /// Level lost per degradation event.
    pub degradation_rate: u32,
    /// Level gained per recovery event.
    pub recovery_rate: u32,
    /// Tick of the last applied delta.
    pub last_update_tick: Tick,
    /// Minimum trigger over live events, [`TICK_NONE`] when idle.
    pub next_due_tick: Tick,
}

impl Keyed for ReadinessState {
    fn key(&self) -> u64 {
        self.readiness_id
    }
}

/// Id-sorted readiness table.
#[derive(Debug)]
pub struct ReadinessRegistry {
    states: Registry<ReadinessState>,
}

impl ReadinessRegistry {
    /// Creates an empty registry bounded at `capacity` states.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Registry::with_capacity(capacity),
        }
    }

    /// Registers a state, clamping the starting level.
    pub fn register(
        &mut self,
        readiness_id: ReadinessId,
        level: u32,
        degradation_rate: u32,
        recovery_rate: u32,
    ) -> Result<(), ReadinessError> {
        self.states.insert(ReadinessState {
            readiness_id,
            level: level.min(READINESS_SCALE),
            degradation_rate,
            recovery_rate,
            last_update_tick: 0,
            next_due_tick: TICK_NONE,
        })?;
        Ok(())
    }

    /// Looks up a state.
    #[must_use]
    pub fn get(&self, readiness_id: ReadinessId) -> Option<&ReadinessState> {
        self.states.get(readiness_id)
    }

    /// Looks up a state for mutation.
    #[must_use]
    pub fn get_mut(&mut self, readiness_id: ReadinessId) -> Option<&mut ReadinessState> {
        self.states.get_mut(readiness_id)
    }

    /// Number of registered states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no states are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// True when no further state can be registered.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.states.is_full()
    }

    /// Applies a clamped delta and stamps the update tick.
    pub fn apply_delta(
        &mut self,
        readiness_id: ReadinessId,
        delta: i32,
        update_tick: Tick,
    ) -> Result<u32, ReadinessError> {
        let state = self
            .states
            .get_mut(readiness_id)
            .ok_or(ReadinessError::NotFound)?;
        let next = (i64::from(state.level) + i64::from(delta))
            .clamp(0, i64::from(READINESS_SCALE));
        state.level = next as u32;
        state.last_update_tick = update_tick;
        Ok(state.level)
    }
}

/// What a readiness event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessEventKind {
    /// Apply `delta` unconditionally.
    Delta,
    /// Consume supply; apply `delta` only when consumption fails.
    SupplyCheck {
        /// Store consumed from.
        store_ref: StoreId,
        /// Asset consumed.
        asset_id: AssetId,
        /// Quantity required.
        qty: u32,
    },
}

/// A scheduled readiness event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessEvent {
    /// Event id, nonzero and unique per scheduler.
    pub event_id: u64,
    /// Subject state.
    pub readiness_id: ReadinessId,
    /// Delta applied on firing (shortage delta for supply checks).
    pub delta: i32,
    /// Trigger tick; [`TICK_NONE`] once consumed.
    pub trigger_tick: Tick,
    /// Event behavior.
    pub kind: ReadinessEventKind,
}

/// Due-queue scheduler over readiness events.
#[derive(Debug)]
pub struct ReadinessScheduler {
    queue: DueQueue,
    events: Vec<Option<ReadinessEvent>>,
    next_event_id: u64,
    processed_last: u32,
    processed_total: u32,
}

struct ReadinessDrain<'a> {
    events: &'a mut [Option<ReadinessEvent>],
    registry: &'a mut ReadinessRegistry,
    stores: Option<&'a mut StoreRegistry>,
    processed: u32,
}

fn recompute_next_due(
    events: &[Option<ReadinessEvent>],
    registry: &mut ReadinessRegistry,
    readiness_id: ReadinessId,
) {
    let mut next = TICK_NONE;
    for event in events.iter().flatten() {
        if event.readiness_id == readiness_id
            && event.trigger_tick != TICK_NONE
            && event.trigger_tick < next
        {
            next = event.trigger_tick;
        }
    }
    if let Some(state) = registry.get_mut(readiness_id) {
        state.next_due_tick = next;
    }
}

impl DueSource for ReadinessDrain<'_> {
    fn next_tick(&self, event_id: u64, _now: Tick) -> Tick {
        self.events
            .iter()
            .flatten()
            .find(|e| e.event_id == event_id)
            .map_or(TICK_NONE, |e| e.trigger_tick)
    }

    fn process_until(&mut self, event_id: u64, target: Tick) -> Result<DueDisposition, DueError> {
        let slot = self
            .events
            .iter()
            .position(|e| e.as_ref().is_some_and(|ev| ev.event_id == event_id))
            .ok_or(DueError::Invalid)?;
        let Some(event) = self.events[slot] else {
            return Err(DueError::Invalid);
        };
        if event.trigger_tick == TICK_NONE || event.trigger_tick > target {
            return Ok(DueDisposition::Pending);
        }
        // An inconsistent subject no-ops but still retires the event; the
        // scheduler never stays in an intermediate state.
        match event.kind {
            ReadinessEventKind::Delta => {
                let _ = self
                    .registry
                    .apply_delta(event.readiness_id, event.delta, event.trigger_tick);
            }
            ReadinessEventKind::SupplyCheck {
                store_ref,
                asset_id,
                qty,
            } => {
                let supplied = self
                    .stores
                    .as_mut()
                    .is_some_and(|stores| stores.consume(store_ref, asset_id, qty).is_ok());
                if !supplied && event.delta != 0 {
                    let _ = self
                        .registry
                        .apply_delta(event.readiness_id, event.delta, event.trigger_tick);
                }
            }
        }
        self.events[slot] = None;
        self.processed += 1;
        recompute_next_due(self.events, self.registry, event.readiness_id);
        Ok(DueDisposition::Retired)
    }
}

impl ReadinessScheduler {
    /// Creates a scheduler with `event_capacity` event slots starting at
    /// `start_tick`; event ids begin at `start_event_id` (zero maps to one).
    #[must_use]
    pub fn new(event_capacity: usize, start_tick: Tick, start_event_id: u64) -> Self {
        Self {
            queue: DueQueue::new(event_capacity, start_tick),
            events: vec![None; event_capacity],
            next_event_id: if start_event_id == 0 { 1 } else { start_event_id },
            processed_last: 0,
            processed_total: 0,
        }
    }

    /// Events processed by the most recent `advance`.
    #[must_use]
    pub fn processed_last(&self) -> u32 {
        self.processed_last
    }

    /// Events processed over the scheduler's lifetime.
    #[must_use]
    pub fn processed_total(&self) -> u32 {
        self.processed_total
    }

    /// Number of live (unfired) events.
    #[must_use]
    pub fn live_events(&self) -> usize {
        self.events.iter().flatten().count()
    }

    fn schedule(
        &mut self,
        registry: &mut ReadinessRegistry,
        event: ReadinessEvent,
    ) -> Result<u64, ReadinessError> {
        let slot = self
            .events
            .iter()
            .position(Option::is_none)
            .ok_or(ReadinessError::Full)?;
        self.queue.register(event.event_id)?;
        self.events[slot] = Some(event);
        recompute_next_due(&self.events, registry, event.readiness_id);
        Ok(event.event_id)
    }

    /// Schedules a plain delta event; returns its event id.
    pub fn schedule_event(
        &mut self,
        registry: &mut ReadinessRegistry,
        readiness_id: ReadinessId,
        delta: i32,
        trigger_tick: Tick,
    ) -> Result<u64, ReadinessError> {
        if readiness_id == 0 {
            return Err(ReadinessError::InvalidArgument);
        }
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        self.schedule(
            registry,
            ReadinessEvent {
                event_id,
                readiness_id,
                delta,
                trigger_tick,
                kind: ReadinessEventKind::Delta,
            },
        )
    }

    /// Schedules a supply check: on firing it consumes
    /// `(asset_id, qty)` from `store_ref`, or applies `shortage_delta`.
    pub fn schedule_supply_check(
        &mut self,
        registry: &mut ReadinessRegistry,
        readiness_id: ReadinessId,
        trigger_tick: Tick,
        store_ref: StoreId,
        asset_id: AssetId,
        qty: u32,
        shortage_delta: i32,
    ) -> Result<u64, ReadinessError> {
        if readiness_id == 0 {
            return Err(ReadinessError::InvalidArgument);
        }
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        self.schedule(
            registry,
            ReadinessEvent {
                event_id,
                readiness_id,
                delta: shortage_delta,
                trigger_tick,
                kind: ReadinessEventKind::SupplyCheck {
                    store_ref,
                    asset_id,
                    qty,
                },
            },
        )
    }

    /// Drains every event due at or before `target_tick`.
    pub fn advance(
        &mut self,
        registry: &mut ReadinessRegistry,
        stores: Option<&mut StoreRegistry>,
        target_tick: Tick,
    ) -> Result<u32, ReadinessError> {
        let mut drain = ReadinessDrain {
            events: &mut self.events,
            registry,
            stores,
            processed: 0,
        };
        self.queue.advance(&mut drain, target_tick)?;
        self.processed_last = drain.processed;
        self.processed_total += drain.processed;
        Ok(self.processed_last)
    }

    /// Minimum trigger over live events, [`TICK_NONE`] when idle.
    #[must_use]
    pub fn next_due(&self) -> Tick {
        self.events
            .iter()
            .flatten()
            .filter(|e| e.trigger_tick != TICK_NONE)
            .map(|e| e.trigger_tick)
            .min()
            .unwrap_or(TICK_NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_event_fires_once_and_retires() {
        let mut registry = ReadinessRegistry::with_capacity(4);
        registry.register(1, 500, 50, 20).unwrap();
        let mut sched = ReadinessScheduler::new(8, 0, 1);
        sched.schedule_event(&mut registry, 1, 100, 10).unwrap();
        assert_eq!(registry.get(1).unwrap().next_due_tick, 10);

        assert_eq!(sched.advance(&mut registry, None, 9).unwrap(), 0);
        assert_eq!(sched.advance(&mut registry, None, 10).unwrap(), 1);
        assert_eq!(registry.get(1).unwrap().level, 600);
        assert_eq!(registry.get(1).unwrap().next_due_tick, TICK_NONE);
        assert_eq!(sched.live_events(), 0);

        // Re-advancing does not re-fire.
        assert_eq!(sched.advance(&mut registry, None, 20).unwrap(), 0);
        assert_eq!(registry.get(1).unwrap().level, 600);
    }

    #[test]
    fn supply_check_consumes_or_degrades() {
        let mut registry = ReadinessRegistry::with_capacity(4);
        registry.register(1, 800, 50, 20).unwrap();
        let mut stores = StoreRegistry::with_capacity(4);
        stores.register(7).unwrap();
        stores.add(7, 42, 5).unwrap();

        let mut sched = ReadinessScheduler::new(8, 0, 1);
        sched
            .schedule_supply_check(&mut registry, 1, 10, 7, 42, 5, -50)
            .unwrap();
        sched.advance(&mut registry, Some(&mut stores), 10).unwrap();
        // Supply was available: consumed, no delta.
        assert_eq!(registry.get(1).unwrap().level, 800);
        assert_eq!(stores.get_qty(7, 42).unwrap(), 0);

        // Second check finds the store empty and applies the shortage delta.
        sched
            .schedule_supply_check(&mut registry, 1, 20, 7, 42, 5, -50)
            .unwrap();
        sched.advance(&mut registry, Some(&mut stores), 20).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 750);
    }

    #[test]
    fn levels_clamp_to_scale() {
        let mut registry = ReadinessRegistry::with_capacity(4);
        registry.register(1, 990, 0, 0).unwrap();
        registry.apply_delta(1, 100, 5).unwrap();
        assert_eq!(registry.get(1).unwrap().level, READINESS_SCALE);
        registry.apply_delta(1, -5000, 6).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 0);
    }

    #[test]
    fn next_due_tracks_minimum_live_trigger() {
        let mut registry = ReadinessRegistry::with_capacity(4);
        registry.register(1, 500, 0, 0).unwrap();
        let mut sched = ReadinessScheduler::new(8, 0, 1);
        sched.schedule_event(&mut registry, 1, 1, 30).unwrap();
        sched.schedule_event(&mut registry, 1, 1, 20).unwrap();
        assert_eq!(sched.next_due(), 20);
        assert_eq!(registry.get(1).unwrap().next_due_tick, 20);
        sched.advance(&mut registry, None, 20).unwrap();
        assert_eq!(registry.get(1).unwrap().next_due_tick, 30);
    }

    #[test]
    fn event_table_capacity_is_bounded() {
        let mut registry = ReadinessRegistry::with_capacity(4);
        registry.register(1, 500, 0, 0).unwrap();
        let mut sched = ReadinessScheduler::new(1, 0, 1);
        sched.schedule_event(&mut registry, 1, 1, 10).unwrap();
        assert_eq!(
            sched.schedule_event(&mut registry, 1, 1, 11).unwrap_err(),
            ReadinessError::Full
        );
    }
}
