// SPDX-License-Identifier: Apache-2.0
//! Morale state and its due-time scheduler.
//!
//! Mirrors the readiness scheduler with one different conditional event:
//! a legitimacy check reads the referenced legitimacy state and applies its
//! delta only when the value is below the configured minimum.

use thiserror::Error;

use crate::due::{DueDisposition, DueError, DueQueue, DueSource};
use crate::governance::{LegitimacyId, LegitimacyRegistry};
use crate::registry::{Keyed, Registry, RegistryError};
use crate::tick::{Tick, TICK_NONE};

/// Morale state identifier.
pub type MoraleId = u64;

/// Full scale of a morale level.
pub const MORALE_SCALE: u32 = 1000;

/// Errors surfaced by morale storage and scheduling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoraleError {
    /// Zero id.
    #[error("invalid argument")]
    InvalidArgument,
    /// State id already registered.
    #[error("duplicate morale id")]
    DuplicateId,
    /// Unknown state.
    #[error("morale state not found")]
    NotFound,
    /// Registry or event table at capacity.
    #[error("morale capacity exhausted")]
    Full,
    /// The due queue rejected the drain.
    #[error("morale scheduler error: {0}")]
    Scheduler(#[from] DueError),
}

impl From<RegistryError> for MoraleError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Standing modifiers folded into morale presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoraleModifiers {
    /// Supply situation contribution.
    pub supply: i32,
    /// Recent victories contribution.
    pub victories: i32,
    /// Recent losses contribution.
    pub losses: i32,
    /// Owning-organization legitimacy contribution.
    pub legitimacy: i32,
}

/// Morale level for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoraleState {
    /// State id, nonzero.
    pub morale_id: MoraleId,
    /// Current level, `0..=1000`.
    pub level: u32,
    /// Standing modifiers.
    pub modifiers: MoraleModifiers,
    /// Minimum trigger over live events, [`TICK_NONE`] when idle.
    pub next_due_tick: Tick,
}

impl Keyed for MoraleState {
    fn key(&self) -> u64 {
        self.morale_id
    }
}

/// Id-sorted morale table.
#[derive(Debug)]
pub struct MoraleRegistry {
    states: Registry<MoraleState>,
}

impl MoraleRegistry {
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
        morale_id: MoraleId,
        level: u32,
        modifiers: MoraleModifiers,
    ) -> Result<(), MoraleError> {
        self.states.insert(MoraleState {
            morale_id,
            level: level.min(MORALE_SCALE),
            modifiers,
            next_due_tick: TICK_NONE,
        })?;
        Ok(())
    }

    /// Looks up a state.
    #[must_use]
    pub fn get(&self, morale_id: MoraleId) -> Option<&MoraleState> {
        self.states.get(morale_id)
    }

    /// Looks up a state for mutation.
    #[must_use]
    pub fn get_mut(&mut self, morale_id: MoraleId) -> Option<&mut MoraleState> {
        self.states.get_mut(morale_id)
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

    /// Applies a clamped delta.
    pub fn apply_delta(&mut self, morale_id: MoraleId, delta: i32) -> Result<u32, MoraleError> {
        let state = self.states.get_mut(morale_id).ok_or(MoraleError::NotFound)?;
        let next = (i64::from(state.level) + i64::from(delta)).clamp(0, i64::from(MORALE_SCALE));
        state.level = next as u32;
        Ok(state.level)
    }

    /// Replaces the standing modifiers.
    pub fn set_modifiers(
        &mut self,
        morale_id: MoraleId,
        modifiers: MoraleModifiers,
    ) -> Result<(), MoraleError> {
        let state = self.states.get_mut(morale_id).ok_or(MoraleError::NotFound)?;
        state.modifiers = modifiers;
        Ok(())
    }
}

/// What a morale event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoraleEventKind {
    /// Apply `delta` unconditionally.
    Delta,
    /// Apply `delta` only when the legitimacy value is below `min_value`.
    LegitimacyCheck {
        /// Legitimacy state consulted.
        legitimacy_id: LegitimacyId,
        /// Threshold below which the delta applies.
        min_value: u32,
    },
}

/// A scheduled morale event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoraleEvent {
    /// Event id, nonzero and unique per scheduler.
    pub event_id: u64,
    /// Subject state.
    pub morale_id: MoraleId,
    /// Delta applied on firing.
    pub delta: i32,
    /// Trigger tick; [`TICK_NONE`] once consumed.
    pub trigger_tick: Tick,
    /// Event behavior.
    pub kind: MoraleEventKind,
}

/// Due-queue scheduler over morale events.
#[derive(Debug)]
pub struct MoraleScheduler {
    queue: DueQueue,
    events: Vec<Option<MoraleEvent>>,
    next_event_id: u64,
    processed_last: u32,
    processed_total: u32,
}

struct MoraleDrain<'a> {
    events: &'a mut [Option<MoraleEvent>],
    registry: &'a mut MoraleRegistry,
    legitimacy: Option<&'a LegitimacyRegistry>,
    processed: u32,
}

fn recompute_next_due(
    events: &[Option<MoraleEvent>],
    registry: &mut MoraleRegistry,
    morale_id: MoraleId,
) {
    let mut next = TICK_NONE;
    for event in events.iter().flatten() {
        if event.morale_id == morale_id
            && event.trigger_tick != TICK_NONE
            && event.trigger_tick < next
        {
            next = event.trigger_tick;
        }
    }
    if let Some(state) = registry.get_mut(morale_id) {
        state.next_due_tick = next;
    }
}

impl DueSource for MoraleDrain<'_> {
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
        match event.kind {
            MoraleEventKind::Delta => {
                let _ = self.registry.apply_delta(event.morale_id, event.delta);
            }
            MoraleEventKind::LegitimacyCheck {
                legitimacy_id,
                min_value,
            } => {
                // A missing registry or record reads as below-threshold:
                // unverifiable legitimacy never shields morale.
                let below = self
                    .legitimacy
                    .and_then(|reg| reg.get(legitimacy_id))
                    .map_or(true, |state| state.value < min_value);
                if below && event.delta != 0 {
                    let _ = self.registry.apply_delta(event.morale_id, event.delta);
                }
            }
        }
        self.events[slot] = None;
        self.processed += 1;
        recompute_next_due(self.events, self.registry, event.morale_id);
        Ok(DueDisposition::Retired)
    }
}

impl MoraleScheduler {
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
        registry: &mut MoraleRegistry,
        event: MoraleEvent,
    ) -> Result<u64, MoraleError> {
        let slot = self
            .events
            .iter()
            .position(Option::is_none)
            .ok_or(MoraleError::Full)?;
        self.queue.register(event.event_id)?;
        self.events[slot] = Some(event);
        recompute_next_due(&self.events, registry, event.morale_id);
        Ok(event.event_id)
    }

    /// Schedules a plain delta event; returns its event id.
    pub fn schedule_event(
        &mut self,
        registry: &mut MoraleRegistry,
        morale_id: MoraleId,
        delta: i32,
        trigger_tick: Tick,
    ) -> Result<u64, MoraleError> {
        if morale_id == 0 {
            return Err(MoraleError::InvalidArgument);
        }
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        self.schedule(
            registry,
            MoraleEvent {
                event_id,
                morale_id,
                delta,
                trigger_tick,
                kind: MoraleEventKind::Delta,
            },
        )
    }

    /// Schedules a legitimacy check firing at `trigger_tick`.
    pub fn schedule_legitimacy_check(
        &mut self,
        registry: &mut MoraleRegistry,
        morale_id: MoraleId,
        trigger_tick: Tick,
        legitimacy_id: LegitimacyId,
        min_value: u32,
        delta_if_below: i32,
    ) -> Result<u64, MoraleError> {
        if morale_id == 0 {
            return Err(MoraleError::InvalidArgument);
        }
        let event_id = self.next_event_id;
        self.next_event_id += 1;
        self.schedule(
            registry,
            MoraleEvent {
                event_id,
                morale_id,
                delta: delta_if_below,
                trigger_tick,
                kind: MoraleEventKind::LegitimacyCheck {
                    legitimacy_id,
                    min_value,
                },
            },
        )
    }

    /// Drains every event due at or before `target_tick`.
    pub fn advance(
        &mut self,
        registry: &mut MoraleRegistry,
        legitimacy: Option<&LegitimacyRegistry>,
        target_tick: Tick,
    ) -> Result<u32, MoraleError> {
        let mut drain = MoraleDrain {
            events: &mut self.events,
            registry,
            legitimacy,
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
    fn legitimacy_check_applies_only_below_minimum() {
        let mut registry = MoraleRegistry::with_capacity(4);
        registry
            .register(1, 600, MoraleModifiers::default())
            .unwrap();
        let mut legitimacy = LegitimacyRegistry::with_capacity(4);
        legitimacy.register(9, 700).unwrap();

        let mut sched = MoraleScheduler::new(8, 0, 1);
        sched
            .schedule_legitimacy_check(&mut registry, 1, 10, 9, 500, -40)
            .unwrap();
        sched.advance(&mut registry, Some(&legitimacy), 10).unwrap();
        // 700 >= 500: no penalty.
        assert_eq!(registry.get(1).unwrap().level, 600);

        legitimacy.apply_delta(9, -400).unwrap();
        sched
            .schedule_legitimacy_check(&mut registry, 1, 20, 9, 500, -40)
            .unwrap();
        sched.advance(&mut registry, Some(&legitimacy), 20).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 560);
    }

    #[test]
    fn missing_legitimacy_record_counts_as_below_threshold() {
        let mut registry = MoraleRegistry::with_capacity(4);
        registry
            .register(1, 600, MoraleModifiers::default())
            .unwrap();
        let legitimacy = LegitimacyRegistry::with_capacity(4);

        // Id 9 was never registered: the penalty fires.
        let mut sched = MoraleScheduler::new(8, 0, 1);
        sched
            .schedule_legitimacy_check(&mut registry, 1, 10, 9, 500, -40)
            .unwrap();
        sched.advance(&mut registry, Some(&legitimacy), 10).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 560);

        // No legitimacy registry at all: same pessimistic outcome.
        sched
            .schedule_legitimacy_check(&mut registry, 1, 20, 9, 500, -40)
            .unwrap();
        sched.advance(&mut registry, None, 20).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 520);
    }

    #[test]
    fn delta_event_round_trip() {
        let mut registry = MoraleRegistry::with_capacity(4);
        registry
            .register(1, 500, MoraleModifiers::default())
            .unwrap();
        let mut sched = MoraleScheduler::new(8, 0, 1);
        sched.schedule_event(&mut registry, 1, -75, 5).unwrap();
        sched.advance(&mut registry, None, 5).unwrap();
        assert_eq!(registry.get(1).unwrap().level, 425);
        assert_eq!(registry.get(1).unwrap().next_due_tick, TICK_NONE);
        assert_eq!(sched.processed_total(), 1);
    }
}
