// SPDX-License-Identifier: Apache-2.0
//! Time-ordered macro events mutating the macro economy.
//!
//! Events are kept sorted by `(trigger_tick, event_id)` behind a monotone
//! cursor. Scheduling is only accepted strictly in the future relative to
//! the scheduler's clock, so an applied event can never be re-ordered
//! behind the cursor.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::economy::{EconomyError, MacroEconomy, ScopeKind};
use crate::station::ResourceId;
use crate::tick::Tick;

/// Macro event identifier.
pub type MacroEventId = u64;

/// Errors surfaced by the macro event scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MacroEventError {
    /// Zero event/scope id or invalid scope kind.
    #[error("invalid argument")]
    InvalidArgument,
    /// Event id already scheduled.
    #[error("duplicate event id")]
    DuplicateId,
    /// Unknown event id.
    #[error("event not found")]
    NotFound,
    /// An effect names resource zero, or update ran backwards.
    #[error("invalid event data")]
    InvalidData,
    /// Trigger tick is not strictly after the scheduler clock.
    #[error("trigger tick not in the future")]
    TooEarly,
}

/// One economy mutation carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroEventEffect {
    /// Resource whose rates shift, nonzero.
    pub resource_id: ResourceId,
    /// Production-rate delta.
    pub production_delta: i64,
    /// Demand-rate delta.
    pub demand_delta: i64,
    /// Scope flags to set.
    pub flags_set: u32,
    /// Scope flags to clear.
    pub flags_clear: u32,
}

/// A scheduled macro event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEvent {
    /// Event id, nonzero and unique.
    pub event_id: MacroEventId,
    /// Target scope kind.
    pub scope_kind: ScopeKind,
    /// Target scope id, nonzero.
    pub scope_id: u64,
    /// Tick the effects apply at.
    pub trigger_tick: Tick,
    /// Effects applied in order at the trigger tick.
    pub effects: Vec<MacroEventEffect>,
}

/// Ordered event list with a monotone application cursor.
#[derive(Debug, Default)]
pub struct MacroEvents {
    events: Vec<MacroEvent>,
    // Lookaside for duplicate detection only; never iterated, never hashed.
    scheduled_ids: FxHashSet<MacroEventId>,
    cursor: usize,
    last_tick: Tick,
    has_last_tick: bool,
}

impl MacroEvents {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled events (applied ones included until reset).
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last `update`/`seek` tick, zero before the first call.
    #[must_use]
    pub fn last_tick(&self) -> Tick {
        if self.has_last_tick {
            self.last_tick
        } else {
            0
        }
    }

    /// Events in `(trigger_tick, event_id)` order.
    #[must_use]
    pub fn events(&self) -> &[MacroEvent] {
        &self.events
    }

    /// Looks up an event by id.
    #[must_use]
    pub fn get(&self, event_id: MacroEventId) -> Option<&MacroEvent> {
        self.events.iter().find(|e| e.event_id == event_id)
    }

    /// Resets events, cursor, and clock (save-load entry point).
    pub fn reset(&mut self) {
        self.events.clear();
        self.scheduled_ids.clear();
        self.cursor = 0;
        self.last_tick = 0;
        self.has_last_tick = false;
    }

    /// Schedules an event strictly in the future.
    pub fn schedule(&mut self, event: MacroEvent) -> Result<(), MacroEventError> {
        if event.event_id == 0 || event.scope_id == 0 {
            return Err(MacroEventError::InvalidArgument);
        }
        if self.scheduled_ids.contains(&event.event_id) {
            return Err(MacroEventError::DuplicateId);
        }
        if self.has_last_tick && event.trigger_tick <= self.last_tick {
            return Err(MacroEventError::TooEarly);
        }
        for effect in &event.effects {
            if effect.resource_id == 0 {
                return Err(MacroEventError::InvalidData);
            }
        }
        let pos = self
            .events
            .partition_point(|e| (e.trigger_tick, e.event_id) < (event.trigger_tick, event.event_id));
        self.scheduled_ids.insert(event.event_id);
        self.events.insert(pos, event);
        Ok(())
    }

    /// Applies every unapplied event with `trigger_tick <= now` to `econ`
    /// and advances the clock. `now == last_tick` is a no-op that still
    /// records the clock; `now < last_tick` fails.
    ///
    /// Effects target scopes that may have been unregistered since
    /// scheduling; such effects are skipped rather than failing the tick.
    pub fn update(&mut self, econ: &mut MacroEconomy, now: Tick) -> Result<u32, MacroEventError> {
        if self.has_last_tick && now < self.last_tick {
            return Err(MacroEventError::InvalidData);
        }
        let mut applied = 0u32;
        while self.cursor < self.events.len() {
            let event = &self.events[self.cursor];
            if event.trigger_tick > now {
                break;
            }
            for effect in &event.effects {
                let rate = econ.rate_delta(
                    event.scope_kind,
                    event.scope_id,
                    effect.resource_id,
                    effect.production_delta,
                    effect.demand_delta,
                );
                match rate {
                    Ok(()) | Err(EconomyError::NotFound) => {}
                    Err(EconomyError::Overflow) => {
                        // Saturate by skipping the overflowing effect; the
                        // cursor still advances so the event applies once.
                    }
                    Err(err) => {
                        debug_assert!(false, "rate_delta rejected event effect: {err}");
                    }
                }
                let _ = econ.flags_apply(
                    event.scope_kind,
                    event.scope_id,
                    effect.flags_set,
                    effect.flags_clear,
                );
            }
            self.cursor += 1;
            applied += 1;
        }
        self.last_tick = now;
        self.has_last_tick = true;
        Ok(applied)
    }

    /// Places the cursor at the first event with `trigger_tick > tick` and
    /// records the clock (save-load entry point).
    pub fn seek(&mut self, tick: Tick) {
        self.cursor = self.events.partition_point(|e| e.trigger_tick <= tick);
        self.last_tick = tick;
        self.has_last_tick = true;
    }

    /// Index of the next unapplied event.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Canonical state blob: last tick, count, then events in order with
    /// their effects.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.last_tick().to_le_bytes());
        out.extend_from_slice(&(self.events.len() as u32).to_le_bytes());
        for event in &self.events {
            out.extend_from_slice(&event.event_id.to_le_bytes());
            out.extend_from_slice(&event.scope_kind.code().to_le_bytes());
            out.extend_from_slice(&event.scope_id.to_le_bytes());
            out.extend_from_slice(&event.trigger_tick.to_le_bytes());
            out.extend_from_slice(&(event.effects.len() as u32).to_le_bytes());
            for effect in &event.effects {
                out.extend_from_slice(&effect.resource_id.to_le_bytes());
                out.extend_from_slice(&effect.production_delta.to_le_bytes());
                out.extend_from_slice(&effect.demand_delta.to_le_bytes());
                out.extend_from_slice(&effect.flags_set.to_le_bytes());
                out.extend_from_slice(&effect.flags_clear.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, trigger: Tick, prod_delta: i64) -> MacroEvent {
        MacroEvent {
            event_id: id,
            scope_kind: ScopeKind::System,
            scope_id: 5,
            trigger_tick: trigger,
            effects: vec![MacroEventEffect {
                resource_id: 700,
                production_delta: prod_delta,
                demand_delta: 0,
                flags_set: 0,
                flags_clear: 0,
            }],
        }
    }

    fn econ() -> MacroEconomy {
        let mut econ = MacroEconomy::new();
        econ.register(ScopeKind::System, 5).unwrap();
        econ
    }

    #[test]
    fn events_apply_once_in_order() {
        let mut econ = econ();
        let mut events = MacroEvents::new();
        events.schedule(event(2, 10, 1)).unwrap();
        events.schedule(event(1, 10, 10)).unwrap();
        events.schedule(event(3, 20, 100)).unwrap();

        assert_eq!(events.update(&mut econ, 10).unwrap(), 2);
        assert_eq!(econ.rate_get(ScopeKind::System, 5, 700).unwrap().0, 11);
        // Same tick again: no-op-but-update-cursor semantics.
        assert_eq!(events.update(&mut econ, 10).unwrap(), 0);
        assert_eq!(events.update(&mut econ, 25).unwrap(), 1);
        assert_eq!(econ.rate_get(ScopeKind::System, 5, 700).unwrap().0, 111);
    }

    #[test]
    fn scheduling_in_the_past_is_rejected() {
        let mut econ = econ();
        let mut events = MacroEvents::new();
        events.update(&mut econ, 50).unwrap();
        assert_eq!(
            events.schedule(event(1, 50, 1)).unwrap_err(),
            MacroEventError::TooEarly
        );
        events.schedule(event(1, 51, 1)).unwrap();
    }

    #[test]
    fn backwards_update_is_rejected() {
        let mut econ = econ();
        let mut events = MacroEvents::new();
        events.update(&mut econ, 50).unwrap();
        assert_eq!(
            events.update(&mut econ, 49).unwrap_err(),
            MacroEventError::InvalidData
        );
    }

    #[test]
    fn seek_places_cursor_past_applied_events() {
        let mut events = MacroEvents::new();
        events.schedule(event(1, 10, 1)).unwrap();
        events.schedule(event(2, 20, 1)).unwrap();
        events.seek(15);
        assert_eq!(events.cursor(), 1);
        assert_eq!(events.last_tick(), 15);
    }

    #[test]
    fn zero_resource_effect_rejected() {
        let mut events = MacroEvents::new();
        let mut ev = event(1, 10, 1);
        ev.effects[0].resource_id = 0;
        assert_eq!(
            events.schedule(ev).unwrap_err(),
            MacroEventError::InvalidData
        );
    }

    #[test]
    fn duplicate_event_id_rejected() {
        let mut events = MacroEvents::new();
        events.schedule(event(1, 10, 1)).unwrap();
        assert_eq!(
            events.schedule(event(1, 12, 1)).unwrap_err(),
            MacroEventError::DuplicateId
        );
    }
}
