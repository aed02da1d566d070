// SPDX-License-Identifier: Apache-2.0
//! Due-time dispatch substrate.
//!
//! A [`DueQueue`] owns a capacity-bounded table of event handles and a
//! monotone `now` tick. The owning scheduler implements [`DueSource`] over
//! its event storage; `advance` repeatedly selects the live handle whose
//! `next_tick` is minimal (event id breaks ties) and dispatches it once.
//!
//! Ordering invariant: events are processed in non-decreasing trigger-tick
//! order, ties broken by ascending event id.
//!
//! No reentrancy: `advance` holds `&mut self` for its whole drain, so a
//! process callback cannot call `register` or `advance` on the queue that
//! is currently advancing it.

use thiserror::Error;

use crate::tick::{Tick, TICK_NONE};

/// Errors surfaced by the due queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DueError {
    /// No free handle was available at `register`.
    #[error("due queue full")]
    Full,
    /// Malformed input (zero event id) or a callback that failed to retire
    /// its event while claiming it was due.
    #[error("due queue invalid input or stuck callback")]
    Invalid,
}

/// What a process callback did with its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDisposition {
    /// The event was consumed; its handle is released.
    Retired,
    /// The event remains scheduled (its trigger moved into the future).
    Pending,
}

/// Event storage owned by a concrete scheduler, dispatched by a [`DueQueue`].
pub trait DueSource {
    /// Trigger tick of the event behind `event_id`, or [`TICK_NONE`] when
    /// it is not currently scheduled.
    fn next_tick(&self, event_id: u64, now: Tick) -> Tick;

    /// Processes the event once. Called only when its trigger is `<= target`
    /// and not [`TICK_NONE`]. Consumed events must report
    /// [`DueDisposition::Retired`].
    fn process_until(&mut self, event_id: u64, target: Tick) -> Result<DueDisposition, DueError>;
}

/// Handle to a registered due entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueHandle(usize);

#[derive(Debug, Clone, Copy)]
struct DueEntry {
    event_id: u64,
    in_use: bool,
}

/// Ordered (tick, event id) dispatch queue.
#[derive(Debug)]
pub struct DueQueue {
    entries: Vec<DueEntry>,
    now: Tick,
}

impl DueQueue {
    /// Creates a queue with a fixed handle capacity starting at `start_tick`.
    #[must_use]
    pub fn new(capacity: usize, start_tick: Tick) -> Self {
        Self {
            entries: vec![
                DueEntry {
                    event_id: 0,
                    in_use: false,
                };
                capacity
            ],
            now: start_tick,
        }
    }

    /// Current queue time (the last advance target).
    #[must_use]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Number of live handles.
    #[must_use]
    pub fn live(&self) -> usize {
        self.entries.iter().filter(|e| e.in_use).count()
    }

    /// Registers an event handle. Fails with [`DueError::Full`] when every
    /// slot is taken and [`DueError::Invalid`] on a zero event id.
    pub fn register(&mut self, event_id: u64) -> Result<DueHandle, DueError> {
        if event_id == 0 {
            return Err(DueError::Invalid);
        }
        let slot = self
            .entries
            .iter()
            .position(|e| !e.in_use)
            .ok_or(DueError::Full)?;
        self.entries[slot] = DueEntry {
            event_id,
            in_use: true,
        };
        Ok(DueHandle(slot))
    }

    /// Releases a handle; releasing a free handle is a no-op.
    pub fn release(&mut self, handle: DueHandle) {
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.in_use = false;
            entry.event_id = 0;
        }
    }

    /// Minimum trigger tick across live handles, [`TICK_NONE`] when idle.
    #[must_use]
    pub fn next_due<S: DueSource>(&self, source: &S) -> Tick {
        let mut best = TICK_NONE;
        for entry in self.entries.iter().filter(|e| e.in_use) {
            let t = source.next_tick(entry.event_id, self.now);
            if t < best {
                best = t;
            }
        }
        best
    }

    /// Drains every event due at or before `target_tick`, in
    /// `(trigger, event_id)` order, dispatching each exactly once.
    /// Returns the number of events processed.
    pub fn advance<S: DueSource>(
        &mut self,
        source: &mut S,
        target_tick: Tick,
    ) -> Result<u32, DueError> {
        let mut processed = 0u32;
        loop {
            let mut best_slot: Option<usize> = None;
            let mut best_tick = TICK_NONE;
            let mut best_id = u64::MAX;
            for (slot, entry) in self.entries.iter().enumerate() {
                if !entry.in_use {
                    continue;
                }
                let t = source.next_tick(entry.event_id, self.now);
                if t < best_tick || (t == best_tick && entry.event_id < best_id) {
                    best_slot = Some(slot);
                    best_tick = t;
                    best_id = entry.event_id;
                }
            }
            let Some(slot) = best_slot else { break };
            if best_tick == TICK_NONE || best_tick > target_tick {
                break;
            }
            match source.process_until(best_id, target_tick)? {
                DueDisposition::Retired => self.release(DueHandle(slot)),
                DueDisposition::Pending => {
                    // A kept event must have moved its trigger forward,
                    // otherwise the drain cannot terminate.
                    let after = source.next_tick(best_id, self.now);
                    if after <= best_tick {
                        return Err(DueError::Invalid);
                    }
                }
            }
            processed += 1;
        }
        self.now = target_tick.max(self.now);
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEvents {
        // (event_id, trigger)
        events: Vec<(u64, Tick)>,
        fired: Vec<u64>,
    }

    impl DueSource for FakeEvents {
        fn next_tick(&self, event_id: u64, _now: Tick) -> Tick {
            self.events
                .iter()
                .find(|(id, _)| *id == event_id)
                .map_or(TICK_NONE, |(_, t)| *t)
        }

        fn process_until(
            &mut self,
            event_id: u64,
            _target: Tick,
        ) -> Result<DueDisposition, DueError> {
            self.fired.push(event_id);
            if let Some(ev) = self.events.iter_mut().find(|(id, _)| *id == event_id) {
                ev.1 = TICK_NONE;
            }
            Ok(DueDisposition::Retired)
        }
    }

    #[test]
    fn drains_in_tick_then_id_order() {
        let mut src = FakeEvents {
            events: vec![(3, 10), (1, 10), (2, 5), (4, 99)],
            fired: Vec::new(),
        };
        let mut q = DueQueue::new(8, 0);
        for id in [3, 1, 2, 4] {
            q.register(id).unwrap();
        }
        let n = q.advance(&mut src, 20).unwrap();
        assert_eq!(n, 3);
        assert_eq!(src.fired, vec![2, 1, 3]);
        assert_eq!(q.next_due(&src), 99);
    }

    #[test]
    fn full_queue_rejects_registration() {
        let mut q = DueQueue::new(1, 0);
        q.register(1).unwrap();
        assert_eq!(q.register(2).unwrap_err(), DueError::Full);
    }

    #[test]
    fn zero_event_id_is_invalid() {
        let mut q = DueQueue::new(1, 0);
        assert_eq!(q.register(0).unwrap_err(), DueError::Invalid);
    }

    #[test]
    fn stuck_callback_is_detected() {
        struct Stuck;
        impl DueSource for Stuck {
            fn next_tick(&self, _event_id: u64, _now: Tick) -> Tick {
                3
            }
            fn process_until(
                &mut self,
                _event_id: u64,
                _target: Tick,
            ) -> Result<DueDisposition, DueError> {
                Ok(DueDisposition::Pending)
            }
        }
        let mut q = DueQueue::new(1, 0);
        q.register(7).unwrap();
        assert_eq!(q.advance(&mut Stuck, 10).unwrap_err(), DueError::Invalid);
    }
}
