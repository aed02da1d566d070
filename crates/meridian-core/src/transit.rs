// SPDX-License-Identifier: Apache-2.0
//! Cosmographic transit state: one interstellar crossing at a time.

use crate::tick::Tick;

/// State of the kernel's single transit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CosmoTransit {
    /// A crossing is underway or completed-but-unacknowledged.
    pub active: bool,
    /// Origin node.
    pub origin: u64,
    /// Destination node.
    pub destination: u64,
    /// Departure tick.
    pub departure_tick: Tick,
    /// Arrival tick.
    pub arrival_tick: Tick,
    /// Arrival has been observed by the driver.
    pub arrived: bool,
}

impl CosmoTransit {
    /// Begins a crossing; rejects zero endpoints, identical endpoints, and
    /// non-future arrivals.
    pub fn begin(
        &mut self,
        origin: u64,
        destination: u64,
        departure_tick: Tick,
        arrival_tick: Tick,
    ) -> bool {
        if origin == 0 || destination == 0 || origin == destination {
            return false;
        }
        if arrival_tick <= departure_tick {
            return false;
        }
        *self = Self {
            active: true,
            origin,
            destination,
            departure_tick,
            arrival_tick,
            arrived: false,
        };
        true
    }

    /// Advances the transit to `now`; returns true on the tick the arrival
    /// is first observed.
    pub fn tick(&mut self, now: Tick) -> bool {
        if !self.active || self.arrived {
            return false;
        }
        if now >= self.arrival_tick {
            self.arrived = true;
            return true;
        }
        false
    }

    /// Clears the slot.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Canonical state blob (ORBT chunk payload).
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u32::from(self.active).to_le_bytes());
        out.extend_from_slice(&u32::from(self.arrived).to_le_bytes());
        out.extend_from_slice(&self.origin.to_le_bytes());
        out.extend_from_slice(&self.destination.to_le_bytes());
        out.extend_from_slice(&self.departure_tick.to_le_bytes());
        out.extend_from_slice(&self.arrival_tick.to_le_bytes());
    }

    /// Parses a state blob; `None` on malformed bytes.
    #[must_use]
    pub fn decode_blob(blob: &[u8]) -> Option<Self> {
        if blob.len() != 40 {
            return None;
        }
        let active = u32::from_le_bytes(blob[0..4].try_into().ok()?);
        let arrived = u32::from_le_bytes(blob[4..8].try_into().ok()?);
        if active > 1 || arrived > 1 {
            return None;
        }
        Some(Self {
            active: active == 1,
            arrived: arrived == 1,
            origin: u64::from_le_bytes(blob[8..16].try_into().ok()?),
            destination: u64::from_le_bytes(blob[16..24].try_into().ok()?),
            departure_tick: u64::from_le_bytes(blob[24..32].try_into().ok()?),
            arrival_tick: u64::from_le_bytes(blob[32..40].try_into().ok()?),
        })
    }
}
