// SPDX-License-Identifier: Apache-2.0
//! Lane scheduling and surface-chunk interest.
//!
//! The lane scheduler classifies the focused body into a kinematic regime
//! and produces an activation bubble; the surface-chunk set translates the
//! bubble into a deterministic chunk-key interest window. Both feed the
//! driver's tick loop and persist through the surface chunk of the save.

use crate::fixed::Q16;
use crate::station::BodyId;
use crate::tick::Tick;

/// Kinematic regime of the focused region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneKind {
    /// Orbital mechanics dominate.
    #[default]
    Orbital,
    /// Local kinematics near a surface.
    LocalKinematic,
    /// Docked or landed; no integration needed.
    DockedLanded,
}

impl LaneKind {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Orbital => 0,
            Self::LocalKinematic => 1,
            Self::DockedLanded => 2,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Orbital),
            1 => Some(Self::LocalKinematic),
            2 => Some(Self::DockedLanded),
            _ => None,
        }
    }
}

/// Q16.16 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLongQ16 {
    /// Latitude turns in Q16.16.
    pub lat: Q16,
    /// Longitude turns in Q16.16.
    pub long: Q16,
}

/// Active-region descriptor produced by the lane scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationBubble {
    /// Body the bubble is anchored to.
    pub body_id: BodyId,
    /// Bubble center on the body surface.
    pub center: LatLongQ16,
    /// Bubble radius in meters.
    pub radius_m: u64,
    /// Regime the bubble's occupant is in.
    pub lane: LaneKind,
}

/// Deterministic lane scheduler for the single focused region.
#[derive(Debug, Default)]
pub struct LaneScheduler {
    focus: Option<ActivationBubble>,
    last_update_tick: Tick,
}

impl LaneScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Focuses the scheduler on a region.
    pub fn set_focus(&mut self, bubble: ActivationBubble) {
        self.focus = Some(bubble);
    }

    /// Drops the focus.
    pub fn clear_focus(&mut self) {
        self.focus = None;
    }

    /// Per-tick update; records the tick and re-emits the current bubble.
    pub fn update(&mut self, now: Tick) -> Option<ActivationBubble> {
        self.last_update_tick = now;
        self.focus
    }

    /// Currently active bubble, if any.
    #[must_use]
    pub fn bubble(&self) -> Option<ActivationBubble> {
        self.focus
    }
}

/// Chunk key derived from a surface position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceChunkKey {
    /// Body the chunk belongs to.
    pub body_id: BodyId,
    /// Chunk step in Q16.16 turns.
    pub step_turns_q16: i32,
    /// Latitude chunk index.
    pub lat_index: i32,
    /// Longitude chunk index.
    pub lon_index: i32,
}

/// Interest window over surface chunks around the activation bubble.
#[derive(Debug)]
pub struct SurfaceChunks {
    step_turns_q16: i32,
    interest: Option<(BodyId, LatLongQ16, u64)>,
}

impl SurfaceChunks {
    /// Creates a chunk set with the given step (Q16.16 turns, nonzero).
    #[must_use]
    pub fn new(step_turns_q16: i32) -> Self {
        Self {
            step_turns_q16: if step_turns_q16 == 0 { 1 << 8 } else { step_turns_q16 },
            interest: None,
        }
    }

    /// Chunk step in Q16.16 turns.
    #[must_use]
    pub fn step_turns_q16(&self) -> i32 {
        self.step_turns_q16
    }

    /// Derives the chunk key containing a position.
    #[must_use]
    pub fn build_key(&self, body_id: BodyId, center: &LatLongQ16) -> SurfaceChunkKey {
        SurfaceChunkKey {
            body_id,
            step_turns_q16: self.step_turns_q16,
            lat_index: center.lat.raw().div_euclid(self.step_turns_q16),
            lon_index: center.long.raw().div_euclid(self.step_turns_q16),
        }
    }

    /// Sets the interest window.
    pub fn set_interest(&mut self, body_id: BodyId, center: LatLongQ16, radius_m: u64) {
        self.interest = Some((body_id, center, radius_m));
    }

    /// Clears the interest window.
    pub fn clear_interest(&mut self) {
        self.interest = None;
    }

    /// Current interest window.
    #[must_use]
    pub fn interest(&self) -> Option<(BodyId, LatLongQ16, u64)> {
        self.interest
    }

    /// Canonical state blob (SOVR chunk payload).
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.step_turns_q16.to_le_bytes());
        match self.interest {
            Some((body, center, radius)) => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&body.to_le_bytes());
                out.extend_from_slice(&center.lat.raw().to_le_bytes());
                out.extend_from_slice(&center.long.raw().to_le_bytes());
                out.extend_from_slice(&radius.to_le_bytes());
            }
            None => out.extend_from_slice(&0u32.to_le_bytes()),
        }
    }

    /// Parses a state blob; `None` on malformed bytes.
    #[must_use]
    pub fn decode_blob(blob: &[u8]) -> Option<Self> {
        if blob.len() < 8 {
            return None;
        }
        let step = i32::from_le_bytes(blob[0..4].try_into().ok()?);
        let has_interest = u32::from_le_bytes(blob[4..8].try_into().ok()?);
        let mut chunks = Self::new(step);
        match has_interest {
            0 => {
                if blob.len() != 8 {
                    return None;
                }
            }
            1 => {
                if blob.len() != 32 {
                    return None;
                }
                let body = u64::from_le_bytes(blob[8..16].try_into().ok()?);
                let lat = i32::from_le_bytes(blob[16..20].try_into().ok()?);
                let long = i32::from_le_bytes(blob[20..24].try_into().ok()?);
                let radius = u64::from_le_bytes(blob[24..32].try_into().ok()?);
                chunks.set_interest(
                    body,
                    LatLongQ16 {
                        lat: Q16::from_raw(lat),
                        long: Q16::from_raw(long),
                    },
                    radius,
                );
            }
            _ => return None,
        }
        Some(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_keys_are_deterministic() {
        let chunks = SurfaceChunks::new(1 << 12);
        let center = LatLongQ16 {
            lat: Q16::from_raw(9000),
            long: Q16::from_raw(-9000),
        };
        let a = chunks.build_key(5, &center);
        let b = chunks.build_key(5, &center);
        assert_eq!(a, b);
        assert_eq!(a.lat_index, 2);
        assert_eq!(a.lon_index, -3);
    }

    #[test]
    fn interest_blob_round_trips() {
        let mut chunks = SurfaceChunks::new(1 << 12);
        chunks.set_interest(
            7,
            LatLongQ16 {
                lat: Q16::from_raw(100),
                long: Q16::from_raw(-100),
            },
            2500,
        );
        let mut blob = Vec::new();
        chunks.encode_blob(&mut blob);
        let parsed = SurfaceChunks::decode_blob(&blob).unwrap();
        assert_eq!(parsed.interest(), chunks.interest());
        assert_eq!(parsed.step_turns_q16(), chunks.step_turns_q16());
    }
}
