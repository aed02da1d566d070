// SPDX-License-Identifier: Apache-2.0
//! Replay recording and playback.
//!
//! A replay is a stream of per-tick command packets. The recorder captures
//! commands as they execute; playback feeds the recorded packets back at
//! the start of their target tick. Playback past the recorded horizon
//! surfaces replay-end without mutating sim state.

use thiserror::Error;

use crate::command::{decode_command, encode_command, KernelCommand};
use crate::tick::Tick;

/// Errors surfaced by replay decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// The stream is truncated or a packet is malformed.
    #[error("malformed replay stream")]
    Format,
}

/// One recorded packet: a command bound to its target tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPacket {
    /// Tick the packet is consumed at.
    pub tick: Tick,
    /// Canonical command bytes.
    pub bytes: Vec<u8>,
}

/// Captures executed commands for later playback.
#[derive(Debug, Default)]
pub struct ReplayRecorder {
    packets: Vec<ReplayPacket>,
    last_tick: Tick,
}

impl ReplayRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one command at its execution tick.
    pub fn record(&mut self, tick: Tick, cmd: &KernelCommand) {
        self.packets.push(ReplayPacket {
            tick,
            bytes: encode_command(cmd),
        });
        self.last_tick = self.last_tick.max(tick);
    }

    /// Highest tick any packet targets.
    #[must_use]
    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// Number of recorded packets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Serializes the stream: per packet `tick u64, len u32, bytes`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for packet in &self.packets {
            out.extend_from_slice(&packet.tick.to_le_bytes());
            out.extend_from_slice(&(packet.bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&packet.bytes);
        }
        out
    }

    /// Builds a playback over the recorded packets.
    #[must_use]
    pub fn into_playback(self) -> ReplayPlayback {
        ReplayPlayback {
            last_tick: self.last_tick,
            packets: self.packets,
            cursor: 0,
        }
    }
}

/// Feeds recorded packets back in tick order.
#[derive(Debug)]
pub struct ReplayPlayback {
    packets: Vec<ReplayPacket>,
    cursor: usize,
    last_tick: Tick,
}

impl ReplayPlayback {
    /// Parses a serialized stream.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReplayError> {
        let mut packets = Vec::new();
        let mut last_tick = 0;
        let mut offset = 0usize;
        while offset < bytes.len() {
            if bytes.len() - offset < 12 {
                return Err(ReplayError::Format);
            }
            let tick = u64::from_le_bytes(
                bytes[offset..offset + 8]
                    .try_into()
                    .map_err(|_| ReplayError::Format)?,
            );
            let len = u32::from_le_bytes(
                bytes[offset + 8..offset + 12]
                    .try_into()
                    .map_err(|_| ReplayError::Format)?,
            ) as usize;
            let start = offset + 12;
            let end = start.checked_add(len).ok_or(ReplayError::Format)?;
            if end > bytes.len() {
                return Err(ReplayError::Format);
            }
            // Validate the packet body now so playback cannot fail mid-tick.
            decode_command(&bytes[start..end]).map_err(|_| ReplayError::Format)?;
            packets.push(ReplayPacket {
                tick,
                bytes: bytes[start..end].to_vec(),
            });
            last_tick = last_tick.max(tick);
            offset = end;
        }
        Ok(Self {
            packets,
            cursor: 0,
            last_tick,
        })
    }

    /// Highest tick any packet targets.
    #[must_use]
    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// True when every packet has been consumed.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.cursor >= self.packets.len()
    }

    /// Pops every packet targeting `next_tick`, in recorded order.
    pub fn next_for_tick(&mut self, next_tick: Tick) -> Vec<KernelCommand> {
        let mut out = Vec::new();
        while self.cursor < self.packets.len() {
            let packet = &self.packets[self.cursor];
            if packet.tick != next_tick {
                break;
            }
            if let Ok(cmd) = decode_command(&packet.bytes) {
                out.push(cmd);
            }
            self.cursor += 1;
        }
        out
    }

    /// True once playback has run past its recorded horizon.
    #[must_use]
    pub fn ended(&self, next_tick: Tick) -> bool {
        self.exhausted() && self.last_tick > 0 && next_tick > self.last_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{encode_warp_payload, CMD_SCHEMA_VERSION, CMD_SCHEMA_WARP};

    fn warp_cmd(tick: Tick) -> KernelCommand {
        KernelCommand {
            schema_id: CMD_SCHEMA_WARP,
            schema_ver: CMD_SCHEMA_VERSION,
            tick,
            payload: encode_warp_payload(4, tick),
        }
    }

    #[test]
    fn record_encode_decode_round_trips() {
        let mut recorder = ReplayRecorder::new();
        recorder.record(5, &warp_cmd(5));
        recorder.record(7, &warp_cmd(7));
        let bytes = recorder.encode();
        let mut playback = ReplayPlayback::decode(&bytes).unwrap();

        assert!(playback.next_for_tick(4).is_empty());
        assert_eq!(playback.next_for_tick(5), vec![warp_cmd(5)]);
        assert!(!playback.ended(6));
        assert_eq!(playback.next_for_tick(7), vec![warp_cmd(7)]);
        assert!(playback.ended(8));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut recorder = ReplayRecorder::new();
        recorder.record(5, &warp_cmd(5));
        let bytes = recorder.encode();
        assert_eq!(
            ReplayPlayback::decode(&bytes[..bytes.len() - 1]).unwrap_err(),
            ReplayError::Format
        );
    }
}
