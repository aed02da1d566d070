// SPDX-License-Identifier: Apache-2.0
//! Kernel commands: the single mutation path into a running kernel.
//!
//! A command is `(schema_id, schema_ver, tick, payload)` with an opaque
//! little-endian payload per schema. Commands are the unit of replay
//! recording, so payload encodings are part of the wire contract.

use thiserror::Error;

use crate::route::RouteId;
use crate::station::ResourceId;
use crate::tick::Tick;

/// Schema id of warp-factor commands.
pub const CMD_SCHEMA_WARP: u32 = 1;
/// Schema id of transfer commands.
pub const CMD_SCHEMA_TRANSFER: u32 = 2;
/// Current version of both command schemas.
pub const CMD_SCHEMA_VERSION: u32 = 1;

/// Errors surfaced by command encoding and submission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Empty payload or zero fields.
    #[error("invalid argument")]
    InvalidArgument,
    /// No handler is registered for the schema.
    #[error("unknown command schema")]
    UnknownSchema,
    /// Payload bytes do not match the schema layout.
    #[error("malformed command payload")]
    Payload,
    /// The command was structurally valid but its execution failed.
    #[error("command execution failed")]
    Execution,
}

/// One kernel command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelCommand {
    /// Payload schema id.
    pub schema_id: u32,
    /// Payload schema version.
    pub schema_ver: u32,
    /// Tick the command targets.
    pub tick: Tick,
    /// Schema-specific little-endian payload.
    pub payload: Vec<u8>,
}

/// Anything that accepts submitted commands (the kernel, a recorder).
pub trait CommandSink {
    /// Submits one command for execution at its target tick.
    fn submit(&mut self, cmd: KernelCommand) -> Result<(), CommandError>;
}

/// Warp command payload: `(factor u32, effective_tick u64)`.
#[must_use]
pub fn encode_warp_payload(factor: u32, effective_tick: Tick) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&factor.to_le_bytes());
    out.extend_from_slice(&effective_tick.to_le_bytes());
    out
}

/// Decodes a warp payload.
pub fn decode_warp_payload(payload: &[u8]) -> Result<(u32, Tick), CommandError> {
    if payload.len() != 12 {
        return Err(CommandError::Payload);
    }
    let factor = u32::from_le_bytes(payload[0..4].try_into().map_err(|_| CommandError::Payload)?);
    let tick = u64::from_le_bytes(payload[4..12].try_into().map_err(|_| CommandError::Payload)?);
    Ok((factor, tick))
}

/// Transfer command payload: `(route_id u64, resource_id u64, qty i64)`.
#[must_use]
pub fn encode_transfer_payload(route_id: RouteId, resource_id: ResourceId, qty: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&route_id.to_le_bytes());
    out.extend_from_slice(&resource_id.to_le_bytes());
    out.extend_from_slice(&qty.to_le_bytes());
    out
}

/// Decodes a transfer payload.
pub fn decode_transfer_payload(
    payload: &[u8],
) -> Result<(RouteId, ResourceId, i64), CommandError> {
    if payload.len() != 24 {
        return Err(CommandError::Payload);
    }
    let route = u64::from_le_bytes(payload[0..8].try_into().map_err(|_| CommandError::Payload)?);
    let resource =
        u64::from_le_bytes(payload[8..16].try_into().map_err(|_| CommandError::Payload)?);
    let qty = i64::from_le_bytes(payload[16..24].try_into().map_err(|_| CommandError::Payload)?);
    Ok((route, resource, qty))
}

/// Canonical wire bytes of a command (replay packet body).
#[must_use]
pub fn encode_command(cmd: &KernelCommand) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + cmd.payload.len());
    out.extend_from_slice(&cmd.schema_id.to_le_bytes());
    out.extend_from_slice(&cmd.schema_ver.to_le_bytes());
    out.extend_from_slice(&cmd.tick.to_le_bytes());
    out.extend_from_slice(&(cmd.payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&cmd.payload);
    out
}

/// Decodes command wire bytes.
pub fn decode_command(bytes: &[u8]) -> Result<KernelCommand, CommandError> {
    if bytes.len() < 20 {
        return Err(CommandError::Payload);
    }
    let schema_id = u32::from_le_bytes(bytes[0..4].try_into().map_err(|_| CommandError::Payload)?);
    let schema_ver = u32::from_le_bytes(bytes[4..8].try_into().map_err(|_| CommandError::Payload)?);
    let tick = u64::from_le_bytes(bytes[8..16].try_into().map_err(|_| CommandError::Payload)?);
    let len = u32::from_le_bytes(bytes[16..20].try_into().map_err(|_| CommandError::Payload)?) as usize;
    if bytes.len() != 20 + len {
        return Err(CommandError::Payload);
    }
    Ok(KernelCommand {
        schema_id,
        schema_ver,
        tick,
        payload: bytes[20..].to_vec(),
    })
}
