// SPDX-License-Identifier: Apache-2.0
//! Construction instances anchored to surface chunks.

use thiserror::Error;

use crate::fixed::Q48;
use crate::lanes::SurfaceChunkKey;
use crate::registry::{Keyed, Registry, RegistryError};
use crate::station::BodyId;

/// Construction instance identifier.
pub type ConstructionId = u64;

/// Highest valid construction type id.
pub const CONSTRUCTION_MAX_TYPE_ID: u32 = 4096;

/// Errors surfaced by the construction registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    /// Zero instance/body id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Instance id already registered.
    #[error("duplicate instance id")]
    DuplicateId,
    /// Unknown instance.
    #[error("instance not found")]
    NotFound,
    /// Registry at capacity.
    #[error("construction registry full")]
    Full,
    /// Invalid type id or orientation.
    #[error("invalid construction data")]
    InvalidData,
}

impl From<RegistryError> for ConstructionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// A placed construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructionInstance {
    /// Instance id, nonzero.
    pub instance_id: ConstructionId,
    /// Construction type, `1..=`[`CONSTRUCTION_MAX_TYPE_ID`].
    pub type_id: u32,
    /// Cardinal orientation, `0..=3`.
    pub orientation: u32,
    /// Body the construction sits on, nonzero.
    pub body_id: BodyId,
    /// Chunk the construction is anchored to.
    pub chunk_key: SurfaceChunkKey,
    /// Local east/north/up position in Q48.16 meters.
    pub local_pos_m: [Q48; 3],
    /// Cell X within the chunk.
    pub cell_x: i32,
    /// Cell Y within the chunk.
    pub cell_y: i32,
}

impl Keyed for ConstructionInstance {
    fn key(&self) -> u64 {
        self.instance_id
    }
}

/// Id-sorted construction store.
#[derive(Debug)]
pub struct ConstructionRegistry {
    instances: Registry<ConstructionInstance>,
}

impl ConstructionRegistry {
    /// Creates an empty registry bounded at `capacity` instances.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Registry::with_capacity(capacity),
        }
    }

    /// Registers an instance after validation.
    pub fn register(&mut self, instance: ConstructionInstance) -> Result<(), ConstructionError> {
        if instance.instance_id == 0 || instance.body_id == 0 {
            return Err(ConstructionError::InvalidArgument);
        }
        if instance.type_id == 0
            || instance.type_id > CONSTRUCTION_MAX_TYPE_ID
            || instance.orientation > 3
        {
            return Err(ConstructionError::InvalidData);
        }
        self.instances.insert(instance)?;
        Ok(())
    }

    /// Looks up an instance.
    #[must_use]
    pub fn get(&self, instance_id: ConstructionId) -> Option<&ConstructionInstance> {
        self.instances.get(instance_id)
    }

    /// Number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True when no instances are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterates instances in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ConstructionInstance> {
        self.instances.iter()
    }

    /// Resets the registry (save-load entry point).
    pub fn reset(&mut self) {
        self.instances.clear();
    }

    /// Canonical state blob: count, then 68-byte records in id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.instances.len() as u32).to_le_bytes());
        for inst in self.instances.iter() {
            out.extend_from_slice(&inst.instance_id.to_le_bytes());
            out.extend_from_slice(&inst.type_id.to_le_bytes());
            out.extend_from_slice(&inst.orientation.to_le_bytes());
            out.extend_from_slice(&inst.body_id.to_le_bytes());
            out.extend_from_slice(&inst.chunk_key.step_turns_q16.to_le_bytes());
            out.extend_from_slice(&inst.chunk_key.lat_index.to_le_bytes());
            out.extend_from_slice(&inst.chunk_key.lon_index.to_le_bytes());
            out.extend_from_slice(&inst.local_pos_m[0].raw().to_le_bytes());
            out.extend_from_slice(&inst.local_pos_m[1].raw().to_le_bytes());
            out.extend_from_slice(&inst.local_pos_m[2].raw().to_le_bytes());
            out.extend_from_slice(&inst.cell_x.to_le_bytes());
            out.extend_from_slice(&inst.cell_y.to_le_bytes());
        }
    }
}
