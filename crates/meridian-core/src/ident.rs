// SPDX-License-Identifier: Apache-2.0
//! Session identity derivation.
//!
//! Instance and run identities are carried in the save container's identity
//! chunk. Ids are stable, domain-separated BLAKE3 digests of their labels so
//! two installations never collide by accident and tooling can re-derive
//! them from the instance manifest.

use blake3::Hasher;
use std::fmt;

/// 256-bit identity digest.
pub type IdentHash = [u8; 32];

/// Stable identifier for a game instance (installation + content set).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(pub IdentHash);

impl InstanceId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &IdentHash {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

/// Produces a stable, domain-separated instance identifier
/// (prefix `b"instance:"`) using BLAKE3.
#[must_use]
pub fn make_instance_id(label: &str) -> InstanceId {
    let mut hasher = Hasher::new();
    hasher.update(b"instance:");
    hasher.update(label.as_bytes());
    InstanceId(hasher.finalize().into())
}

/// Produces a stable, domain-separated manifest hash (prefix
/// `b"manifest:"`) over raw manifest bytes using BLAKE3.
#[must_use]
pub fn make_manifest_hash(manifest_bytes: &[u8]) -> IdentHash {
    let mut hasher = Hasher::new();
    hasher.update(b"manifest:");
    hasher.update(manifest_bytes);
    hasher.finalize().into()
}

/// Identity block persisted with every save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Instance this session belongs to, as a printable label.
    pub instance_label: String,
    /// Monotone run counter within the instance.
    pub run_id: u64,
    /// Hash of the instance manifest in effect when the run started.
    pub manifest_hash: Vec<u8>,
}

impl SessionIdentity {
    /// Builds the identity for a fresh run.
    #[must_use]
    pub fn new(instance_label: impl Into<String>, run_id: u64, manifest_bytes: &[u8]) -> Self {
        Self {
            instance_label: instance_label.into(),
            run_id,
            manifest_hash: make_manifest_hash(manifest_bytes).to_vec(),
        }
    }
}
