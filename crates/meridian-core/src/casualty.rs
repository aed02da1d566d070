// SPDX-License-Identifier: Apache-2.0
//! Deterministic casualty generation.
//!
//! Bodies are consumed in order from a source's id list via its cursor and
//! handed to the external life/death pipeline through a trait seam. The
//! generator stops on the first handler failure, reporting partial
//! progress, so replay sees the exact same consumption prefix.

use thiserror::Error;

use crate::tick::Tick;

/// Death cause code for combat violence.
pub const DEATH_CAUSE_VIOLENCE: u32 = 3;

/// Errors surfaced by the casualty generator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CasualtyError {
    /// Zero count or missing request fields.
    #[error("invalid argument")]
    InvalidArgument,
    /// The source has fewer unconsumed bodies than requested.
    #[error("insufficient bodies in source")]
    Insufficient,
    /// The output buffer is smaller than the requested count.
    #[error("output capacity too small")]
    Capacity,
    /// The life/death handler refused a death; `produced` deaths were
    /// already emitted.
    #[error("life pipeline refused death (refusal {refusal}, produced {produced})")]
    Handler {
        /// Handler-specific refusal code.
        refusal: u32,
        /// Deaths emitted before the failure.
        produced: u32,
    },
}

/// Pool of body ids a participant draws casualties from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasualtySource {
    /// Body ids in consumption order.
    pub body_ids: Vec<u64>,
    /// Next unconsumed index.
    pub cursor: usize,
}

impl CasualtySource {
    /// Creates a source over `body_ids` with the cursor at the start.
    #[must_use]
    pub fn new(body_ids: Vec<u64>) -> Self {
        Self {
            body_ids,
            cursor: 0,
        }
    }

    /// Bodies not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.body_ids.len().saturating_sub(self.cursor)
    }
}

/// Death request handed to the life pipeline, one per body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasualtyRequest {
    /// Cause code; zero is replaced with [`DEATH_CAUSE_VIOLENCE`].
    pub cause_code: u32,
    /// Tick of death (the engagement resolution tick).
    pub act_time: Tick,
    /// Where the death occurred.
    pub location_ref: u64,
    /// Provenance of the death (engagement id by default).
    pub provenance_ref: u64,
    /// Estate/remains policy id.
    pub policy_id: u32,
    /// Account receiving remains inventory.
    pub remains_account_id: u64,
    /// Jurisdiction handling the death.
    pub jurisdiction_id: u64,
    /// Estate contract exists.
    pub has_contract: bool,
    /// Finders may claim remains.
    pub allow_finder: bool,
    /// Jurisdiction allows remains processing.
    pub jurisdiction_allows: bool,
    /// Estate is locked pending probate.
    pub estate_locked: bool,
    /// Remains collapse into the environment.
    pub collapse_remains: bool,
}

/// External life/death pipeline seam.
///
/// The kernel owns no mortality rules; it submits deterministic death
/// requests and records the returned event ids. Implementations must be
/// deterministic functions of their inputs.
pub trait LifeDeathHandler {
    /// Processes one death, returning its event id, or a refusal code.
    fn process_death(&mut self, body_id: u64, request: &CasualtyRequest) -> Result<u64, u32>;
}

/// Consumes `count` bodies from `source`, emitting death event ids into
/// `out_ids`. On handler failure the error carries the partial `produced`
/// count; consumed bodies stay consumed.
pub fn casualty_generate<H: LifeDeathHandler>(
    handler: &mut H,
    source: &mut CasualtySource,
    count: u32,
    request: &CasualtyRequest,
    out_ids: &mut Vec<u64>,
    out_capacity: usize,
) -> Result<u32, CasualtyError> {
    if count == 0 {
        return Err(CasualtyError::InvalidArgument);
    }
    if source.remaining() < count as usize {
        return Err(CasualtyError::Insufficient);
    }
    if out_capacity < count as usize {
        return Err(CasualtyError::Capacity);
    }
    let mut effective = *request;
    if effective.cause_code == 0 {
        effective.cause_code = DEATH_CAUSE_VIOLENCE;
    }
    let mut produced = 0u32;
    for _ in 0..count {
        let body_id = source.body_ids[source.cursor];
        source.cursor += 1;
        match handler.process_death(body_id, &effective) {
            Ok(event_id) => {
                out_ids.push(event_id);
                produced += 1;
            }
            Err(refusal) => {
                return Err(CasualtyError::Handler { refusal, produced });
            }
        }
    }
    Ok(produced)
}
