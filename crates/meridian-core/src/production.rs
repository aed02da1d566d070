// SPDX-License-Identifier: Apache-2.0
//! Periodic production/consumption rules.
//!
//! Each rule applies `delta_per_period` once per completed period bucket.
//! The applied amount depends only on `floor(now/period) -
//! floor(last/period)`, so any partition of an interval into sub-updates
//! yields the same total delta (tick invariance).

use thiserror::Error;

use crate::station::{ResourceId, StationError, StationId, StationRegistry};
use crate::tick::Tick;

/// Production rule identifier.
pub type ProductionRuleId = u64;

/// Errors surfaced by the production engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductionError {
    /// Zero id fields.
    #[error("invalid argument")]
    InvalidArgument,
    /// Rule id already registered.
    #[error("duplicate rule id")]
    DuplicateId,
    /// Zero delta or zero period.
    #[error("invalid rule data")]
    InvalidData,
    /// Negative delta could not be fully covered by the inventory.
    #[error("insufficient inventory for consumption rule")]
    Insufficient,
    /// Period-count multiplication overflowed.
    #[error("production overflow")]
    Overflow,
    /// Inventory mutation failed for a reason other than coverage.
    #[error("production engine error")]
    Engine,
}

/// A periodic inventory delta at one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductionRule {
    /// Rule id, nonzero.
    pub rule_id: ProductionRuleId,
    /// Station whose inventory the rule mutates.
    pub station_id: StationId,
    /// Resource produced (positive delta) or consumed (negative delta).
    pub resource_id: ResourceId,
    /// Signed delta applied once per period, nonzero.
    pub delta_per_period: i64,
    /// Period length in ticks, `> 0`.
    pub period_ticks: u64,
}

/// Rule table plus the last applied tick.
#[derive(Debug)]
pub struct ProductionEngine {
    rules: Vec<ProductionRule>,
    last_tick: Tick,
}

impl Default for ProductionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionEngine {
    /// Creates an empty engine at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            last_tick: 0,
        }
    }

    /// Registers a rule, kept sorted by rule id.
    pub fn register(&mut self, rule: ProductionRule) -> Result<(), ProductionError> {
        if rule.rule_id == 0 || rule.station_id == 0 || rule.resource_id == 0 {
            return Err(ProductionError::InvalidData);
        }
        if rule.delta_per_period == 0 || rule.period_ticks == 0 {
            return Err(ProductionError::InvalidData);
        }
        match self.rules.binary_search_by_key(&rule.rule_id, |r| r.rule_id) {
            Ok(_) => Err(ProductionError::DuplicateId),
            Err(idx) => {
                self.rules.insert(idx, rule);
                Ok(())
            }
        }
    }

    /// Rules in ascending id order.
    #[must_use]
    pub fn rules(&self) -> &[ProductionRule] {
        &self.rules
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Last tick `update` ran at.
    #[must_use]
    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// Overwrites the applied-tick cursor (save-load entry point).
    pub fn set_last_tick(&mut self, last_tick: Tick) {
        self.last_tick = last_tick;
    }

    /// Resets rules and cursor (save-load entry point).
    pub fn reset(&mut self) {
        self.rules.clear();
        self.last_tick = 0;
    }

    /// Applies every rule's completed periods in `(last, now]`.
    ///
    /// `update(now <= last)` is a no-op that still records the cursor.
    /// Negative deltas must be fully covered; nothing is partially applied.
    pub fn update(
        &mut self,
        stations: &mut StationRegistry,
        now: Tick,
    ) -> Result<(), ProductionError> {
        if now <= self.last_tick {
            self.last_tick = now;
            return Ok(());
        }
        for rule in &self.rules {
            let prev_bucket = self.last_tick / rule.period_ticks;
            let curr_bucket = now / rule.period_ticks;
            let periods = curr_bucket.saturating_sub(prev_bucket);
            if periods == 0 {
                continue;
            }
            let magnitude = rule.delta_per_period.unsigned_abs();
            let total = periods
                .checked_mul(magnitude)
                .and_then(|units| i64::try_from(units).ok())
                .ok_or(ProductionError::Overflow)?;
            if rule.delta_per_period > 0 {
                stations
                    .inventory_add(rule.station_id, rule.resource_id, total)
                    .map_err(|err| match err {
                        StationError::Overflow => ProductionError::Overflow,
                        _ => ProductionError::Engine,
                    })?;
            } else {
                stations
                    .inventory_remove(rule.station_id, rule.resource_id, total)
                    .map_err(|err| match err {
                        StationError::Insufficient => ProductionError::Insufficient,
                        _ => ProductionError::Engine,
                    })?;
            }
        }
        self.last_tick = now;
        Ok(())
    }

    /// Canonical state blob: last tick, count, then 40-byte rule records in
    /// id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.last_tick.to_le_bytes());
        out.extend_from_slice(&(self.rules.len() as u32).to_le_bytes());
        for rule in &self.rules {
            out.extend_from_slice(&rule.rule_id.to_le_bytes());
            out.extend_from_slice(&rule.station_id.to_le_bytes());
            out.extend_from_slice(&rule.resource_id.to_le_bytes());
            out.extend_from_slice(&rule.delta_per_period.to_le_bytes());
            out.extend_from_slice(&rule.period_ticks.to_le_bytes());
        }
    }
}
