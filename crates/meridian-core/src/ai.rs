// SPDX-License-Identifier: Apache-2.0
//! Budgeted, deterministic AI scheduler for faction planners.
//!
//! Each scheduler tick reconciles one state record per faction (sorted by
//! faction id), then walks factions in id order under two budgets: a
//! per-tick faction cap and a shared operation pool. Due factions run the
//! logistics planner and then the events planner; produced commands go
//! through the kernel command sink and produced events are scheduled
//! directly. Every decision folds into 64-bit input/output digests so a
//! replay can be audited without re-running the planners.
//!
//! Trace records are tagged TLV and strictly best-effort: a sink may drop
//! them, and writing never mutates sim state.

use thiserror::Error;

use crate::command::{
    encode_transfer_payload, CommandError, CommandSink, KernelCommand, CMD_SCHEMA_TRANSFER,
    CMD_SCHEMA_VERSION,
};
use crate::economy::{MacroEconomy, ScopeKind};
use crate::faction::{Faction, FactionId, FactionRegistry, POLICY_ALLOW_EVENTS, POLICY_ALLOW_ROUTE};
use crate::hash::{fnv1a64, hash_combine, hash_u64x4};
use crate::macro_events::{MacroEvent, MacroEventEffect, MacroEvents};
use crate::route::RouteGraph;
use crate::station::StationRegistry;
use crate::tick::Tick;
use crate::tlv::TlvWriter;

/// Default decision period in ticks.
pub const AI_DEFAULT_PERIOD_TICKS: u32 = 60;
/// Default shared operation budget per tick.
pub const AI_DEFAULT_MAX_OPS: u32 = 8;
/// Default faction budget per tick.
pub const AI_DEFAULT_MAX_FACTIONS: u32 = 4;
/// Lead time of planner-scheduled corrective events.
pub const AI_EVENT_LEAD_TICKS: u64 = 600;
/// Lot size of planner-proposed transfers.
pub const AI_TRANSFER_LOT: i64 = 10;

/// Trace record schema version.
pub const AI_TRACE_SCHEMA_VERSION: u32 = 1;
const AI_TRACE_TAG_SCHEMA_VERSION: u32 = 0x01;
const AI_TRACE_TAG_PLAN_ID: u32 = 0x10;
const AI_TRACE_TAG_FACTION_ID: u32 = 0x11;
const AI_TRACE_TAG_TICK: u32 = 0x12;
const AI_TRACE_TAG_INPUT_DIGEST: u32 = 0x13;
const AI_TRACE_TAG_OUTPUT_DIGEST: u32 = 0x14;
const AI_TRACE_TAG_OUTPUT_COUNT: u32 = 0x15;
const AI_TRACE_TAG_REASON_CODE: u32 = 0x16;
const AI_TRACE_TAG_OPS_USED: u32 = 0x17;
const AI_TRACE_TAG_BUDGET_HIT: u32 = 0x18;

/// Errors surfaced by the AI scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AiError {
    /// Malformed configuration.
    #[error("invalid argument")]
    InvalidArgument,
    /// Unknown faction in a state query.
    #[error("faction state not found")]
    NotFound,
}

/// Why a faction's last plan ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AiReasonCode {
    /// Nothing to do.
    #[default]
    None,
    /// At least one action was produced.
    Actions,
    /// An operation budget was exhausted.
    BudgetHit,
    /// The faction record could not be read.
    InvalidInput,
}

impl AiReasonCode {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Actions => 1,
            Self::BudgetHit => 2,
            Self::InvalidInput => 3,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Actions),
            2 => Some(Self::BudgetHit),
            3 => Some(Self::InvalidInput),
            _ => None,
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiSchedulerConfig {
    /// Ticks between decisions per faction, `> 0`.
    pub period_ticks: u32,
    /// Shared operation budget per tick, `> 0`.
    pub max_ops_per_tick: u32,
    /// Factions processed per tick, `> 0`.
    pub max_factions_per_tick: u32,
    /// Whether trace records are emitted.
    pub enable_traces: bool,
}

impl Default for AiSchedulerConfig {
    fn default() -> Self {
        Self {
            period_ticks: AI_DEFAULT_PERIOD_TICKS,
            max_ops_per_tick: AI_DEFAULT_MAX_OPS,
            max_factions_per_tick: AI_DEFAULT_MAX_FACTIONS,
            enable_traces: true,
        }
    }
}

/// Persisted per-faction scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AiFactionState {
    /// Faction this record belongs to.
    pub faction_id: FactionId,
    /// Next tick the faction is due a decision.
    pub next_decision_tick: Tick,
    /// Monotone plan counter.
    pub last_plan_id: u64,
    /// Successful outputs of the last plan.
    pub last_output_count: u32,
    /// Reason the last plan ended.
    pub last_reason_code: AiReasonCode,
    /// Whether the last plan hit a budget.
    pub last_budget_hit: bool,
}

/// One emitted trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiTraceRecord {
    /// Plan counter value after the decision.
    pub plan_id: u64,
    /// Faction the decision belongs to.
    pub faction_id: FactionId,
    /// Decision tick.
    pub tick: Tick,
    /// Digest over `(sim_hash, faction, seed, tick)`.
    pub input_digest: u64,
    /// Digest folded over every produced command/event.
    pub output_digest: u64,
    /// Successful outputs.
    pub output_count: u32,
    /// Reason the plan ended.
    pub reason_code: AiReasonCode,
    /// Operations spent.
    pub ops_used: u32,
    /// Whether a budget was hit.
    pub budget_hit: bool,
}

impl AiTraceRecord {
    /// Encodes the record as tagged TLV.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = TlvWriter::new();
        writer.add_u32(AI_TRACE_TAG_SCHEMA_VERSION, AI_TRACE_SCHEMA_VERSION);
        writer.add_u64(AI_TRACE_TAG_PLAN_ID, self.plan_id);
        writer.add_u64(AI_TRACE_TAG_FACTION_ID, self.faction_id);
        writer.add_u64(AI_TRACE_TAG_TICK, self.tick);
        writer.add_u64(AI_TRACE_TAG_INPUT_DIGEST, self.input_digest);
        writer.add_u64(AI_TRACE_TAG_OUTPUT_DIGEST, self.output_digest);
        writer.add_u32(AI_TRACE_TAG_OUTPUT_COUNT, self.output_count);
        writer.add_u32(AI_TRACE_TAG_REASON_CODE, self.reason_code.code());
        writer.add_u32(AI_TRACE_TAG_OPS_USED, self.ops_used);
        writer.add_u32(AI_TRACE_TAG_BUDGET_HIT, u32::from(self.budget_hit));
        writer.into_bytes()
    }
}

/// Best-effort trace receiver.
///
/// Implementations must not feed anything back into sim state; dropping
/// records is always acceptable.
pub trait TraceSink {
    /// Receives one encoded trace record.
    fn record(&mut self, record: &AiTraceRecord, bytes: &[u8]);
}

/// Planner output: produced items plus budget accounting.
#[derive(Debug, Default)]
struct PlannerResult {
    commands: Vec<KernelCommand>,
    events: Vec<MacroEvent>,
    ops_used: u32,
    budget_hit: bool,
}

fn planner_target_system(faction: &Faction, economy: &MacroEconomy) -> Option<u64> {
    if faction.home_scope_kind == ScopeKind::System {
        return Some(faction.home_scope_id);
    }
    economy.iter(ScopeKind::System).map(|s| s.scope_id).next()
}

fn planner_shortage(economy: &MacroEconomy, system_id: u64) -> Option<u64> {
    let scope = economy.get(ScopeKind::System, system_id)?;
    for entry in scope.demand() {
        let production = scope
            .production()
            .iter()
            .find(|p| p.resource_id == entry.resource_id)
            .map_or(0, |p| p.amount);
        if entry.amount > production {
            return Some(entry.resource_id);
        }
    }
    None
}

/// Proposes transfer commands toward the first system shortage reachable
/// over a registered route. Examining a route costs one operation.
fn planner_logistics(
    faction: &Faction,
    economy: &MacroEconomy,
    stations: &StationRegistry,
    routes: &RouteGraph,
    tick: Tick,
    max_ops: u32,
) -> PlannerResult {
    let mut result = PlannerResult::default();
    if max_ops == 0 {
        result.budget_hit = true;
        return result;
    }
    if faction.policy_flags & POLICY_ALLOW_ROUTE == 0 {
        return result;
    }
    let Some(system_id) = planner_target_system(faction, economy) else {
        return result;
    };
    let Some(shortage) = planner_shortage(economy, system_id) else {
        return result;
    };
    for route in routes.iter() {
        if result.ops_used >= max_ops {
            result.budget_hit = true;
            return result;
        }
        result.ops_used += 1;
        let available = stations
            .inventory_get(route.src_station_id, shortage)
            .unwrap_or(0);
        if available <= 0 {
            continue;
        }
        let qty = available.min(AI_TRANSFER_LOT);
        result.commands.push(KernelCommand {
            schema_id: CMD_SCHEMA_TRANSFER,
            schema_ver: CMD_SCHEMA_VERSION,
            tick,
            payload: encode_transfer_payload(route.route_id, shortage, qty),
        });
        return result;
    }
    result
}

/// Proposes one corrective macro event for an uncovered system shortage.
fn planner_events(
    faction: &Faction,
    economy: &MacroEconomy,
    events: &MacroEvents,
    tick: Tick,
    max_ops: u32,
) -> PlannerResult {
    let mut result = PlannerResult::default();
    if max_ops == 0 {
        result.budget_hit = true;
        return result;
    }
    if faction.policy_flags & POLICY_ALLOW_EVENTS == 0 {
        return result;
    }
    let Some(system_id) = planner_target_system(faction, economy) else {
        return result;
    };
    let Some(shortage) = planner_shortage(economy, system_id) else {
        return result;
    };
    result.ops_used = 1;
    let already_covered = events
        .events()
        .iter()
        .any(|e| e.scope_kind == ScopeKind::System && e.scope_id == system_id);
    if already_covered {
        return result;
    }
    let mut event_id = hash_u64x4(faction.faction_id, system_id, shortage, tick);
    if event_id == 0 {
        event_id = 1;
    }
    result.events.push(MacroEvent {
        event_id,
        scope_kind: ScopeKind::System,
        scope_id: system_id,
        trigger_tick: tick + AI_EVENT_LEAD_TICKS,
        effects: vec![MacroEventEffect {
            resource_id: shortage,
            production_delta: 1,
            demand_delta: 0,
            flags_set: 0,
            flags_clear: 0,
        }],
    });
    result
}

fn hash_command(cmd: &KernelCommand, seed: u64) -> u64 {
    let mut h = hash_u64x4(seed, u64::from(cmd.schema_id), u64::from(cmd.schema_ver), cmd.tick);
    if !cmd.payload.is_empty() {
        h = hash_combine(h, fnv1a64(&cmd.payload));
    }
    h
}

fn hash_event(event: &MacroEvent, seed: u64) -> u64 {
    let mut h = hash_u64x4(seed, event.event_id, event.scope_id, event.trigger_tick);
    h = hash_u64x4(
        h,
        u64::from(event.scope_kind.code()),
        event.effects.len() as u64,
        0,
    );
    if !event.effects.is_empty() {
        let mut bytes = Vec::with_capacity(event.effects.len() * 32);
        for effect in &event.effects {
            bytes.extend_from_slice(&effect.resource_id.to_le_bytes());
            bytes.extend_from_slice(&effect.production_delta.to_le_bytes());
            bytes.extend_from_slice(&effect.demand_delta.to_le_bytes());
            bytes.extend_from_slice(&effect.flags_set.to_le_bytes());
            bytes.extend_from_slice(&effect.flags_clear.to_le_bytes());
        }
        h = hash_combine(h, fnv1a64(&bytes));
    }
    h
}

/// World views and sinks one AI tick needs.
pub struct AiTickContext<'a> {
    /// Faction registry (read-only).
    pub factions: &'a FactionRegistry,
    /// Macro economy (read-only).
    pub economy: &'a MacroEconomy,
    /// Macro events: scanned by planners, extended by the scheduler.
    pub events: &'a mut MacroEvents,
    /// Stations (read-only).
    pub stations: &'a StationRegistry,
    /// Routes (read-only).
    pub routes: &'a RouteGraph,
    /// World hash fed into input digests.
    pub sim_hash: u64,
    /// Where produced commands are submitted.
    pub commands: &'a mut dyn CommandSink,
    /// Optional trace receiver.
    pub traces: Option<&'a mut dyn TraceSink>,
}

/// Budgeted per-tick planner dispatcher.
#[derive(Debug)]
pub struct AiScheduler {
    config: AiSchedulerConfig,
    // Sorted ascending by faction_id.
    states: Vec<AiFactionState>,
}

impl Default for AiScheduler {
    fn default() -> Self {
        Self::new(AiSchedulerConfig::default())
    }
}

impl AiScheduler {
    /// Creates a scheduler with the given configuration; zero fields fall
    /// back to their defaults.
    #[must_use]
    pub fn new(config: AiSchedulerConfig) -> Self {
        let defaults = AiSchedulerConfig::default();
        Self {
            config: AiSchedulerConfig {
                period_ticks: if config.period_ticks == 0 {
                    defaults.period_ticks
                } else {
                    config.period_ticks
                },
                max_ops_per_tick: if config.max_ops_per_tick == 0 {
                    defaults.max_ops_per_tick
                } else {
                    config.max_ops_per_tick
                },
                max_factions_per_tick: if config.max_factions_per_tick == 0 {
                    defaults.max_factions_per_tick
                } else {
                    config.max_factions_per_tick
                },
                enable_traces: config.enable_traces,
            },
            states: Vec::new(),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> AiSchedulerConfig {
        self.config
    }

    /// Overrides the budgets; zero values keep the current setting.
    pub fn set_budget(&mut self, max_ops_per_tick: u32, max_factions_per_tick: u32) {
        if max_ops_per_tick > 0 {
            self.config.max_ops_per_tick = max_ops_per_tick;
        }
        if max_factions_per_tick > 0 {
            self.config.max_factions_per_tick = max_factions_per_tick;
        }
    }

    /// Per-faction states sorted by faction id.
    #[must_use]
    pub fn states(&self) -> &[AiFactionState] {
        &self.states
    }

    /// Looks up one faction's state.
    pub fn get_state(&self, faction_id: FactionId) -> Result<AiFactionState, AiError> {
        if faction_id == 0 {
            return Err(AiError::InvalidArgument);
        }
        self.states
            .binary_search_by_key(&faction_id, |s| s.faction_id)
            .map(|idx| self.states[idx])
            .map_err(|_| AiError::NotFound)
    }

    /// Replaces the state list (save-load entry point). Input is re-sorted.
    pub fn load_states(&mut self, states: &[AiFactionState]) {
        self.states = states.to_vec();
        self.states.sort_by_key(|s| s.faction_id);
    }

    /// Reconciles state records with the live faction list: stale records
    /// drop, new factions get a record due immediately.
    fn reconcile(&mut self, factions: &FactionRegistry, tick: Tick) {
        let mut next_states = Vec::with_capacity(factions.len());
        for faction in factions.iter() {
            let state = self
                .states
                .binary_search_by_key(&faction.faction_id, |s| s.faction_id)
                .map(|idx| self.states[idx])
                .unwrap_or(AiFactionState {
                    faction_id: faction.faction_id,
                    next_decision_tick: tick,
                    last_plan_id: 0,
                    last_output_count: 0,
                    last_reason_code: AiReasonCode::None,
                    last_budget_hit: false,
                });
            next_states.push(state);
        }
        self.states = next_states;
    }

    /// Runs one scheduler tick.
    pub fn tick(&mut self, ctx: &mut AiTickContext<'_>, tick: Tick) -> Result<(), AiError> {
        self.reconcile(ctx.factions, tick);
        if self.states.is_empty() {
            return Ok(());
        }

        let period = u64::from(self.config.period_ticks);
        let mut ops_remaining = self.config.max_ops_per_tick;
        let mut factions_remaining = self.config.max_factions_per_tick;

        for idx in 0..self.states.len() {
            if factions_remaining == 0 {
                break;
            }
            let faction_id = self.states[idx].faction_id;
            if tick < self.states[idx].next_decision_tick {
                continue;
            }

            if ops_remaining == 0 {
                let state = &mut self.states[idx];
                state.last_plan_id += 1;
                state.last_output_count = 0;
                state.last_reason_code = AiReasonCode::BudgetHit;
                state.last_budget_hit = true;
                state.next_decision_tick = tick + period;
                if self.config.enable_traces {
                    let record = AiTraceRecord {
                        plan_id: state.last_plan_id,
                        faction_id,
                        tick,
                        input_digest: hash_u64x4(ctx.sim_hash, faction_id, state.last_plan_id, tick),
                        output_digest: 0,
                        output_count: 0,
                        reason_code: AiReasonCode::BudgetHit,
                        ops_used: 0,
                        budget_hit: true,
                    };
                    if let Some(sink) = ctx.traces.as_deref_mut() {
                        sink.record(&record, &record.encode());
                    }
                }
                factions_remaining -= 1;
                continue;
            }

            let Some(faction) = ctx.factions.get(faction_id) else {
                let state = &mut self.states[idx];
                state.last_plan_id += 1;
                state.last_output_count = 0;
                state.last_reason_code = AiReasonCode::InvalidInput;
                state.last_budget_hit = false;
                state.next_decision_tick = tick + period;
                factions_remaining -= 1;
                continue;
            };

            let input_digest = hash_u64x4(ctx.sim_hash, faction_id, faction.ai_seed, tick);
            let mut ops_used = 0u32;
            let mut budget_hit = false;
            let mut output_count = 0u32;
            let mut output_digest = 0u64;

            let logistics = planner_logistics(
                faction,
                ctx.economy,
                ctx.stations,
                ctx.routes,
                tick,
                ops_remaining,
            );
            budget_hit |= logistics.budget_hit;
            ops_remaining = ops_remaining.saturating_sub(logistics.ops_used);
            ops_used += logistics.ops_used;

            let events_result = if ops_remaining > 0 {
                let r = planner_events(faction, ctx.economy, ctx.events, tick, ops_remaining);
                budget_hit |= r.budget_hit;
                ops_remaining = ops_remaining.saturating_sub(r.ops_used);
                ops_used += r.ops_used;
                r
            } else {
                PlannerResult::default()
            };

            for cmd in logistics.commands {
                output_digest = hash_command(&cmd, output_digest);
                if ctx.commands.submit(cmd).is_ok() {
                    output_count += 1;
                }
            }
            for event in events_result.events {
                output_digest = hash_event(&event, output_digest);
                if ctx.events.schedule(event).is_ok() {
                    output_count += 1;
                }
            }

            let reason_code = if budget_hit {
                AiReasonCode::BudgetHit
            } else if output_count > 0 {
                AiReasonCode::Actions
            } else {
                AiReasonCode::None
            };

            let state = &mut self.states[idx];
            state.last_plan_id += 1;
            state.last_output_count = output_count;
            state.last_reason_code = reason_code;
            state.last_budget_hit = budget_hit;
            state.next_decision_tick = tick + period;

            if self.config.enable_traces && (output_count > 0 || budget_hit) {
                let record = AiTraceRecord {
                    plan_id: state.last_plan_id,
                    faction_id,
                    tick,
                    input_digest,
                    output_digest,
                    output_count,
                    reason_code,
                    ops_used,
                    budget_hit,
                };
                if let Some(sink) = ctx.traces.as_deref_mut() {
                    sink.record(&record, &record.encode());
                }
            }

            factions_remaining -= 1;
        }
        Ok(())
    }

    /// Canonical state blob: config words, state count, then state records
    /// in faction-id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.config.period_ticks.to_le_bytes());
        out.extend_from_slice(&self.config.max_ops_per_tick.to_le_bytes());
        out.extend_from_slice(&self.config.max_factions_per_tick.to_le_bytes());
        out.extend_from_slice(&u32::from(self.config.enable_traces).to_le_bytes());
        out.extend_from_slice(&(self.states.len() as u32).to_le_bytes());
        for state in &self.states {
            out.extend_from_slice(&state.faction_id.to_le_bytes());
            out.extend_from_slice(&state.next_decision_tick.to_le_bytes());
            out.extend_from_slice(&state.last_plan_id.to_le_bytes());
            out.extend_from_slice(&state.last_output_count.to_le_bytes());
            out.extend_from_slice(&state.last_reason_code.code().to_le_bytes());
            out.extend_from_slice(&u32::from(state.last_budget_hit).to_le_bytes());
        }
    }

    /// Replaces the configuration (save-load entry point).
    pub fn load_config(&mut self, config: AiSchedulerConfig) {
        *self = Self::new(config);
    }
}

/// A [`CommandSink`] that only records, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingCommandSink {
    /// Every submitted command in order.
    pub commands: Vec<KernelCommand>,
}

impl CommandSink for RecordingCommandSink {
    fn submit(&mut self, cmd: KernelCommand) -> Result<(), CommandError> {
        self.commands.push(cmd);
        Ok(())
    }
}
