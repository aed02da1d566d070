// SPDX-License-Identifier: Apache-2.0
//! The kernel driver: fixed-step advance over every subsystem.
//!
//! The kernel owns all authoritative registries and mutates them only
//! inside [`Kernel::step`], in one normative order:
//!
//! 1. replay injection for the tick about to advance,
//! 2. pending-warp commit,
//! 3. world advance (tick index + RNG churn),
//! 4. cosmo transit,
//! 5. lane scheduler and surface-chunk interest,
//! 6. transfer arrivals,
//! 7. macro events,
//! 8. production,
//! 9. readiness then morale event drains.
//!
//! Any deviation breaks cross-machine determinism. Wall-clock pacing lives
//! in a wrapper that never touches hashed state.

use thiserror::Error;

use crate::aero::AeroRegistry;
use crate::ai::{AiScheduler, AiError, AiSchedulerConfig, AiTickContext, RecordingCommandSink, TraceSink};
use crate::bindings::BindingSets;
use crate::cohort::MilitaryCohortRegistry;
use crate::command::{
    decode_transfer_payload, decode_warp_payload, CommandError, CommandSink, KernelCommand,
    CMD_SCHEMA_TRANSFER, CMD_SCHEMA_VERSION, CMD_SCHEMA_WARP,
};
use crate::construction::ConstructionRegistry;
use crate::due::DueError;
use crate::economy::MacroEconomy;
use crate::engagement::{EngagementOutcomeList, EngagementRegistry};
use crate::faction::FactionRegistry;
use crate::force::SecurityForceRegistry;
use crate::governance::{EnforcementRegistry, LegitimacyRegistry};
use crate::hash::Fnv64;
use crate::ident::SessionIdentity;
use crate::lanes::{LaneScheduler, SurfaceChunks};
use crate::macro_events::{MacroEventError, MacroEvents};
use crate::morale::{MoraleRegistry, MoraleScheduler};
use crate::playback::{ReplayPlayback, ReplayRecorder};
use crate::population::PopulationRegistry;
use crate::production::{ProductionEngine, ProductionError};
use crate::readiness::{ReadinessRegistry, ReadinessScheduler};
use crate::rng::SimRng;
use crate::route::RouteGraph;
use crate::station::StationRegistry;
use crate::stores::StoreRegistry;
use crate::tick::Tick;
use crate::transfer::{TransferEntry, TransferError, TransferScheduler};
use crate::transit::CosmoTransit;

/// Default updates per second.
pub const DEFAULT_UPS: u32 = 30;
/// Default (and minimum) warp factor.
pub const DEFAULT_WARP_FACTOR: u32 = 1;
/// Maximum warp factor.
pub const MAX_WARP_FACTOR: u32 = 1024;
/// Current feature epoch of this build.
pub const FEATURE_EPOCH_CURRENT: u32 = 3;

const REGISTRY_CAPACITY: usize = 4096;
const EVENT_CAPACITY: usize = 1024;
const SURFACE_STEP_TURNS_Q16: i32 = 1 << 12;

/// Errors surfaced by the kernel driver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// Malformed configuration.
    #[error("invalid argument")]
    InvalidArgument,
    /// Transfer update failed mid-tick.
    #[error("transfer step failed: {0}")]
    Transfer(#[from] TransferError),
    /// Macro event update failed mid-tick.
    #[error("macro event step failed: {0}")]
    MacroEvents(#[from] MacroEventError),
    /// Production update failed mid-tick.
    #[error("production step failed: {0}")]
    Production(#[from] ProductionError),
    /// A due-queue drain failed mid-tick.
    #[error("scheduler step failed: {0}")]
    Scheduler(#[from] DueError),
    /// The AI scheduler failed.
    #[error("ai step failed: {0}")]
    Ai(#[from] AiError),
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The tick ran to completion.
    Advanced,
    /// An attached playback ran past its horizon; nothing was mutated.
    ReplayEnd,
}

/// War-side registries bundled for pipeline contexts.
///
/// The kernel owns these like every other registry; pipelines receive a
/// plain struct of mutable borrows built from this bundle.
pub struct WarState {
    /// Security forces.
    pub forces: SecurityForceRegistry,
    /// Military cohorts.
    pub military: MilitaryCohortRegistry,
    /// Population pools.
    pub population: PopulationRegistry,
    /// Readiness states.
    pub readiness: ReadinessRegistry,
    /// Readiness event scheduler.
    pub readiness_sched: ReadinessScheduler,
    /// Morale states.
    pub morale: MoraleRegistry,
    /// Morale event scheduler.
    pub morale_sched: MoraleScheduler,
    /// Equipment/supply stores.
    pub stores: StoreRegistry,
    /// Legitimacy states.
    pub legitimacy: LegitimacyRegistry,
    /// Enforcement capacities.
    pub enforcement: EnforcementRegistry,
    /// Engagements.
    pub engagements: EngagementRegistry,
    /// Engagement outcomes.
    pub outcomes: EngagementOutcomeList,
}

impl WarState {
    fn new() -> Self {
        Self {
            forces: SecurityForceRegistry::with_capacity(REGISTRY_CAPACITY, 1),
            military: MilitaryCohortRegistry::with_capacity(REGISTRY_CAPACITY),
            population: PopulationRegistry::with_capacity(REGISTRY_CAPACITY),
            readiness: ReadinessRegistry::with_capacity(REGISTRY_CAPACITY),
            readiness_sched: ReadinessScheduler::new(EVENT_CAPACITY, 0, 1),
            morale: MoraleRegistry::with_capacity(REGISTRY_CAPACITY),
            morale_sched: MoraleScheduler::new(EVENT_CAPACITY, 0, 1),
            stores: StoreRegistry::with_capacity(REGISTRY_CAPACITY),
            legitimacy: LegitimacyRegistry::with_capacity(REGISTRY_CAPACITY),
            enforcement: EnforcementRegistry::with_capacity(REGISTRY_CAPACITY),
            engagements: EngagementRegistry::with_capacity(REGISTRY_CAPACITY, 1),
            outcomes: EngagementOutcomeList::with_capacity(REGISTRY_CAPACITY, 1),
        }
    }
}

/// Kernel construction parameters.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Updates per second, `> 0`.
    pub ups: u32,
    /// World seed.
    pub seed: u64,
    /// Feature epoch of the content set.
    pub feature_epoch: u32,
    /// Session identity persisted with saves.
    pub identity: SessionIdentity,
    /// AI scheduler configuration.
    pub ai: AiSchedulerConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            ups: DEFAULT_UPS,
            seed: 1,
            feature_epoch: FEATURE_EPOCH_CURRENT,
            identity: SessionIdentity::new("default", 1, b""),
            ai: AiSchedulerConfig::default(),
        }
    }
}

/// The deterministic simulation kernel.
pub struct Kernel {
    ups: u32,
    tick_index: Tick,
    seed: u64,
    feature_epoch: u32,
    identity: SessionIdentity,
    rng: SimRng,

    warp_factor: u32,
    pending_warp: Option<(u32, Tick)>,
    wall_accum_us: u64,

    stations: StationRegistry,
    routes: RouteGraph,
    transfers: TransferScheduler,
    production: ProductionEngine,
    economy: MacroEconomy,
    macro_events: MacroEvents,
    factions: FactionRegistry,
    ai: AiScheduler,

    transit: CosmoTransit,
    lanes: LaneScheduler,
    surface: SurfaceChunks,
    constructions: ConstructionRegistry,
    bindings: BindingSets,
    aero: AeroRegistry,

    war: WarState,

    recorder: Option<ReplayRecorder>,
    replay: Option<ReplayPlayback>,
    on_tick_commands: Option<Box<dyn FnMut(Tick, &KernelCommand)>>,
    trace_sink: Option<Box<dyn TraceSink>>,
}

impl Kernel {
    /// Builds a fresh kernel at tick zero.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            ups: if config.ups == 0 { DEFAULT_UPS } else { config.ups },
            tick_index: 0,
            seed: config.seed,
            feature_epoch: config.feature_epoch,
            identity: config.identity,
            rng: SimRng::from_seed(config.seed as u32),
            warp_factor: DEFAULT_WARP_FACTOR,
            pending_warp: None,
            wall_accum_us: 0,
            stations: StationRegistry::with_capacity(REGISTRY_CAPACITY),
            routes: RouteGraph::with_capacity(REGISTRY_CAPACITY),
            transfers: TransferScheduler::new(),
            production: ProductionEngine::new(),
            economy: MacroEconomy::new(),
            macro_events: MacroEvents::new(),
            factions: FactionRegistry::new(),
            ai: AiScheduler::new(config.ai),
            transit: CosmoTransit::default(),
            lanes: LaneScheduler::new(),
            surface: SurfaceChunks::new(SURFACE_STEP_TURNS_Q16),
            constructions: ConstructionRegistry::with_capacity(REGISTRY_CAPACITY),
            bindings: BindingSets::new(),
            aero: AeroRegistry::with_capacity(REGISTRY_CAPACITY),
            war: WarState::new(),
            recorder: None,
            replay: None,
            on_tick_commands: None,
            trace_sink: None,
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Updates per second.
    #[must_use]
    pub fn ups(&self) -> u32 {
        self.ups
    }

    /// Current tick index.
    #[must_use]
    pub fn tick_index(&self) -> Tick {
        self.tick_index
    }

    /// World seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Feature epoch of the running content set.
    #[must_use]
    pub fn feature_epoch(&self) -> u32 {
        self.feature_epoch
    }

    /// Session identity.
    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Current warp factor.
    #[must_use]
    pub fn warp_factor(&self) -> u32 {
        self.warp_factor
    }

    /// PRNG state word (persisted in the `RNG ` chunk).
    #[must_use]
    pub fn rng_state(&self) -> u32 {
        self.rng.state()
    }

    // ── Registry access ─────────────────────────────────────────────

    /// Stations.
    #[must_use]
    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    /// Stations, mutable.
    pub fn stations_mut(&mut self) -> &mut StationRegistry {
        &mut self.stations
    }

    /// Routes.
    #[must_use]
    pub fn routes(&self) -> &RouteGraph {
        &self.routes
    }

    /// Routes, mutable.
    pub fn routes_mut(&mut self) -> &mut RouteGraph {
        &mut self.routes
    }

    /// Transfer scheduler.
    #[must_use]
    pub fn transfers(&self) -> &TransferScheduler {
        &self.transfers
    }

    /// Transfer scheduler, mutable.
    pub fn transfers_mut(&mut self) -> &mut TransferScheduler {
        &mut self.transfers
    }

    /// Re-inserts a persisted in-flight transfer (save-load entry point).
    pub fn load_transfer(
        &mut self,
        record: crate::transfer::TransferRecord,
    ) -> Result<(), TransferError> {
        self.transfers.add_loaded(&self.routes, record)
    }

    /// Schedules a transfer departing now (host-facing convenience).
    pub fn schedule_transfer(
        &mut self,
        route_id: u64,
        entries: &[TransferEntry],
    ) -> Result<u64, TransferError> {
        self.transfers.schedule(
            &self.routes,
            &mut self.stations,
            route_id,
            entries,
            self.tick_index,
        )
    }

    /// Production engine.
    #[must_use]
    pub fn production(&self) -> &ProductionEngine {
        &self.production
    }

    /// Production engine, mutable.
    pub fn production_mut(&mut self) -> &mut ProductionEngine {
        &mut self.production
    }

    /// Macro economy.
    #[must_use]
    pub fn economy(&self) -> &MacroEconomy {
        &self.economy
    }

    /// Macro economy, mutable.
    pub fn economy_mut(&mut self) -> &mut MacroEconomy {
        &mut self.economy
    }

    /// Macro events.
    #[must_use]
    pub fn macro_events(&self) -> &MacroEvents {
        &self.macro_events
    }

    /// Macro events, mutable.
    pub fn macro_events_mut(&mut self) -> &mut MacroEvents {
        &mut self.macro_events
    }

    /// Factions.
    #[must_use]
    pub fn factions(&self) -> &FactionRegistry {
        &self.factions
    }

    /// Factions, mutable.
    pub fn factions_mut(&mut self) -> &mut FactionRegistry {
        &mut self.factions
    }

    /// AI scheduler.
    #[must_use]
    pub fn ai(&self) -> &AiScheduler {
        &self.ai
    }

    /// AI scheduler, mutable.
    pub fn ai_mut(&mut self) -> &mut AiScheduler {
        &mut self.ai
    }

    /// Cosmo transit slot.
    #[must_use]
    pub fn transit(&self) -> &CosmoTransit {
        &self.transit
    }

    /// Cosmo transit slot, mutable.
    pub fn transit_mut(&mut self) -> &mut CosmoTransit {
        &mut self.transit
    }

    /// Lane scheduler.
    #[must_use]
    pub fn lanes(&self) -> &LaneScheduler {
        &self.lanes
    }

    /// Lane scheduler, mutable.
    pub fn lanes_mut(&mut self) -> &mut LaneScheduler {
        &mut self.lanes
    }

    /// Surface chunks.
    #[must_use]
    pub fn surface(&self) -> &SurfaceChunks {
        &self.surface
    }

    /// Replaces the surface-chunk set (save-load entry point).
    pub fn set_surface(&mut self, surface: SurfaceChunks) {
        self.surface = surface;
    }

    /// Construction registry.
    #[must_use]
    pub fn constructions(&self) -> &ConstructionRegistry {
        &self.constructions
    }

    /// Construction registry, mutable.
    pub fn constructions_mut(&mut self) -> &mut ConstructionRegistry {
        &mut self.constructions
    }

    /// Media/weather bindings.
    #[must_use]
    pub fn bindings(&self) -> &BindingSets {
        &self.bindings
    }

    /// Media/weather bindings, mutable.
    pub fn bindings_mut(&mut self) -> &mut BindingSets {
        &mut self.bindings
    }

    /// Aero registries.
    #[must_use]
    pub fn aero(&self) -> &AeroRegistry {
        &self.aero
    }

    /// Aero registries, mutable.
    pub fn aero_mut(&mut self) -> &mut AeroRegistry {
        &mut self.aero
    }

    /// War-side registries.
    #[must_use]
    pub fn war(&self) -> &WarState {
        &self.war
    }

    /// War-side registries, mutable.
    pub fn war_mut(&mut self) -> &mut WarState {
        &mut self.war
    }

    // ── Hooks ───────────────────────────────────────────────────────

    /// Registers the per-kernel tick-command observer. The observer sees
    /// every executed command; it must not call back into the kernel.
    pub fn set_on_tick_commands(
        &mut self,
        observer: Option<Box<dyn FnMut(Tick, &KernelCommand)>>,
    ) {
        self.on_tick_commands = observer;
    }

    /// Installs a best-effort AI trace sink.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace_sink = sink;
    }

    /// Attaches a fresh replay recorder.
    pub fn start_recording(&mut self) {
        self.recorder = Some(ReplayRecorder::new());
    }

    /// Detaches and returns the recorder.
    pub fn take_recording(&mut self) -> Option<ReplayRecorder> {
        self.recorder.take()
    }

    /// Attaches a playback; its packets are injected at the start of each
    /// target tick.
    pub fn set_replay(&mut self, playback: Option<ReplayPlayback>) {
        self.replay = playback;
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Executes one command immediately. Returns the tick it applied at.
    pub fn execute(&mut self, cmd: &KernelCommand) -> Result<Tick, CommandError> {
        self.execute_inner(cmd, true)
    }

    fn execute_inner(&mut self, cmd: &KernelCommand, record: bool) -> Result<Tick, CommandError> {
        if cmd.schema_ver != CMD_SCHEMA_VERSION {
            return Err(CommandError::UnknownSchema);
        }
        match cmd.schema_id {
            CMD_SCHEMA_WARP => {
                let (factor, effective_tick) = decode_warp_payload(&cmd.payload)?;
                let factor = factor.clamp(DEFAULT_WARP_FACTOR, MAX_WARP_FACTOR);
                self.pending_warp = Some((factor, effective_tick));
            }
            CMD_SCHEMA_TRANSFER => {
                let (route_id, resource_id, qty) = decode_transfer_payload(&cmd.payload)?;
                self.transfers
                    .schedule(
                        &self.routes,
                        &mut self.stations,
                        route_id,
                        &[TransferEntry {
                            resource_id,
                            quantity: qty,
                        }],
                        self.tick_index,
                    )
                    .map_err(|_| CommandError::Execution)?;
            }
            _ => return Err(CommandError::UnknownSchema),
        }
        if record {
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record(self.tick_index, cmd);
            }
        }
        if let Some(observer) = self.on_tick_commands.as_mut() {
            observer(self.tick_index, cmd);
        }
        Ok(self.tick_index)
    }

    // ── Tick loop ───────────────────────────────────────────────────

    /// Advances the simulation by exactly one tick.
    pub fn step(&mut self) -> Result<StepOutcome, KernelError> {
        // 1. Replay injection: packets recorded at the current tick ran
        // between the previous step and this one, so they are fed back in
        // before anything else moves.
        if let Some(mut playback) = self.replay.take() {
            let target_tick = self.tick_index;
            if playback.ended(target_tick) {
                self.replay = Some(playback);
                return Ok(StepOutcome::ReplayEnd);
            }
            for cmd in playback.next_for_tick(target_tick) {
                // Replayed commands are not re-recorded; failures are
                // deterministic no-ops, same as at record time.
                let _ = self.execute_inner(&cmd, false);
            }
            self.replay = Some(playback);
        }

        // 2. Pending warp commit.
        if let Some((factor, effective_tick)) = self.pending_warp {
            if self.tick_index >= effective_tick {
                self.warp_factor = factor.clamp(DEFAULT_WARP_FACTOR, MAX_WARP_FACTOR);
                self.pending_warp = None;
            }
        }

        // 3. World advance.
        self.tick_index += 1;
        let _ = self.rng.next_u32();
        let now = self.tick_index;

        // 4. Cosmo transit.
        let _ = self.transit.tick(now);

        // 5. Lane scheduler and surface interest.
        match self.lanes.update(now) {
            Some(bubble) => self
                .surface
                .set_interest(bubble.body_id, bubble.center, bubble.radius_m),
            None => self.surface.clear_interest(),
        }

        // 6–8. Logistics, macro events, production.
        self.transfers
            .update(&self.routes, &mut self.stations, now)?;
        self.macro_events.update(&mut self.economy, now)?;
        self.production.update(&mut self.stations, now)?;

        // 9. Readiness then morale drains.
        self.war
            .readiness_sched
            .advance(&mut self.war.readiness, Some(&mut self.war.stores), now)
            .map_err(|err| match err {
                crate::readiness::ReadinessError::Scheduler(e) => KernelError::Scheduler(e),
                _ => KernelError::Scheduler(DueError::Invalid),
            })?;
        self.war
            .morale_sched
            .advance(&mut self.war.morale, Some(&self.war.legitimacy), now)
            .map_err(|err| match err {
                crate::morale::MoraleError::Scheduler(e) => KernelError::Scheduler(e),
                _ => KernelError::Scheduler(DueError::Invalid),
            })?;

        Ok(StepOutcome::Advanced)
    }

    /// Runs the AI scheduler for the current tick and executes every
    /// emitted command.
    pub fn ai_step(&mut self) -> Result<(), KernelError> {
        let sim_hash = self.world_hash();
        let mut staged = RecordingCommandSink::default();
        let trace_sink: Option<&mut dyn TraceSink> = match self.trace_sink.as_mut() {
            Some(sink) => Some(sink.as_mut()),
            None => None,
        };
        {
            let mut ctx = AiTickContext {
                factions: &self.factions,
                economy: &self.economy,
                events: &mut self.macro_events,
                stations: &self.stations,
                routes: &self.routes,
                sim_hash,
                commands: &mut staged,
                traces: trace_sink,
            };
            self.ai.tick(&mut ctx, self.tick_index)?;
        }
        for cmd in staged.commands {
            let _ = self.execute(&cmd);
        }
        Ok(())
    }

    /// Wall-clock pacing wrapper: accumulates microseconds and steps in
    /// whole-tick increments. Warp divides the per-tick budget (floor 1µs).
    /// Returns the number of ticks stepped and the last outcome.
    pub fn tick_wall(&mut self, wall_dt_usec: u64) -> Result<(u32, StepOutcome), KernelError> {
        let mut tick_us = if self.ups > 0 {
            1_000_000 / u64::from(self.ups)
        } else {
            0
        };
        if self.warp_factor > 1 && tick_us > 0 {
            tick_us = (tick_us / u64::from(self.warp_factor)).max(1);
        }

        if tick_us == 0 {
            let outcome = self.step()?;
            return Ok((1, outcome));
        }

        self.wall_accum_us += wall_dt_usec;
        let mut stepped = 0u32;
        let mut outcome = StepOutcome::Advanced;
        while self.wall_accum_us >= tick_us {
            outcome = self.step()?;
            self.wall_accum_us -= tick_us;
            stepped += 1;
            if outcome == StepOutcome::ReplayEnd {
                break;
            }
        }
        Ok((stepped, outcome))
    }

    // ── Persistence surface ─────────────────────────────────────────

    /// Canonical CORE chunk payload: warp state.
    pub fn encode_core_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.warp_factor.to_le_bytes());
        match self.pending_warp {
            Some((factor, tick)) => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&factor.to_le_bytes());
                out.extend_from_slice(&tick.to_le_bytes());
            }
            None => {
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&0u64.to_le_bytes());
            }
        }
    }

    /// Applies a CORE chunk payload; false on malformed bytes.
    pub fn apply_core_blob(&mut self, blob: &[u8]) -> bool {
        fn read_u32(blob: &[u8], at: usize) -> Option<u32> {
            Some(u32::from_le_bytes(blob.get(at..at + 4)?.try_into().ok()?))
        }
        fn read_u64(blob: &[u8], at: usize) -> Option<u64> {
            Some(u64::from_le_bytes(blob.get(at..at + 8)?.try_into().ok()?))
        }
        if blob.len() != 20 {
            return false;
        }
        let (Some(factor), Some(pending_valid), Some(pending_factor), Some(pending_tick)) = (
            read_u32(blob, 0),
            read_u32(blob, 4),
            read_u32(blob, 8),
            read_u64(blob, 12),
        ) else {
            return false;
        };
        if !(DEFAULT_WARP_FACTOR..=MAX_WARP_FACTOR).contains(&factor) || pending_valid > 1 {
            return false;
        }
        self.warp_factor = factor;
        self.pending_warp = if pending_valid == 1 {
            Some((pending_factor, pending_tick))
        } else {
            None
        };
        true
    }

    /// Restores the header triple after a load.
    pub fn restore_header(&mut self, tick_index: Tick, seed: u64, feature_epoch: u32) {
        self.tick_index = tick_index;
        self.seed = seed;
        self.feature_epoch = feature_epoch;
    }

    /// Restores the PRNG from its persisted state word.
    pub fn restore_rng(&mut self, state: u32) {
        self.rng = SimRng::from_state(state);
    }

    /// Replaces the session identity after a load.
    pub fn restore_identity(&mut self, identity: SessionIdentity) {
        self.identity = identity;
    }

    /// Deterministic 64-bit fingerprint over all authoritative state, in
    /// fixed chunk order. Stable across machines and builds for identical
    /// inputs and feature epoch.
    #[must_use]
    pub fn world_hash(&self) -> u64 {
        let mut acc = Fnv64::new();
        acc.update_u64(self.tick_index);
        acc.update_u64(self.seed);
        acc.update_u64(u64::from(self.ups));
        acc.update_u64(u64::from(self.feature_epoch));
        acc.update_u64(u64::from(self.rng.state()));

        let mut blob = Vec::new();
        self.encode_core_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.transit.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.surface.encode_blob(&mut blob);
        acc.update(&blob);

        acc.update(&self.bindings.encode_media_blob());
        acc.update(&self.bindings.encode_weather_blob());

        blob.clear();
        self.aero.encode_props_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.aero.encode_states_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.constructions.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.stations.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.routes.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.transfers.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.production.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.economy.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.macro_events.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.factions.encode_blob(&mut blob);
        acc.update(&blob);

        blob.clear();
        self.ai.encode_blob(&mut blob);
        acc.update(&blob);

        acc.digest()
    }
}

impl CommandSink for Kernel {
    fn submit(&mut self, cmd: KernelCommand) -> Result<(), CommandError> {
        self.execute(&cmd).map(|_| ())
    }
}
