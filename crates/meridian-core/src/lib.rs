// SPDX-License-Identifier: Apache-2.0
//! meridian-core: deterministic tick-driven macro-strategy simulation
//! kernel.
//!
//! The kernel advances a world of interacting macro subsystems — economy
//! rates, scheduled events, logistics transfers, production rules,
//! military pipelines, epistemic views, and faction AI — in lock-step
//! across machines and replays. All authoritative state is integer-typed,
//! iterated in fixed orders, and folded into a 64-bit world hash for
//! desync detection; the companion `meridian-save` crate persists it
//! through a versioned binary container.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

pub mod aero;
pub mod ai;
pub mod bindings;
pub mod casualty;
pub mod cohort;
pub mod command;
pub mod construction;
pub mod due;
pub mod economy;
pub mod engagement;
pub mod epistemic;
pub mod faction;
pub mod fixed;
pub mod force;
pub mod governance;
pub mod hash;
pub mod ident;
pub mod kernel;
pub mod lanes;
pub mod loss;
pub mod macro_events;
pub mod mobilize;
pub mod morale;
pub mod playback;
pub mod population;
pub mod production;
pub mod readiness;
pub mod registry;
pub mod rng;
pub mod route;
pub mod station;
pub mod stores;
pub mod tick;
pub mod tlv;
pub mod transfer;
pub mod transit;

// Re-exports for the stable public API.
/// Tick primitives.
pub use tick::{tick_min_due, tick_saturating_add, Tick, TICK_NONE};
/// Due-time dispatch substrate.
pub use due::{DueDisposition, DueError, DueHandle, DueQueue, DueSource};
/// World hashing.
pub use hash::{fnv1a64, hash_combine, hash_mix, hash_u64x4, Fnv64};
/// Session identity derivation.
pub use ident::{make_instance_id, make_manifest_hash, InstanceId, SessionIdentity};
/// Kernel driver and step outcomes.
pub use kernel::{
    Kernel, KernelConfig, KernelError, StepOutcome, WarState, DEFAULT_UPS, DEFAULT_WARP_FACTOR,
    FEATURE_EPOCH_CURRENT, MAX_WARP_FACTOR,
};
/// Kernel commands and replay packets.
pub use command::{
    decode_command, decode_transfer_payload, decode_warp_payload, encode_command,
    encode_transfer_payload, encode_warp_payload, CommandError, CommandSink, KernelCommand,
    CMD_SCHEMA_TRANSFER, CMD_SCHEMA_VERSION, CMD_SCHEMA_WARP,
};
/// Replay recording/playback.
pub use playback::{ReplayError, ReplayPacket, ReplayPlayback, ReplayRecorder};
/// Stations and inventories.
pub use station::{
    InventoryEntry, ResourceId, Station, StationDesc, StationError, StationId, StationRegistry,
};
/// Routes.
pub use route::{Route, RouteError, RouteGraph, RouteId};
/// Transfers.
pub use transfer::{TransferEntry, TransferError, TransferRecord, TransferScheduler};
/// Production.
pub use production::{ProductionEngine, ProductionError, ProductionRule};
/// Macro economy.
pub use economy::{EconomyError, MacroEconomy, MacroScope, ResourceAmount, ScopeKind};
/// Macro events.
pub use macro_events::{MacroEvent, MacroEventEffect, MacroEventError, MacroEvents};
/// Factions.
pub use faction::{
    Faction, FactionDesc, FactionError, FactionId, FactionRegistry, PolicyKind, ResourceDelta,
    POLICY_ALLOW_EVENTS, POLICY_ALLOW_ROUTE, POLICY_ALLOW_STATION,
};
/// AI scheduling and tracing.
pub use ai::{
    AiError, AiFactionState, AiReasonCode, AiScheduler, AiSchedulerConfig, AiTickContext,
    AiTraceRecord, RecordingCommandSink, TraceSink,
};
/// Epistemic snapshots.
pub use epistemic::{
    epistemic_query, CapabilityEntry, CapabilityKind, CapabilitySnapshot, EpistemicState,
    EpistemicView, EXPIRES_NEVER,
};
/// War pipelines.
pub use mobilize::{
    war_demobilization_apply, war_mobilization_apply, DemobilizationContext, DemobilizationError,
    DemobilizationRequest, EquipmentRequirement, MobilizationContext, MobilizationError,
    MobilizationRequest, MobilizationResult, WarRefusal,
};
/// Engagements.
pub use engagement::{
    engagement_resolve, outcome_estimate_from_view, Engagement, EngagementError, EngagementOutcome,
    EngagementOutcomeList, EngagementRefusal, EngagementRegistry, EngagementStatus, EquipmentLoss,
    ForceCasualtySource, Objective, OutcomeSummary, Participant, ResolutionContext, Role,
};
/// Casualty generation.
pub use casualty::{
    casualty_generate, CasualtyError, CasualtyRequest, CasualtySource, LifeDeathHandler,
};
/// Forces and cohorts.
pub use cohort::{CohortError, MilitaryCohort, MilitaryCohortRegistry, MilitaryRole};
pub use force::{
    force_estimate_from_view, DomainScope, EquipmentLine, ForceError, ForceEstimate, ForceId,
    ForceStatus, SecurityForce, SecurityForceRegistry, FORCE_MAX_EQUIPMENT, FORCE_MAX_LOGISTICS,
};
/// Readiness and morale.
pub use morale::{
    MoraleError, MoraleEvent, MoraleEventKind, MoraleModifiers, MoraleRegistry, MoraleScheduler,
    MoraleState, MORALE_SCALE,
};
pub use readiness::{
    ReadinessError, ReadinessEvent, ReadinessEventKind, ReadinessRegistry, ReadinessScheduler,
    ReadinessState, READINESS_SCALE,
};
/// Governance collaborators.
pub use governance::{
    EnforcementCapacity, EnforcementRegistry, GovernanceError, LegitimacyRegistry, LegitimacyState,
    LEGITIMACY_SCALE,
};
/// Population pools.
pub use population::{PopulationCohort, PopulationError, PopulationRegistry};
/// Equipment/supply stores.
pub use stores::{AssetId, StoreError, StoreId, StoreRegistry};
/// Deterministic PRNG.
pub use rng::SimRng;
/// Fixed-point scalars.
pub use fixed::{checked_mul_u64, Q16, Q48};
/// TLV framing.
pub use tlv::{TlvError, TlvReader, TlvRecord, TlvWriter};
/// Cosmo transit state.
pub use transit::CosmoTransit;
/// Lanes and surface chunks.
pub use lanes::{ActivationBubble, LaneKind, LaneScheduler, LatLongQ16, SurfaceChunkKey, SurfaceChunks};
/// Construction instances.
pub use construction::{
    ConstructionError, ConstructionId, ConstructionInstance, ConstructionRegistry,
    CONSTRUCTION_MAX_TYPE_ID,
};
/// Media/weather bindings.
pub use bindings::{BindingError, BindingSets, MediaBinding, WeatherBinding};
/// Aero registries.
pub use aero::{AeroError, AeroProps, AeroRegistry, AeroState, VesselId};
/// Generic registry plumbing.
pub use registry::{Keyed, Registry, RegistryError};
