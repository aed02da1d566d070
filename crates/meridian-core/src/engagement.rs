// SPDX-License-Identifier: Apache-2.0
//! Engagements and deterministic resolution.
//!
//! Resolution walks the pre-sorted participant list, computes strengths
//! through fixed ratio chains (all integer arithmetic), picks a winner only
//! past a 5% margin, generates casualties body-by-body through the life
//! pipeline, books equipment and morale/legitimacy losses, consumes
//! logistics, and appends one outcome record. Every step iterates in a
//! fixed order so identical inputs resolve identically on every machine.

use thiserror::Error;

use crate::casualty::{casualty_generate, CasualtyRequest, CasualtySource, LifeDeathHandler};
use crate::cohort::MilitaryCohortRegistry;
use crate::epistemic::{EpistemicState, EpistemicView};
use crate::force::{DomainScope, EquipmentLine, ForceId, SecurityForceRegistry};
use crate::governance::{LegitimacyRegistry, LEGITIMACY_SCALE};
use crate::hash::hash_mix;
use crate::loss;
use crate::morale::{MoraleRegistry, MORALE_SCALE};
use crate::readiness::{ReadinessRegistry, READINESS_SCALE};
use crate::registry::{Keyed, Registry, RegistryError};
use crate::stores::{AssetId, StoreId, StoreRegistry};
use crate::tick::{Tick, TICK_NONE};

/// Maximum participants per engagement.
pub const ENGAGEMENT_MAX_PARTICIPANTS: usize = 8;
/// Maximum environment modifiers per engagement.
pub const ENGAGEMENT_MAX_ENV_MODIFIERS: usize = 8;
/// Maximum casualty event ids per outcome.
pub const ENGAGEMENT_MAX_CASUALTIES: usize = 64;
/// Maximum equipment-loss lines per outcome.
pub const ENGAGEMENT_MAX_EQUIPMENT_LOSSES: usize = 16;

/// Errors surfaced by engagement registration and resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngagementError {
    /// Malformed engagement outside the refusal taxonomy.
    #[error("invalid argument")]
    InvalidArgument,
    /// Engagement id already registered.
    #[error("duplicate engagement id")]
    DuplicateId,
    /// Registry or outcome list at capacity.
    #[error("engagement capacity exhausted")]
    Full,
    /// Unknown engagement id.
    #[error("engagement not found")]
    NotFound,
    /// Business refusal; participant state is untouched.
    #[error("engagement refused: {0:?}")]
    Refused(EngagementRefusal),
}

impl From<RegistryError> for EngagementError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// Business reason a resolution was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementRefusal {
    /// The engagement has already been resolved.
    AlreadyResolved,
    /// A participant is missing state or has zero strength.
    ParticipantNotReady,
    /// Shared supply could not be evaluated.
    InsufficientSupply,
    /// Objective, role, or timing fields are invalid.
    ObjectiveInvalid,
    /// A participant's force operates in a different domain.
    OutOfDomain,
}

/// Engagement objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    /// Assault on a defended position.
    #[default]
    Attack,
    /// Static defense.
    Defend,
    /// Hit-and-run raid.
    Raid,
    /// Supply interdiction.
    Blockade,
}

impl Objective {
    /// Wire discriminant (persisted; must not change).
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Attack => 0,
            Self::Defend => 1,
            Self::Raid => 2,
            Self::Blockade => 3,
        }
    }

    /// Parses a wire discriminant.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Attack),
            1 => Some(Self::Defend),
            2 => Some(Self::Raid),
            3 => Some(Self::Blockade),
            _ => None,
        }
    }
}

/// Side a participant fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Initiating side.
    Attacker,
    /// Defending side.
    Defender,
}

/// Lifecycle status of an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngagementStatus {
    /// Awaiting resolution.
    #[default]
    Scheduled,
    /// Resolved; immutable.
    Resolved,
}

/// One force taking part in an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Participant {
    /// Participating force.
    pub force_id: ForceId,
    /// Legitimacy state consulted for this participant, or zero.
    pub legitimacy_id: u64,
    /// Side fought on.
    pub role: Role,
    /// Supply store override; zero falls back to the force's first
    /// logistics dependency.
    pub supply_store_ref: StoreId,
}

/// A scheduled or resolved engagement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    /// Engagement id, nonzero.
    pub engagement_id: u64,
    /// Domain every participating force must match.
    pub domain_scope: DomainScope,
    /// Participants sorted ascending by force id, `2..=8`.
    pub participants: Vec<Participant>,
    /// Tick the engagement began.
    pub start_tick: Tick,
    /// Tick it resolves at, `>= start_tick`.
    pub resolution_tick: Tick,
    /// Objective being contested.
    pub objective: Objective,
    /// Deterministic environment modifiers, at most 8.
    pub env_modifiers: Vec<u64>,
    /// Next scheduler wakeup for this engagement.
    pub next_due_tick: Tick,
    /// Provenance reference; zero falls back to the engagement id.
    pub provenance_ref: u64,
    /// Shared supply asset consumed at resolution, or zero.
    pub supply_asset_id: AssetId,
    /// Quantity of the supply asset each participant consumes.
    pub supply_qty: u32,
    /// Lifecycle status.
    pub status: EngagementStatus,
}

impl Keyed for Engagement {
    fn key(&self) -> u64 {
        self.engagement_id
    }
}

/// Id-sorted engagement store.
#[derive(Debug)]
pub struct EngagementRegistry {
    engagements: Registry<Engagement>,
    next_id: u64,
}

impl EngagementRegistry {
    /// Creates an empty registry bounded at `capacity`; ids start at
    /// `start_id` (zero maps to one).
    #[must_use]
    pub fn with_capacity(capacity: usize, start_id: u64) -> Self {
        Self {
            engagements: Registry::with_capacity(capacity),
            next_id: if start_id == 0 { 1 } else { start_id },
        }
    }

    /// Registers an engagement, assigning its id when zero and sorting
    /// participants by force id.
    pub fn register(&mut self, mut engagement: Engagement) -> Result<u64, EngagementError> {
        if engagement.participants.len() < 2
            || engagement.participants.len() > ENGAGEMENT_MAX_PARTICIPANTS
            || engagement.env_modifiers.len() > ENGAGEMENT_MAX_ENV_MODIFIERS
        {
            return Err(EngagementError::InvalidArgument);
        }
        if engagement.resolution_tick < engagement.start_tick {
            return Err(EngagementError::InvalidArgument);
        }
        if engagement.engagement_id == 0 {
            engagement.engagement_id = self.next_id;
        }
        engagement.participants.sort_by_key(|p| p.force_id);
        let id = engagement.engagement_id;
        self.engagements.insert(engagement)?;
        self.next_id = self.next_id.max(id + 1);
        Ok(id)
    }

    /// Looks up an engagement.
    #[must_use]
    pub fn get(&self, engagement_id: u64) -> Option<&Engagement> {
        self.engagements.get(engagement_id)
    }

    /// Marks an engagement resolved.
    pub fn mark_resolved(&mut self, engagement_id: u64) -> Result<(), EngagementError> {
        let engagement = self
            .engagements
            .get_mut(engagement_id)
            .ok_or(EngagementError::NotFound)?;
        engagement.status = EngagementStatus::Resolved;
        engagement.next_due_tick = TICK_NONE;
        Ok(())
    }

    /// Iterates engagements in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Engagement> {
        self.engagements.iter()
    }
}

/// One equipment loss line in an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentLoss {
    /// Equipment asset lost.
    pub equipment_id: AssetId,
    /// Quantity lost.
    pub qty: u32,
}

/// The recorded result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngagementOutcome {
    /// Outcome id assigned at append time.
    pub outcome_id: u64,
    /// Engagement resolved.
    pub engagement_id: u64,
    /// Winning force (smallest id on the winning side), or zero on a draw.
    pub winner_force_id: ForceId,
    /// Losing force (smallest id on the losing side), or zero on a draw.
    pub loser_force_id: ForceId,
    /// Death event ids in emission order, at most 64.
    pub casualty_event_ids: Vec<u64>,
    /// Equipment losses, at most 16 lines.
    pub equipment_losses: Vec<EquipmentLoss>,
    /// Winner-side morale delta recorded for estimates.
    pub morale_delta: i32,
    /// Winner-side legitimacy delta recorded for estimates.
    pub legitimacy_delta: i32,
    /// Supply units successfully consumed across participants.
    pub logistics_consumed: u32,
    /// `hash_mix(engagement_id, casualty_count)`.
    pub provenance_summary: u64,
}

impl EngagementOutcome {
    /// Number of casualties recorded.
    #[must_use]
    pub fn casualty_count(&self) -> u32 {
        self.casualty_event_ids.len() as u32
    }
}

/// Bounded append-only outcome list.
#[derive(Debug)]
pub struct EngagementOutcomeList {
    outcomes: Vec<EngagementOutcome>,
    capacity: usize,
    next_id: u64,
}

impl EngagementOutcomeList {
    /// Creates an empty list bounded at `capacity`; outcome ids start at
    /// `start_id` (zero maps to one).
    #[must_use]
    pub fn with_capacity(capacity: usize, start_id: u64) -> Self {
        Self {
            outcomes: Vec::new(),
            capacity,
            next_id: if start_id == 0 { 1 } else { start_id },
        }
    }

    /// Appends an outcome, assigning its id. Returns the id.
    pub fn append(&mut self, mut outcome: EngagementOutcome) -> Result<u64, EngagementError> {
        if self.outcomes.len() >= self.capacity {
            return Err(EngagementError::Full);
        }
        outcome.outcome_id = self.next_id;
        self.next_id += 1;
        let id = outcome.outcome_id;
        self.outcomes.push(outcome);
        Ok(id)
    }

    /// Looks up an outcome by id.
    #[must_use]
    pub fn find(&self, outcome_id: u64) -> Option<&EngagementOutcome> {
        self.outcomes.iter().find(|o| o.outcome_id == outcome_id)
    }

    /// Outcomes in append order.
    #[must_use]
    pub fn outcomes(&self) -> &[EngagementOutcome] {
        &self.outcomes
    }
}

/// A participant's casualty source keyed by force.
#[derive(Debug)]
pub struct ForceCasualtySource {
    /// Force the source belongs to.
    pub force_id: ForceId,
    /// Body pool consumed in order.
    pub source: CasualtySource,
}

/// Borrows and collaborators resolution needs.
pub struct ResolutionContext<'a, H: LifeDeathHandler> {
    /// Force registry.
    pub forces: &'a mut SecurityForceRegistry,
    /// Military cohort registry.
    pub military: &'a mut MilitaryCohortRegistry,
    /// Readiness states.
    pub readiness: &'a mut ReadinessRegistry,
    /// Morale states.
    pub morale: &'a mut MoraleRegistry,
    /// Legitimacy readings/mutations, when governance is modeled.
    pub legitimacy: Option<&'a mut LegitimacyRegistry>,
    /// Supply stores.
    pub stores: &'a mut StoreRegistry,
    /// Life/death pipeline.
    pub life: &'a mut H,
    /// Casualty sources, scanned linearly for the first matching force.
    pub casualty_sources: &'a mut [ForceCasualtySource],
    /// Template request for casualty generation.
    pub casualty_config: CasualtyRequest,
    /// Outcome sink.
    pub outcomes: &'a mut EngagementOutcomeList,
}

#[derive(Debug, Clone)]
struct ParticipantState {
    participant: Participant,
    cohort_id: u64,
    cohort_count: u32,
    equipment: Vec<EquipmentLine>,
    equipment_total: u32,
    readiness_id: u64,
    readiness_level: u32,
    degradation_rate: u32,
    morale_id: u64,
    morale_level: u32,
    legitimacy_value: Option<u32>,
    supply_store_ref: StoreId,
    supply_shortage: bool,
    strength: u64,
}

fn environment_factor(engagement: &Engagement) -> u32 {
    let mut h: u64 = 0xC0FFEE;
    h = hash_mix(h, u64::from(engagement.domain_scope.code()));
    for modifier in &engagement.env_modifiers {
        h = hash_mix(h, *modifier);
    }
    900 + (h % 201) as u32
}

fn objective_factor(objective: Objective, role: Role) -> u32 {
    match objective {
        Objective::Attack | Objective::Defend => match role {
            Role::Attacker => 900,
            Role::Defender => 1100,
        },
        Objective::Raid => match role {
            Role::Attacker => 950,
            Role::Defender => 1000,
        },
        Objective::Blockade => 1000,
    }
}

fn compute_strength(state: &mut ParticipantState, objective: Objective, env_factor: u32) {
    let mut readiness = state.readiness_level;
    if state.supply_shortage {
        readiness = readiness.saturating_sub(100);
    }
    let legitimacy_factor = state
        .legitimacy_value
        .map_or(1000, |value| (900 + value / 10).min(1000));
    let objective_factor = objective_factor(objective, state.participant.role);

    let mut strength = u64::from(state.cohort_count) * 1000;
    strength += u64::from(state.equipment_total) * 500;
    strength = strength * u64::from(readiness) / u64::from(READINESS_SCALE);
    strength = strength * u64::from(state.morale_level) / u64::from(MORALE_SCALE);
    strength = strength * u64::from(legitimacy_factor) / 1000;
    strength = strength * u64::from(env_factor) / 1000;
    strength = strength * u64::from(objective_factor) / 1000;
    state.strength = strength;
}

fn compute_casualties(cohort_count: u32, own: u64, opp: u64, role: Role) -> u32 {
    if cohort_count == 0 || own + opp == 0 {
        return 0;
    }
    let loss_scale = opp * 1000 / (own + opp);
    let mut casualties = u64::from(cohort_count) * loss_scale / 2000;
    casualties = match role {
        Role::Attacker => casualties * 1100 / 1000,
        Role::Defender => casualties * 900 / 1000,
    };
    casualties.min(u64::from(cohort_count)) as u32
}

fn select_force_by_role(states: &[ParticipantState], role: Role) -> ForceId {
    let mut selected = 0;
    for state in states {
        if state.participant.role != role || state.participant.force_id == 0 {
            continue;
        }
        if selected == 0 || state.participant.force_id < selected {
            selected = state.participant.force_id;
        }
    }
    selected
}

fn equipment_losses_for(
    equipment: &[EquipmentLine],
    casualties: u32,
    cohort_count: u32,
) -> Vec<EquipmentLoss> {
    let mut losses = Vec::new();
    if cohort_count == 0 {
        return losses;
    }
    for line in equipment {
        if line.asset_id == 0 || line.qty == 0 {
            continue;
        }
        let loss_qty =
            (u64::from(line.qty) * u64::from(casualties) / u64::from(cohort_count)) as u32;
        if loss_qty == 0 {
            continue;
        }
        losses.push(EquipmentLoss {
            equipment_id: line.asset_id,
            qty: loss_qty,
        });
    }
    losses
}

fn collect_participants<H: LifeDeathHandler>(
    engagement: &Engagement,
    ctx: &ResolutionContext<'_, H>,
) -> Result<Vec<ParticipantState>, EngagementError> {
    let mut states = Vec::with_capacity(engagement.participants.len());
    for participant in &engagement.participants {
        let force = ctx
            .forces
            .get(participant.force_id)
            .ok_or(EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        if force.domain_scope != engagement.domain_scope {
            return Err(EngagementError::Refused(EngagementRefusal::OutOfDomain));
        }
        let cohort = ctx
            .military
            .get(force.cohort_ref)
            .ok_or(EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        if cohort.count == 0 {
            return Err(EngagementError::Refused(EngagementRefusal::ParticipantNotReady));
        }
        let readiness = ctx
            .readiness
            .get(force.readiness_ref)
            .ok_or(EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        let morale = ctx
            .morale
            .get(force.morale_ref)
            .ok_or(EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        if readiness.level == 0 || morale.level == 0 {
            return Err(EngagementError::Refused(EngagementRefusal::ParticipantNotReady));
        }
        let legitimacy_value = if participant.legitimacy_id != 0 {
            ctx.legitimacy
                .as_ref()
                .and_then(|reg| reg.get(participant.legitimacy_id))
                .map(|state| state.value)
        } else {
            None
        };
        let supply_store_ref = if participant.supply_store_ref != 0 {
            participant.supply_store_ref
        } else {
            force.logistics_deps.first().copied().unwrap_or(0)
        };
        let supply_shortage = engagement.supply_asset_id != 0
            && engagement.supply_qty > 0
            && supply_store_ref != 0
            && ctx
                .stores
                .get_qty(supply_store_ref, engagement.supply_asset_id)
                .map_or(true, |available| available < engagement.supply_qty);

        states.push(ParticipantState {
            participant: *participant,
            cohort_id: cohort.cohort_id,
            cohort_count: cohort.count,
            equipment: force.equipment.clone(),
            equipment_total: force.equipment_total(),
            readiness_id: force.readiness_ref,
            readiness_level: readiness.level,
            degradation_rate: readiness.degradation_rate,
            morale_id: force.morale_ref,
            morale_level: morale.level,
            legitimacy_value,
            supply_store_ref,
            supply_shortage,
            strength: 0,
        });
    }
    Ok(states)
}

/// Resolves an engagement, returning the appended outcome.
///
/// Refuses early with `AlreadyResolved`, `ParticipantNotReady`,
/// `ObjectiveInvalid`, or `OutOfDomain`; refusals leave all state
/// untouched.
pub fn engagement_resolve<H: LifeDeathHandler>(
    engagement: &Engagement,
    ctx: &mut ResolutionContext<'_, H>,
) -> Result<EngagementOutcome, EngagementError> {
    if engagement.status == EngagementStatus::Resolved {
        return Err(EngagementError::Refused(EngagementRefusal::AlreadyResolved));
    }
    if engagement.participants.len() < 2
        || engagement.participants.len() > ENGAGEMENT_MAX_PARTICIPANTS
    {
        return Err(EngagementError::Refused(EngagementRefusal::ParticipantNotReady));
    }
    if engagement.env_modifiers.len() > ENGAGEMENT_MAX_ENV_MODIFIERS
        || engagement.resolution_tick < engagement.start_tick
    {
        return Err(EngagementError::Refused(EngagementRefusal::ObjectiveInvalid));
    }

    let mut states = collect_participants(engagement, ctx)?;
    let env_factor = environment_factor(engagement);

    let mut attacker_strength: u64 = 0;
    let mut defender_strength: u64 = 0;
    let mut attacker_cohort: u32 = 0;
    let mut defender_cohort: u32 = 0;
    for state in &mut states {
        compute_strength(state, engagement.objective, env_factor);
        match state.participant.role {
            Role::Attacker => {
                attacker_strength += state.strength;
                attacker_cohort += state.cohort_count;
            }
            Role::Defender => {
                defender_strength += state.strength;
                defender_cohort += state.cohort_count;
            }
        }
    }
    if attacker_strength == 0
        || defender_strength == 0
        || attacker_cohort == 0
        || defender_cohort == 0
    {
        return Err(EngagementError::Refused(EngagementRefusal::ParticipantNotReady));
    }

    // Winner requires a margin of at least 5% of the stronger side.
    let (mut winner_force_id, mut loser_force_id) = (0, 0);
    if attacker_strength > defender_strength {
        let diff = attacker_strength - defender_strength;
        if diff * 100 / attacker_strength >= 5 {
            winner_force_id = select_force_by_role(&states, Role::Attacker);
            loser_force_id = select_force_by_role(&states, Role::Defender);
        }
    } else if defender_strength > attacker_strength {
        let diff = defender_strength - attacker_strength;
        if diff * 100 / defender_strength >= 5 {
            winner_force_id = select_force_by_role(&states, Role::Defender);
            loser_force_id = select_force_by_role(&states, Role::Attacker);
        }
    }

    let mut outcome = EngagementOutcome {
        engagement_id: engagement.engagement_id,
        winner_force_id,
        loser_force_id,
        ..EngagementOutcome::default()
    };
    let decided = winner_force_id != 0 && loser_force_id != 0;
    if decided {
        outcome.morale_delta = 50;
        outcome.legitimacy_delta = 10;
    }

    // Casualties, cohort decrements, and equipment losses.
    for state in &states {
        let (own, opp) = match state.participant.role {
            Role::Attacker => (attacker_strength, defender_strength),
            Role::Defender => (defender_strength, attacker_strength),
        };
        let mut casualties =
            compute_casualties(state.cohort_count, own, opp, state.participant.role);
        if state.supply_shortage {
            let extra = (casualties + state.degradation_rate).div_ceil(20);
            if extra > 0 {
                casualties = (casualties + extra).min(state.cohort_count);
            }
        }
        if casualties == 0 {
            continue;
        }
        let source = ctx
            .casualty_sources
            .iter_mut()
            .find(|s| s.force_id == state.participant.force_id)
            .ok_or(EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        let mut request = ctx.casualty_config;
        request.act_time = engagement.resolution_tick;
        request.provenance_ref = if engagement.provenance_ref != 0 {
            engagement.provenance_ref
        } else {
            engagement.engagement_id
        };
        let remaining = ENGAGEMENT_MAX_CASUALTIES - outcome.casualty_event_ids.len();
        let produced = casualty_generate(
            ctx.life,
            &mut source.source,
            casualties,
            &request,
            &mut outcome.casualty_event_ids,
            remaining,
        )
        .map_err(|_| EngagementError::Refused(EngagementRefusal::ParticipantNotReady))?;
        let _ = ctx.military.adjust_count(state.cohort_id, -(produced as i32));

        // Equipment losses are computed once per participant and booked
        // twice: onto the outcome record (bounded) and against the force's
        // own lines. Both must happen exactly once.
        let losses = equipment_losses_for(&state.equipment, casualties, state.cohort_count);
        for item in &losses {
            if outcome.equipment_losses.len() >= ENGAGEMENT_MAX_EQUIPMENT_LOSSES {
                break;
            }
            outcome.equipment_losses.push(*item);
        }
        if let Some(force) = ctx.forces.get_mut(state.participant.force_id) {
            loss::apply_equipment_losses(force, &losses);
        }
    }

    // Morale and legitimacy aftermath.
    for state in &states {
        let mut morale_delta = 0i32;
        let mut legitimacy_delta = 0i32;
        if decided {
            let side_winner = select_force_by_role(&states, state.participant.role);
            if side_winner == winner_force_id {
                morale_delta = 50;
                legitimacy_delta = 10;
            } else {
                morale_delta = -50;
                legitimacy_delta = -10;
            }
        }
        if state.supply_shortage {
            morale_delta -= 25;
            loss::apply_readiness(
                ctx.readiness,
                state.readiness_id,
                -(state.degradation_rate as i32),
                engagement.resolution_tick,
            );
        }
        if let Some(value) = state.legitimacy_value {
            let threshold = LEGITIMACY_SCALE / 2;
            if value < threshold {
                let penalty = ((threshold - value) / 10).min(50);
                morale_delta -= penalty as i32;
            }
        }
        loss::apply_morale(ctx.morale, state.morale_id, morale_delta);
        if state.participant.legitimacy_id != 0 {
            if let Some(legitimacy) = ctx.legitimacy.as_deref_mut() {
                loss::apply_legitimacy(legitimacy, state.participant.legitimacy_id, legitimacy_delta);
            }
        }
    }

    // Logistics consumption.
    if engagement.supply_asset_id != 0 && engagement.supply_qty > 0 {
        for state in &states {
            if state.supply_store_ref == 0 {
                continue;
            }
            if ctx
                .stores
                .consume(
                    state.supply_store_ref,
                    engagement.supply_asset_id,
                    engagement.supply_qty,
                )
                .is_ok()
            {
                outcome.logistics_consumed += engagement.supply_qty;
            }
        }
    }

    outcome.provenance_summary = hash_mix(
        engagement.engagement_id,
        u64::from(outcome.casualty_count()),
    );
    let outcome_id = ctx.outcomes.append(outcome.clone())?;
    outcome.outcome_id = outcome_id;
    Ok(outcome)
}

/// What an observer can say about an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeSummary {
    /// Casualty count, bucketed when not exactly known.
    pub casualty_count: u32,
    /// Equipment-loss line count, bucketed when not exactly known.
    pub equipment_loss_count: u32,
    /// Morale delta, bucketed when not exactly known.
    pub morale_delta: i32,
    /// Legitimacy delta, bucketed when not exactly known.
    pub legitimacy_delta: i32,
    /// Uncertainty of the underlying view.
    pub uncertainty_q16: u32,
    /// Whether the summary carries exact values.
    pub is_exact: bool,
}

fn bucket_u32(value: u32, bucket: u32) -> u32 {
    if bucket == 0 {
        value
    } else {
        value / bucket * bucket
    }
}

/// Buckets an outcome through an epistemic view: exact only for KNOWN and
/// certain views, otherwise coarse presentation buckets.
#[must_use]
pub fn outcome_estimate_from_view(
    view: Option<&EpistemicView>,
    outcome: &EngagementOutcome,
) -> OutcomeSummary {
    let is_known =
        view.is_some_and(|v| v.state == EpistemicState::Known && !v.is_uncertain);
    if is_known {
        return OutcomeSummary {
            casualty_count: outcome.casualty_count(),
            equipment_loss_count: outcome.equipment_losses.len() as u32,
            morale_delta: outcome.morale_delta,
            legitimacy_delta: outcome.legitimacy_delta,
            uncertainty_q16: view.map_or(0, |v| v.uncertainty_q16),
            is_exact: true,
        };
    }
    let morale_shift = (outcome.morale_delta + 100).clamp(0, 200) as u32;
    let legitimacy_shift = (outcome.legitimacy_delta + 100).clamp(0, 200) as u32;
    OutcomeSummary {
        casualty_count: bucket_u32(outcome.casualty_count(), 5),
        equipment_loss_count: bucket_u32(outcome.equipment_losses.len() as u32, 2),
        morale_delta: bucket_u32(morale_shift, 10) as i32 - 100,
        legitimacy_delta: bucket_u32(legitimacy_shift, 10) as i32 - 100,
        uncertainty_q16: view.map_or(0xFFFF, |v| v.uncertainty_q16),
        is_exact: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_table_matches_contract() {
        assert_eq!(objective_factor(Objective::Attack, Role::Attacker), 900);
        assert_eq!(objective_factor(Objective::Attack, Role::Defender), 1100);
        assert_eq!(objective_factor(Objective::Raid, Role::Attacker), 950);
        assert_eq!(objective_factor(Objective::Raid, Role::Defender), 1000);
        assert_eq!(objective_factor(Objective::Blockade, Role::Attacker), 1000);
        assert_eq!(objective_factor(Objective::Blockade, Role::Defender), 1000);
    }

    #[test]
    fn environment_factor_is_deterministic_and_bounded() {
        let engagement = Engagement {
            engagement_id: 1,
            domain_scope: DomainScope::Planetary,
            participants: Vec::new(),
            start_tick: 0,
            resolution_tick: 0,
            objective: Objective::Attack,
            env_modifiers: vec![5, 9],
            next_due_tick: TICK_NONE,
            provenance_ref: 0,
            supply_asset_id: 0,
            supply_qty: 0,
            status: EngagementStatus::Scheduled,
        };
        let a = environment_factor(&engagement);
        let b = environment_factor(&engagement);
        assert_eq!(a, b);
        assert!((900..=1100).contains(&a));
    }

    #[test]
    fn casualty_formula_clamps_to_cohort() {
        // Overwhelming opposition cannot kill more than the cohort.
        assert!(compute_casualties(8, 1, u64::MAX / 2000, Role::Attacker) <= 8);
        assert_eq!(compute_casualties(0, 10, 10, Role::Attacker), 0);
    }

    #[test]
    fn uncertain_views_bucket_estimates() {
        let outcome = EngagementOutcome {
            engagement_id: 1,
            casualty_event_ids: vec![1, 2, 3, 4, 5, 6, 7],
            equipment_losses: vec![
                EquipmentLoss {
                    equipment_id: 1,
                    qty: 1,
                },
                EquipmentLoss {
                    equipment_id: 2,
                    qty: 1,
                },
                EquipmentLoss {
                    equipment_id: 3,
                    qty: 1,
                },
            ],
            morale_delta: 50,
            legitimacy_delta: 10,
            ..EngagementOutcome::default()
        };
        let summary = outcome_estimate_from_view(None, &outcome);
        assert!(!summary.is_exact);
        assert_eq!(summary.casualty_count, 5);
        assert_eq!(summary.equipment_loss_count, 2);
        assert_eq!(summary.morale_delta, 50);
        assert_eq!(summary.uncertainty_q16, 0xFFFF);

        let exact_view = EpistemicView {
            state: EpistemicState::Known,
            ..EpistemicView::default()
        };
        let summary = outcome_estimate_from_view(Some(&exact_view), &outcome);
        assert!(summary.is_exact);
        assert_eq!(summary.casualty_count, 7);
    }
}
