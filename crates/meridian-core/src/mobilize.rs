// SPDX-License-Identifier: Apache-2.0
//! Mobilization and demobilization pipelines.
//!
//! `war_mobilization_apply` validates a request against every collaborating
//! registry before touching state, refusing with the first matching
//! business code. Mid-sequence failures after atomic state changes roll
//! back exactly the prior-step deltas that were recorded, in reverse
//! order, and surface as generic errors.

use thiserror::Error;

use crate::cohort::{MilitaryCohort, MilitaryCohortRegistry, MilitaryRole};
use crate::force::{
    DomainScope, ForceId, ForceStatus, SecurityForceRegistry, FORCE_MAX_EQUIPMENT,
    FORCE_MAX_LOGISTICS,
};
use crate::governance::{EnforcementRegistry, LegitimacyRegistry};
use crate::morale::{MoraleModifiers, MoraleRegistry, MoraleScheduler};
use crate::population::PopulationRegistry;
use crate::readiness::{ReadinessRegistry, ReadinessScheduler};
use crate::stores::{AssetId, StoreId, StoreRegistry};
use crate::tick::{tick_min_due, Tick, TICK_NONE};

/// Business reason a war-pipeline transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarRefusal {
    /// Population pool missing, empty, or too small.
    InsufficientPopulation,
    /// Equipment list invalid or store cannot cover it.
    InsufficientEquipment,
    /// Logistics dependencies or supply fields invalid.
    InsufficientLogistics,
    /// Force/cohort conflicts or enforcement shortfall.
    InsufficientAuthority,
    /// Legitimacy reading below the requested minimum.
    InsufficientLegitimacy,
}

/// Errors surfaced by the mobilization pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MobilizationError {
    /// Malformed request outside the refusal taxonomy.
    #[error("invalid argument")]
    InvalidArgument,
    /// Business refusal; no state was changed.
    #[error("mobilization refused: {0:?}")]
    Refused(WarRefusal),
    /// A collaborating registry is at capacity.
    #[error("registry capacity exhausted")]
    Capacity,
    /// Id conflict or registration failure after validation; recorded
    /// prior-step deltas were rolled back.
    #[error("mobilization conflict")]
    Conflict,
}

/// One equipment requirement line of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentRequirement {
    /// Asset drawn from the equipment store, nonzero.
    pub asset_id: AssetId,
    /// Quantity required, nonzero.
    pub qty: u32,
}

/// A mobilization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobilizationRequest {
    /// Explicit force id, or zero to auto-assign.
    pub force_id: ForceId,
    /// Owning organization or jurisdiction.
    pub owner: u64,
    /// Domain the force will operate in.
    pub domain_scope: DomainScope,
    /// Population cohort supplying personnel.
    pub population_cohort_id: u64,
    /// Personnel drawn from the cohort, nonzero.
    pub population_count: u32,
    /// Store equipment is drawn from.
    pub equipment_store_ref: StoreId,
    /// Equipment requirements, at most [`FORCE_MAX_EQUIPMENT`].
    pub equipment: Vec<EquipmentRequirement>,
    /// Logistics dependency store refs, `1..=`[`FORCE_MAX_LOGISTICS`].
    pub logistics_deps: Vec<StoreId>,
    /// Explicit readiness id, or zero to reuse the force id.
    pub readiness_id: u64,
    /// Starting readiness level.
    pub readiness_start: u32,
    /// Target readiness level reached by the ramp event.
    pub readiness_target: u32,
    /// Readiness degradation rate.
    pub readiness_degradation_rate: u32,
    /// Readiness recovery rate.
    pub readiness_recovery_rate: u32,
    /// Tick the readiness ramp fires, [`TICK_NONE`] for none.
    pub readiness_ramp_tick: Tick,
    /// Explicit morale id, or zero to reuse the force id.
    pub morale_id: u64,
    /// Starting morale level.
    pub morale_start: u32,
    /// Morale delta applied when legitimacy is below its minimum.
    pub morale_legitimacy_delta: i32,
    /// Legitimacy state consulted, or zero for none.
    pub legitimacy_id: u64,
    /// Minimum acceptable legitimacy value.
    pub legitimacy_min: u32,
    /// Enforcement capacity backing the mobilization, or zero for none.
    pub enforcement_capacity_id: u64,
    /// Provenance reference recorded on the force and cohort.
    pub provenance_ref: u64,
    /// Current tick.
    pub now_tick: Tick,
    /// Tick of the recurring supply check, [`TICK_NONE`] for none.
    pub supply_check_tick: Tick,
    /// Asset consumed by the supply check, nonzero.
    pub supply_asset_id: AssetId,
    /// Quantity consumed by the supply check, nonzero.
    pub supply_qty: u32,
}

/// Ids produced by a successful mobilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MobilizationResult {
    /// Registered force.
    pub force_id: ForceId,
    /// Military cohort (same id as the population cohort).
    pub military_cohort_id: u64,
    /// Readiness state backing the force.
    pub readiness_id: u64,
    /// Morale state backing the force.
    pub morale_id: u64,
}

/// Mutable borrows of every registry the pipeline touches.
pub struct MobilizationContext<'a> {
    /// Force registry.
    pub forces: &'a mut SecurityForceRegistry,
    /// Military cohort registry.
    pub military: &'a mut MilitaryCohortRegistry,
    /// Population pools.
    pub population: &'a mut PopulationRegistry,
    /// Readiness states.
    pub readiness: &'a mut ReadinessRegistry,
    /// Readiness event scheduler.
    pub readiness_sched: &'a mut ReadinessScheduler,
    /// Morale states.
    pub morale: &'a mut MoraleRegistry,
    /// Morale event scheduler.
    pub morale_sched: &'a mut MoraleScheduler,
    /// Equipment/supply stores.
    pub stores: &'a mut StoreRegistry,
    /// Legitimacy readings, when governance is modeled.
    pub legitimacy: Option<&'a LegitimacyRegistry>,
    /// Enforcement capacities, when governance is modeled.
    pub enforcement: Option<&'a EnforcementRegistry>,
}

fn check_equipment_available(
    req: &MobilizationRequest,
    stores: &StoreRegistry,
) -> Result<(), MobilizationError> {
    for line in &req.equipment {
        if line.asset_id == 0 || line.qty == 0 {
            return Err(MobilizationError::Refused(WarRefusal::InsufficientEquipment));
        }
        let have = stores
            .get_qty(req.equipment_store_ref, line.asset_id)
            .map_err(|_| MobilizationError::Refused(WarRefusal::InsufficientEquipment))?;
        if have < line.qty {
            return Err(MobilizationError::Refused(WarRefusal::InsufficientEquipment));
        }
    }
    Ok(())
}

fn consume_equipment(
    req: &MobilizationRequest,
    stores: &mut StoreRegistry,
) -> Result<usize, usize> {
    for (idx, line) in req.equipment.iter().enumerate() {
        if stores
            .consume(req.equipment_store_ref, line.asset_id, line.qty)
            .is_err()
        {
            return Err(idx);
        }
    }
    Ok(req.equipment.len())
}

fn refund_equipment(req: &MobilizationRequest, stores: &mut StoreRegistry, consumed: usize) {
    // Reverse order: undo exactly the recorded prefix.
    for line in req.equipment[..consumed].iter().rev() {
        let _ = stores.add(req.equipment_store_ref, line.asset_id, line.qty);
    }
}

/// Atomically mobilizes a security force, or refuses with the first
/// matching business code.
pub fn war_mobilization_apply(
    req: &MobilizationRequest,
    ctx: &mut MobilizationContext<'_>,
) -> Result<MobilizationResult, MobilizationError> {
    if req.population_count == 0 || req.population_cohort_id == 0 {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientPopulation));
    }
    if req.equipment.len() > FORCE_MAX_EQUIPMENT {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientEquipment));
    }
    if req.logistics_deps.is_empty()
        || req.logistics_deps.len() > FORCE_MAX_LOGISTICS
        || req.supply_asset_id == 0
        || req.supply_qty == 0
    {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientLogistics));
    }
    if req.force_id != 0 && ctx.forces.get(req.force_id).is_some() {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientAuthority));
    }
    if ctx.military.get(req.population_cohort_id).is_some() {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientAuthority));
    }
    if ctx.forces.is_full()
        || ctx.military.len() >= ctx.military.capacity()
        || ctx.readiness.is_full()
        || ctx.morale.is_full()
    {
        return Err(MobilizationError::Capacity);
    }
    let population = ctx
        .population
        .get(req.population_cohort_id)
        .copied()
        .ok_or(MobilizationError::Refused(WarRefusal::InsufficientPopulation))?;
    if population.count < req.population_count {
        return Err(MobilizationError::Refused(WarRefusal::InsufficientPopulation));
    }
    check_equipment_available(req, ctx.stores)?;
    if req.enforcement_capacity_id != 0 {
        let capacity = ctx
            .enforcement
            .and_then(|reg| reg.get(req.enforcement_capacity_id));
        match capacity {
            Some(cap) if cap.available_enforcers >= req.population_count => {}
            _ => {
                return Err(MobilizationError::Refused(WarRefusal::InsufficientAuthority));
            }
        }
    }
    if req.legitimacy_id != 0 {
        let reading = ctx.legitimacy.and_then(|reg| reg.get(req.legitimacy_id));
        match reading {
            Some(state) if state.value >= req.legitimacy_min => {}
            _ => {
                return Err(MobilizationError::Refused(WarRefusal::InsufficientLegitimacy));
            }
        }
    }

    let force_id = if req.force_id != 0 {
        req.force_id
    } else {
        ctx.forces.claim_force_id()
    };
    let readiness_id = if req.readiness_id != 0 { req.readiness_id } else { force_id };
    let morale_id = if req.morale_id != 0 { req.morale_id } else { force_id };
    if ctx.readiness.get(readiness_id).is_some() || ctx.morale.get(morale_id).is_some() {
        return Err(MobilizationError::Conflict);
    }

    ctx.forces
        .register(
            force_id,
            req.owner,
            req.domain_scope,
            req.population_cohort_id,
            req.provenance_ref,
        )
        .map_err(|_| MobilizationError::Conflict)?;

    let consumed = match consume_equipment(req, ctx.stores) {
        Ok(n) => n,
        Err(partial) => {
            refund_equipment(req, ctx.stores, partial);
            return Err(MobilizationError::Refused(WarRefusal::InsufficientEquipment));
        }
    };

    if ctx
        .population
        .adjust_count(req.population_cohort_id, -(req.population_count as i32))
        .is_err()
    {
        refund_equipment(req, ctx.stores, consumed);
        return Err(MobilizationError::Refused(WarRefusal::InsufficientPopulation));
    }

    if ctx
        .military
        .register(MilitaryCohort {
            cohort_id: req.population_cohort_id,
            assigned_force_id: force_id,
            count: req.population_count,
            role: MilitaryRole::Infantry,
            casualty_tracking_ref: req.provenance_ref,
        })
        .is_err()
    {
        let _ = ctx
            .population
            .adjust_count(req.population_cohort_id, req.population_count as i32);
        refund_equipment(req, ctx.stores, consumed);
        return Err(MobilizationError::Conflict);
    }

    ctx.readiness
        .register(
            readiness_id,
            req.readiness_start,
            req.readiness_degradation_rate,
            req.readiness_recovery_rate,
        )
        .map_err(|_| MobilizationError::Conflict)?;
    if let Some(state) = ctx.readiness.get_mut(readiness_id) {
        state.last_update_tick = req.now_tick;
    }

    ctx.morale
        .register(morale_id, req.morale_start, MoraleModifiers::default())
        .map_err(|_| MobilizationError::Conflict)?;

    let ramp_delta = req.readiness_target as i32 - req.readiness_start as i32;
    if ramp_delta != 0 && req.readiness_ramp_tick != TICK_NONE {
        let _ = ctx.readiness_sched.schedule_event(
            ctx.readiness,
            readiness_id,
            ramp_delta,
            req.readiness_ramp_tick,
        );
    }
    if req.supply_check_tick != TICK_NONE {
        let _ = ctx.readiness_sched.schedule_supply_check(
            ctx.readiness,
            readiness_id,
            req.supply_check_tick,
            req.logistics_deps[0],
            req.supply_asset_id,
            req.supply_qty,
            -(req.readiness_degradation_rate as i32),
        );
    }
    if req.legitimacy_id != 0 && req.morale_legitimacy_delta != 0 {
        let _ = ctx.morale_sched.schedule_legitimacy_check(
            ctx.morale,
            morale_id,
            req.now_tick,
            req.legitimacy_id,
            req.legitimacy_min,
            req.morale_legitimacy_delta,
        );
    }

    for line in &req.equipment {
        let _ = ctx.forces.add_equipment(force_id, line.asset_id, line.qty);
    }
    for dep in &req.logistics_deps {
        let _ = ctx.forces.add_logistics_dependency(force_id, *dep);
    }
    let _ = ctx.forces.set_states(force_id, readiness_id, morale_id);
    let _ = ctx.forces.set_status(force_id, ForceStatus::Mobilizing);

    let mut next_due = TICK_NONE;
    if let Some(state) = ctx.readiness.get(readiness_id) {
        next_due = tick_min_due(next_due, state.next_due_tick);
    }
    if let Some(state) = ctx.morale.get(morale_id) {
        next_due = tick_min_due(next_due, state.next_due_tick);
    }
    if let Some(force) = ctx.forces.get_mut(force_id) {
        force.next_due_tick = next_due;
    }

    Ok(MobilizationResult {
        force_id,
        military_cohort_id: req.population_cohort_id,
        readiness_id,
        morale_id,
    })
}

/// Errors surfaced by the demobilization pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DemobilizationError {
    /// Zero ids in the request.
    #[error("invalid argument")]
    InvalidArgument,
    /// Unknown force, cohort, or store.
    #[error("not found")]
    NotFound,
}

/// A demobilization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemobilizationRequest {
    /// Force being stood down.
    pub force_id: ForceId,
    /// Store receiving the force's equipment.
    pub equipment_store_ref: StoreId,
    /// Population cohort receiving personnel back.
    pub population_cohort_id: u64,
    /// Current tick.
    pub now_tick: Tick,
}

/// Mutable borrows of every registry demobilization touches.
pub struct DemobilizationContext<'a> {
    /// Force registry.
    pub forces: &'a mut SecurityForceRegistry,
    /// Military cohort registry.
    pub military: &'a mut MilitaryCohortRegistry,
    /// Population pools.
    pub population: &'a mut PopulationRegistry,
    /// Readiness states.
    pub readiness: &'a mut ReadinessRegistry,
    /// Morale states.
    pub morale: &'a mut MoraleRegistry,
    /// Equipment/supply stores.
    pub stores: &'a mut StoreRegistry,
}

/// Stands a force down: returns personnel to the population pool, deposits
/// equipment back to the store, releases the military cohort, zeroes the
/// backing states, and marks the force demobilized.
pub fn war_demobilization_apply(
    req: &DemobilizationRequest,
    ctx: &mut DemobilizationContext<'_>,
) -> Result<(), DemobilizationError> {
    if req.force_id == 0 || req.equipment_store_ref == 0 || req.population_cohort_id == 0 {
        return Err(DemobilizationError::InvalidArgument);
    }
    let force = ctx
        .forces
        .get(req.force_id)
        .cloned()
        .ok_or(DemobilizationError::NotFound)?;
    let cohort = ctx
        .military
        .get(force.cohort_ref)
        .copied()
        .ok_or(DemobilizationError::NotFound)?;

    if cohort.count > 0 {
        ctx.population
            .adjust_count(req.population_cohort_id, cohort.count as i32)
            .map_err(|_| DemobilizationError::NotFound)?;
    }
    for line in &force.equipment {
        let _ = ctx
            .stores
            .add(req.equipment_store_ref, line.asset_id, line.qty);
    }
    let _ = ctx.military.release(force.cohort_ref);

    if let Some(state) = ctx.readiness.get_mut(force.readiness_ref) {
        state.level = 0;
        state.last_update_tick = req.now_tick;
        state.next_due_tick = TICK_NONE;
    }
    if let Some(state) = ctx.morale.get_mut(force.morale_ref) {
        state.level = 0;
        state.next_due_tick = TICK_NONE;
    }

    if let Some(force) = ctx.forces.get_mut(req.force_id) {
        force.equipment.clear();
        force.logistics_deps.clear();
        force.next_due_tick = TICK_NONE;
        force.status = ForceStatus::Demobilized;
    }
    Ok(())
}
