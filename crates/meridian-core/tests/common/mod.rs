// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
//! Shared war-pipeline test harness.

use meridian_core::{
    CasualtyRequest, DomainScope, EnforcementRegistry, EngagementOutcomeList, EngagementRegistry,
    EquipmentRequirement, LegitimacyRegistry, LifeDeathHandler, MilitaryCohortRegistry,
    MobilizationContext, MobilizationRequest, MoraleRegistry, MoraleScheduler, PopulationCohort,
    PopulationRegistry, ReadinessRegistry, ReadinessScheduler, SecurityForceRegistry,
    StoreRegistry, TICK_NONE,
};

/// Equipment asset used by harness mobilizations.
pub const EQUIPMENT_ASSET: u64 = 5;
/// Supply asset consumed by engagements and supply checks.
pub const SUPPLY_ASSET: u64 = 77;

/// Every registry the war pipelines touch, kernel-style ownership.
pub struct WarWorld {
    pub forces: SecurityForceRegistry,
    pub military: MilitaryCohortRegistry,
    pub population: PopulationRegistry,
    pub readiness: ReadinessRegistry,
    pub readiness_sched: ReadinessScheduler,
    pub morale: MoraleRegistry,
    pub morale_sched: MoraleScheduler,
    pub stores: StoreRegistry,
    pub legitimacy: LegitimacyRegistry,
    pub enforcement: EnforcementRegistry,
    pub engagements: EngagementRegistry,
    pub outcomes: EngagementOutcomeList,
}

impl WarWorld {
    pub fn new() -> Self {
        Self {
            forces: SecurityForceRegistry::with_capacity(64, 1),
            military: MilitaryCohortRegistry::with_capacity(64),
            population: PopulationRegistry::with_capacity(64),
            readiness: ReadinessRegistry::with_capacity(64),
            readiness_sched: ReadinessScheduler::new(64, 0, 1),
            morale: MoraleRegistry::with_capacity(64),
            morale_sched: MoraleScheduler::new(64, 0, 1),
            stores: StoreRegistry::with_capacity(64),
            legitimacy: LegitimacyRegistry::with_capacity(64),
            enforcement: EnforcementRegistry::with_capacity(64),
            engagements: EngagementRegistry::with_capacity(64, 1),
            outcomes: EngagementOutcomeList::with_capacity(64, 1),
        }
    }

    /// Seeds a population cohort and a store holding equipment + supply.
    pub fn seed_side(&mut self, cohort_id: u64, store_id: u64, supply_units: u32) {
        self.population
            .register(PopulationCohort {
                cohort_id,
                count: 20,
            })
            .unwrap();
        self.stores.register(store_id).unwrap();
        self.stores.add(store_id, EQUIPMENT_ASSET, 10).unwrap();
        if supply_units > 0 {
            self.stores.add(store_id, SUPPLY_ASSET, supply_units).unwrap();
        }
    }

    pub fn mobilization_ctx(&mut self) -> MobilizationContext<'_> {
        MobilizationContext {
            forces: &mut self.forces,
            military: &mut self.military,
            population: &mut self.population,
            readiness: &mut self.readiness,
            readiness_sched: &mut self.readiness_sched,
            morale: &mut self.morale,
            morale_sched: &mut self.morale_sched,
            stores: &mut self.stores,
            legitimacy: Some(&self.legitimacy),
            enforcement: Some(&self.enforcement),
        }
    }
}

/// A baseline request: 8 personnel, 2 equipment, one logistics dependency.
pub fn base_request(cohort_id: u64, store_id: u64) -> MobilizationRequest {
    MobilizationRequest {
        force_id: 0,
        owner: 1,
        domain_scope: DomainScope::Planetary,
        population_cohort_id: cohort_id,
        population_count: 8,
        equipment_store_ref: store_id,
        equipment: vec![EquipmentRequirement {
            asset_id: EQUIPMENT_ASSET,
            qty: 2,
        }],
        logistics_deps: vec![store_id],
        readiness_id: 0,
        readiness_start: 800,
        readiness_target: 800,
        readiness_degradation_rate: 50,
        readiness_recovery_rate: 20,
        readiness_ramp_tick: TICK_NONE,
        morale_id: 0,
        morale_start: 700,
        morale_legitimacy_delta: 0,
        legitimacy_id: 0,
        legitimacy_min: 0,
        enforcement_capacity_id: 0,
        provenance_ref: 9000,
        now_tick: 1,
        supply_check_tick: TICK_NONE,
        supply_asset_id: SUPPLY_ASSET,
        supply_qty: 1,
    }
}

/// Life pipeline stub assigning sequential death event ids.
pub struct SequentialDeaths {
    pub next_event_id: u64,
    pub requests: Vec<(u64, CasualtyRequest)>,
}

impl SequentialDeaths {
    pub fn new() -> Self {
        Self {
            next_event_id: 5000,
            requests: Vec::new(),
        }
    }
}

impl LifeDeathHandler for SequentialDeaths {
    fn process_death(&mut self, body_id: u64, request: &CasualtyRequest) -> Result<u64, u32> {
        self.requests.push((body_id, *request));
        let id = self.next_event_id;
        self.next_event_id += 1;
        Ok(id)
    }
}

/// Casualty request template used by resolution tests.
pub fn casualty_config() -> CasualtyRequest {
    CasualtyRequest {
        cause_code: 0,
        act_time: 0,
        location_ref: 0,
        provenance_ref: 0,
        policy_id: 1,
        remains_account_id: 0,
        jurisdiction_id: 3,
        has_contract: false,
        allow_finder: false,
        jurisdiction_allows: true,
        estate_locked: false,
        collapse_remains: false,
    }
}
