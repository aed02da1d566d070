// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Mobilization refusal ladder, rollback, and conservation scenarios.

mod common;

use common::{base_request, WarWorld, EQUIPMENT_ASSET, SUPPLY_ASSET};
use meridian_core::{
    war_demobilization_apply, war_mobilization_apply, DemobilizationContext,
    DemobilizationRequest, EquipmentRequirement, ForceStatus, MobilizationError, WarRefusal,
    TICK_NONE,
};

#[test]
fn successful_mobilization_wires_the_full_force() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    let req = base_request(100, 10);
    let result = war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap();

    assert_ne!(result.force_id, 0);
    assert_eq!(result.military_cohort_id, 100);
    // Population drawn down, equipment consumed.
    assert_eq!(world.population.get(100).unwrap().count, 12);
    assert_eq!(world.stores.get_qty(10, EQUIPMENT_ASSET).unwrap(), 8);

    let force = world.forces.get(result.force_id).unwrap();
    assert_eq!(force.status, ForceStatus::Mobilizing);
    assert_eq!(force.equipment_total(), 2);
    assert_eq!(force.logistics_deps, vec![10]);
    assert_eq!(force.readiness_ref, result.readiness_id);
    assert_eq!(force.morale_ref, result.morale_id);
    assert_eq!(force.next_due_tick, TICK_NONE);

    assert_eq!(world.readiness.get(result.readiness_id).unwrap().level, 800);
    assert_eq!(world.morale.get(result.morale_id).unwrap().level, 700);
    assert_eq!(world.military.get(100).unwrap().count, 8);
    assert_eq!(
        world.military.get(100).unwrap().assigned_force_id,
        result.force_id
    );
}

#[test]
fn refusal_ladder_fires_in_order() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);

    let mut req = base_request(100, 10);
    req.population_count = 0;
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientPopulation)
    );

    let mut req = base_request(100, 10);
    req.logistics_deps.clear();
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientLogistics)
    );

    let mut req = base_request(100, 10);
    req.supply_qty = 0;
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientLogistics)
    );

    let mut req = base_request(100, 10);
    req.population_count = 50;
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientPopulation)
    );

    let mut req = base_request(100, 10);
    req.equipment = vec![EquipmentRequirement {
        asset_id: EQUIPMENT_ASSET,
        qty: 99,
    }];
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientEquipment)
    );

    // None of the refusals touched state.
    assert_eq!(world.population.get(100).unwrap().count, 20);
    assert_eq!(world.stores.get_qty(10, EQUIPMENT_ASSET).unwrap(), 10);
    assert!(world.forces.is_empty());
    assert!(world.military.is_empty());
}

#[test]
fn cohort_already_in_service_is_an_authority_refusal() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    war_mobilization_apply(&base_request(100, 10), &mut world.mobilization_ctx()).unwrap();

    assert_eq!(
        war_mobilization_apply(&base_request(100, 10), &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientAuthority)
    );
}

#[test]
fn legitimacy_below_minimum_refuses() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    world.legitimacy.register(40, 300).unwrap();

    let mut req = base_request(100, 10);
    req.legitimacy_id = 40;
    req.legitimacy_min = 500;
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientLegitimacy)
    );

    req.legitimacy_min = 200;
    war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap();
}

#[test]
fn enforcement_shortfall_refuses_authority() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    world
        .enforcement
        .register(meridian_core::EnforcementCapacity {
            capacity_id: 60,
            available_enforcers: 4,
        })
        .unwrap();

    let mut req = base_request(100, 10);
    req.enforcement_capacity_id = 60;
    assert_eq!(
        war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap_err(),
        MobilizationError::Refused(WarRefusal::InsufficientAuthority)
    );
}

#[test]
fn auto_assigned_force_ids_advance() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    world.seed_side(101, 11, 5);

    let first =
        war_mobilization_apply(&base_request(100, 10), &mut world.mobilization_ctx()).unwrap();
    let second =
        war_mobilization_apply(&base_request(101, 11), &mut world.mobilization_ctx()).unwrap();
    assert!(second.force_id > first.force_id);
}

#[test]
fn ramp_event_reaches_target_readiness() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    let mut req = base_request(100, 10);
    req.readiness_start = 400;
    req.readiness_target = 900;
    req.readiness_ramp_tick = 30;
    let result = war_mobilization_apply(&req, &mut world.mobilization_ctx()).unwrap();

    assert_eq!(world.readiness.get(result.readiness_id).unwrap().level, 400);
    assert_eq!(
        world.forces.get(result.force_id).unwrap().next_due_tick,
        30
    );
    world
        .readiness_sched
        .advance(&mut world.readiness, Some(&mut world.stores), 30)
        .unwrap();
    assert_eq!(world.readiness.get(result.readiness_id).unwrap().level, 900);
}

#[test]
fn mobilize_then_demobilize_conserves_population_and_stores() {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, 5);
    let population_before = world.population.get(100).unwrap().count;
    let equipment_before = world.stores.get_qty(10, EQUIPMENT_ASSET).unwrap();
    let supply_before = world.stores.get_qty(10, SUPPLY_ASSET).unwrap();

    let result =
        war_mobilization_apply(&base_request(100, 10), &mut world.mobilization_ctx()).unwrap();

    war_demobilization_apply(
        &DemobilizationRequest {
            force_id: result.force_id,
            equipment_store_ref: 10,
            population_cohort_id: 100,
            now_tick: 5,
        },
        &mut DemobilizationContext {
            forces: &mut world.forces,
            military: &mut world.military,
            population: &mut world.population,
            readiness: &mut world.readiness,
            morale: &mut world.morale,
            stores: &mut world.stores,
        },
    )
    .unwrap();

    assert_eq!(world.population.get(100).unwrap().count, population_before);
    assert_eq!(
        world.stores.get_qty(10, EQUIPMENT_ASSET).unwrap(),
        equipment_before
    );
    assert_eq!(world.stores.get_qty(10, SUPPLY_ASSET).unwrap(), supply_before);
    assert!(world.military.get(100).is_none());

    let force = world.forces.get(result.force_id).unwrap();
    assert_eq!(force.status, ForceStatus::Demobilized);
    assert!(force.equipment.is_empty());
    assert!(force.logistics_deps.is_empty());
    assert_eq!(force.next_due_tick, TICK_NONE);
    assert_eq!(world.readiness.get(result.readiness_id).unwrap().level, 0);
    assert_eq!(world.morale.get(result.morale_id).unwrap().level, 0);
}
