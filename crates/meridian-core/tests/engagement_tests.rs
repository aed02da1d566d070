// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Engagement resolution scenarios: conservation, supply effects, refusals.

mod common;

use common::{base_request, casualty_config, SequentialDeaths, WarWorld, SUPPLY_ASSET};
use meridian_core::{
    engagement_resolve, war_mobilization_apply, CasualtySource, DomainScope, Engagement,
    EngagementError, EngagementOutcome, EngagementRefusal, EngagementStatus, ForceCasualtySource,
    Objective, Participant, ResolutionContext, Role, TICK_NONE,
};

struct Battle {
    world: WarWorld,
    attacker_force: u64,
    defender_force: u64,
    attacker_cohort: u64,
    defender_cohort: u64,
}

fn battle(attacker_supply: u32, defender_supply: u32) -> Battle {
    let mut world = WarWorld::new();
    world.seed_side(100, 10, attacker_supply);
    world.seed_side(101, 11, defender_supply);
    let attacker = war_mobilization_apply(&base_request(100, 10), &mut world.mobilization_ctx())
        .unwrap();
    let defender = war_mobilization_apply(&base_request(101, 11), &mut world.mobilization_ctx())
        .unwrap();
    Battle {
        world,
        attacker_force: attacker.force_id,
        defender_force: defender.force_id,
        attacker_cohort: 100,
        defender_cohort: 101,
    }
}

fn engagement(battle: &Battle) -> Engagement {
    Engagement {
        engagement_id: 900,
        domain_scope: DomainScope::Planetary,
        participants: vec![
            Participant {
                force_id: battle.attacker_force,
                legitimacy_id: 0,
                role: Role::Attacker,
                supply_store_ref: 10,
            },
            Participant {
                force_id: battle.defender_force,
                legitimacy_id: 0,
                role: Role::Defender,
                supply_store_ref: 11,
            },
        ],
        start_tick: 5,
        resolution_tick: 9,
        objective: Objective::Attack,
        env_modifiers: vec![3, 14],
        next_due_tick: TICK_NONE,
        provenance_ref: 0,
        supply_asset_id: SUPPLY_ASSET,
        supply_qty: 1,
        status: EngagementStatus::Scheduled,
    }
}

fn resolve(battle: &mut Battle, engagement: &Engagement) -> Result<EngagementOutcome, EngagementError> {
    let mut life = SequentialDeaths::new();
    let mut sources = vec![
        ForceCasualtySource {
            force_id: battle.attacker_force,
            source: CasualtySource::new((200..208).collect()),
        },
        ForceCasualtySource {
            force_id: battle.defender_force,
            source: CasualtySource::new((300..308).collect()),
        },
    ];
    let world = &mut battle.world;
    let mut ctx = ResolutionContext {
        forces: &mut world.forces,
        military: &mut world.military,
        readiness: &mut world.readiness,
        morale: &mut world.morale,
        legitimacy: Some(&mut world.legitimacy),
        stores: &mut world.stores,
        life: &mut life,
        casualty_sources: &mut sources,
        casualty_config: casualty_config(),
        outcomes: &mut world.outcomes,
    };
    engagement_resolve(engagement, &mut ctx)
}

#[test]
fn casualties_are_conserved_against_cohort_counts() {
    let mut battle = battle(5, 5);
    let before_atk = battle.world.military.get(battle.attacker_cohort).unwrap().count;
    let before_def = battle.world.military.get(battle.defender_cohort).unwrap().count;

    let eng = engagement(&battle);
    let outcome = resolve(&mut battle, &eng).unwrap();

    let after_atk = battle.world.military.get(battle.attacker_cohort).unwrap().count;
    let after_def = battle.world.military.get(battle.defender_cohort).unwrap().count;
    assert_eq!(
        (before_atk - after_atk) + (before_def - after_def),
        outcome.casualty_count()
    );
    assert!(outcome.casualty_count() > 0);
}

#[test]
fn attack_objective_favors_the_defender() {
    let mut battle = battle(5, 5);
    let eng = engagement(&battle);
    let outcome = resolve(&mut battle, &eng).unwrap();
    assert_eq!(outcome.winner_force_id, battle.defender_force);
    assert_eq!(outcome.loser_force_id, battle.attacker_force);

    // Winner +50 morale, loser -50, from the mobilized 700 baseline.
    let attacker_morale = battle
        .world
        .morale
        .get(battle.world.forces.get(battle.attacker_force).unwrap().morale_ref)
        .unwrap()
        .level;
    let defender_morale = battle
        .world
        .morale
        .get(battle.world.forces.get(battle.defender_force).unwrap().morale_ref)
        .unwrap()
        .level;
    assert_eq!(attacker_morale, 650);
    assert_eq!(defender_morale, 750);
}

#[test]
fn supply_shortage_worsens_losses() {
    let mut supplied = battle(10, 5);
    let eng = engagement(&supplied);
    resolve(&mut supplied, &eng).unwrap();
    let supplied_loss = 8 - supplied
        .world
        .military
        .get(supplied.attacker_cohort)
        .unwrap()
        .count;

    let mut depleted = battle(0, 5);
    let eng = engagement(&depleted);
    resolve(&mut depleted, &eng).unwrap();
    let depleted_loss = 8 - depleted
        .world
        .military
        .get(depleted.attacker_cohort)
        .unwrap()
        .count;

    assert!(
        depleted_loss >= supplied_loss,
        "depleted {depleted_loss} < supplied {supplied_loss}"
    );

    // Shortage also costs morale and readiness beyond the loser penalty.
    let depleted_force = depleted.world.forces.get(depleted.attacker_force).unwrap();
    let supplied_force = supplied.world.forces.get(supplied.attacker_force).unwrap();
    let depleted_readiness = depleted
        .world
        .readiness
        .get(depleted_force.readiness_ref)
        .unwrap()
        .level;
    let supplied_readiness = supplied
        .world
        .readiness
        .get(supplied_force.readiness_ref)
        .unwrap()
        .level;
    assert!(depleted_readiness < supplied_readiness);
}

#[test]
fn logistics_consumption_accumulates_per_participant() {
    let mut battle = battle(5, 5);
    let eng = engagement(&battle);
    let outcome = resolve(&mut battle, &eng).unwrap();
    // Both participants consumed one unit of the shared supply asset.
    assert_eq!(outcome.logistics_consumed, 2);
    assert_eq!(battle.world.stores.get_qty(10, SUPPLY_ASSET).unwrap(), 4);
    assert_eq!(battle.world.stores.get_qty(11, SUPPLY_ASSET).unwrap(), 4);
}

#[test]
fn resolved_engagements_refuse_re_resolution() {
    let mut battle = battle(5, 5);
    let mut eng = engagement(&battle);
    eng.status = EngagementStatus::Resolved;
    assert_eq!(
        resolve(&mut battle, &eng).unwrap_err(),
        EngagementError::Refused(EngagementRefusal::AlreadyResolved)
    );
}

#[test]
fn domain_mismatch_refuses_out_of_domain() {
    let mut battle = battle(5, 5);
    let mut eng = engagement(&battle);
    eng.domain_scope = DomainScope::Orbital;
    assert_eq!(
        resolve(&mut battle, &eng).unwrap_err(),
        EngagementError::Refused(EngagementRefusal::OutOfDomain)
    );
}

#[test]
fn blockade_with_symmetric_sides_is_a_draw() {
    let mut battle = battle(5, 5);
    let mut eng = engagement(&battle);
    eng.objective = Objective::Blockade;
    let outcome = resolve(&mut battle, &eng).unwrap();
    assert_eq!(outcome.winner_force_id, 0);
    assert_eq!(outcome.loser_force_id, 0);
    assert_eq!(outcome.morale_delta, 0);
}

#[test]
fn resolution_is_deterministic() {
    let run = || {
        let mut battle = battle(5, 5);
        let eng = engagement(&battle);
        let outcome = resolve(&mut battle, &eng).unwrap();
        (
            outcome.casualty_event_ids.clone(),
            outcome.provenance_summary,
            outcome.winner_force_id,
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn outcome_is_appended_to_the_list() {
    let mut battle = battle(5, 5);
    let eng = engagement(&battle);
    let outcome = resolve(&mut battle, &eng).unwrap();
    let stored = battle.world.outcomes.find(outcome.outcome_id).unwrap();
    assert_eq!(stored.engagement_id, 900);
    assert_eq!(stored.casualty_count(), outcome.casualty_count());
}
