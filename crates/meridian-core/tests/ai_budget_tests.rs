// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! AI scheduler budget behavior: faction caps, op pools, reason codes.

use meridian_core::{
    AiReasonCode, AiScheduler, AiSchedulerConfig, AiTickContext, FactionDesc, FactionRegistry,
    MacroEconomy, MacroEvents, PolicyKind, RecordingCommandSink, Route, RouteGraph, ScopeKind,
    StationDesc, StationRegistry, POLICY_ALLOW_EVENTS, POLICY_ALLOW_ROUTE,
};

struct AiWorld {
    factions: FactionRegistry,
    economy: MacroEconomy,
    events: MacroEvents,
    stations: StationRegistry,
    routes: RouteGraph,
}

fn world(faction_ids: &[u64]) -> AiWorld {
    let mut factions = FactionRegistry::new();
    for id in faction_ids {
        factions
            .register(FactionDesc {
                faction_id: *id,
                home_scope_kind: ScopeKind::System,
                home_scope_id: 5,
                policy_kind: PolicyKind::Balanced,
                policy_flags: POLICY_ALLOW_ROUTE | POLICY_ALLOW_EVENTS,
                ai_seed: 1000 + id,
                known_nodes: vec![],
            })
            .unwrap();
    }
    let mut economy = MacroEconomy::new();
    economy.register(ScopeKind::System, 5).unwrap();
    // Resource 700 is in shortage: demand 9 against production 1.
    economy.rate_set(ScopeKind::System, 5, 700, 1, 9).unwrap();

    let mut stations = StationRegistry::with_capacity(8);
    for id in [1u64, 2, 3] {
        stations
            .register(StationDesc {
                station_id: id,
                body_id: 7,
                frame_id: 1,
            })
            .unwrap();
    }
    // Station 2 holds the shortage resource; station 1 does not.
    stations.inventory_add(2, 700, 100).unwrap();

    let mut routes = RouteGraph::with_capacity(8);
    // Route 1's source is empty; route 2's source can supply.
    routes
        .register(Route {
            route_id: 1,
            src_station_id: 1,
            dst_station_id: 3,
            duration_ticks: 2,
            capacity_units: 100,
        })
        .unwrap();
    routes
        .register(Route {
            route_id: 2,
            src_station_id: 2,
            dst_station_id: 3,
            duration_ticks: 2,
            capacity_units: 100,
        })
        .unwrap();

    AiWorld {
        factions,
        economy,
        events: MacroEvents::new(),
        stations,
        routes,
    }
}

fn run_tick(sched: &mut AiScheduler, w: &mut AiWorld, tick: u64) -> RecordingCommandSink {
    let mut sink = RecordingCommandSink::default();
    let mut ctx = AiTickContext {
        factions: &w.factions,
        economy: &w.economy,
        events: &mut w.events,
        stations: &w.stations,
        routes: &w.routes,
        sim_hash: 0x5150,
        commands: &mut sink,
        traces: None,
    };
    sched.tick(&mut ctx, tick).unwrap();
    sink
}

#[test]
fn faction_budget_caps_work_per_tick() {
    let mut w = world(&[1, 2]);
    let mut sched = AiScheduler::new(AiSchedulerConfig {
        max_factions_per_tick: 1,
        ..AiSchedulerConfig::default()
    });

    run_tick(&mut sched, &mut w, 0);
    let first = sched.get_state(1).unwrap();
    let second = sched.get_state(2).unwrap();
    assert_eq!(first.last_plan_id, 1);
    // Faction 2 was not reached: still due, no plan counted.
    assert_eq!(second.last_plan_id, 0);
    assert_eq!(second.next_decision_tick, 0);

    run_tick(&mut sched, &mut w, 1);
    assert_eq!(sched.get_state(1).unwrap().last_plan_id, 1);
    assert_eq!(sched.get_state(2).unwrap().last_plan_id, 1);
}

#[test]
fn op_exhaustion_mid_scan_reports_budget_hit() {
    let mut w = world(&[1]);
    // One op: the planner examines the empty-source route and runs dry
    // before reaching the route that could supply the shortage.
    let mut sched = AiScheduler::new(AiSchedulerConfig {
        max_ops_per_tick: 1,
        ..AiSchedulerConfig::default()
    });
    let sink = run_tick(&mut sched, &mut w, 0);
    assert!(sink.commands.is_empty());
    let state = sched.get_state(1).unwrap();
    assert_eq!(state.last_reason_code, AiReasonCode::BudgetHit);
    assert!(state.last_budget_hit);
}

#[test]
fn second_faction_starved_of_ops_budget_hits() {
    let mut w = world(&[1, 2]);
    let mut sched = AiScheduler::new(AiSchedulerConfig {
        max_ops_per_tick: 3,
        ..AiSchedulerConfig::default()
    });
    run_tick(&mut sched, &mut w, 0);
    // Faction 1 spent the pool (route scan + event op); faction 2 was
    // processed on the zero-budget path.
    let starved = sched.get_state(2).unwrap();
    assert_eq!(starved.last_reason_code, AiReasonCode::BudgetHit);
    assert!(starved.last_budget_hit);
    assert_eq!(starved.last_output_count, 0);
    assert_eq!(starved.last_plan_id, 1);
}

#[test]
fn actions_reason_when_plans_produce_output() {
    let mut w = world(&[1]);
    let mut sched = AiScheduler::default();
    let sink = run_tick(&mut sched, &mut w, 0);
    assert_eq!(sink.commands.len(), 1);
    assert_eq!(w.events.len(), 1);
    let state = sched.get_state(1).unwrap();
    assert_eq!(state.last_reason_code, AiReasonCode::Actions);
    assert_eq!(state.last_output_count, 2);
}

#[test]
fn no_shortage_means_no_reason() {
    let mut w = world(&[1]);
    // Erase the shortage: demand below production.
    w.economy.rate_set(ScopeKind::System, 5, 700, 9, 1).unwrap();
    let mut sched = AiScheduler::default();
    let sink = run_tick(&mut sched, &mut w, 0);
    assert!(sink.commands.is_empty());
    assert_eq!(
        sched.get_state(1).unwrap().last_reason_code,
        AiReasonCode::None
    );
}

#[test]
fn stale_faction_state_is_reconciled_away() {
    let mut w = world(&[1, 2]);
    let mut sched = AiScheduler::default();
    run_tick(&mut sched, &mut w, 0);
    assert_eq!(sched.states().len(), 2);

    // Rebuild the world with only faction 2 present.
    let mut reduced = world(&[2]);
    run_tick(&mut sched, &mut reduced, 60);
    assert_eq!(sched.states().len(), 1);
    assert_eq!(sched.states()[0].faction_id, 2);
}
