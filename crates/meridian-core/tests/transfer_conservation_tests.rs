// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Transfer conservation and batch-invariance scenarios.

use meridian_core::{
    Route, RouteGraph, StationDesc, StationRegistry, TransferEntry, TransferScheduler,
};
use proptest::prelude::*;

fn seeded_world(src_stock: i64) -> (RouteGraph, StationRegistry) {
    let mut stations = StationRegistry::with_capacity(8);
    for id in [1u64, 2] {
        stations
            .register(StationDesc {
                station_id: id,
                body_id: 10,
                frame_id: 1,
            })
            .unwrap();
    }
    stations.inventory_add(1, 700, src_stock).unwrap();
    let mut routes = RouteGraph::with_capacity(8);
    routes
        .register(Route {
            route_id: 1,
            src_station_id: 1,
            dst_station_id: 2,
            duration_ticks: 3,
            capacity_units: 50,
        })
        .unwrap();
    (routes, stations)
}

#[test]
fn scheduled_units_leave_source_and_arrive_once() {
    let (routes, mut stations) = seeded_world(30);
    let mut sched = TransferScheduler::new();

    sched
        .schedule(
            &routes,
            &mut stations,
            1,
            &[TransferEntry {
                resource_id: 700,
                quantity: 10,
            }],
            1,
        )
        .unwrap();
    assert_eq!(stations.inventory_get(1, 700).unwrap(), 20);
    assert_eq!(stations.inventory_get(2, 700).unwrap(), 0);

    sched.update(&routes, &mut stations, 4).unwrap();
    assert_eq!(stations.inventory_get(1, 700).unwrap(), 20);
    assert_eq!(stations.inventory_get(2, 700).unwrap(), 10);

    // Total units conserved.
    let total = stations.inventory_get(1, 700).unwrap() + stations.inventory_get(2, 700).unwrap();
    assert_eq!(total, 30);
}

#[test]
fn batched_update_equals_per_tick_updates() {
    let run = |batched: bool| {
        let (routes, mut stations) = seeded_world(40);
        let mut sched = TransferScheduler::new();
        for start in [0u64, 1, 2] {
            sched
                .schedule(
                    &routes,
                    &mut stations,
                    1,
                    &[TransferEntry {
                        resource_id: 700,
                        quantity: 5,
                    }],
                    start,
                )
                .unwrap();
        }
        if batched {
            sched.update(&routes, &mut stations, 10).unwrap();
        } else {
            for t in 1..=10 {
                sched.update(&routes, &mut stations, t).unwrap();
            }
        }
        (
            stations.inventory_get(1, 700).unwrap(),
            stations.inventory_get(2, 700).unwrap(),
        )
    };
    assert_eq!(run(true), run(false));
}

proptest! {
    #[test]
    fn update_partitioning_never_changes_outcome(
        quantities in prop::collection::vec(1i64..=10, 1..5),
        split in 1u64..10,
    ) {
        let total: i64 = quantities.iter().sum();
        let (routes, mut stations_a) = seeded_world(total);
        let (_, mut stations_b) = seeded_world(total);

        let mut sched_a = TransferScheduler::new();
        let mut sched_b = TransferScheduler::new();
        for (i, qty) in quantities.iter().enumerate() {
            let entries = [TransferEntry { resource_id: 700, quantity: *qty }];
            sched_a.schedule(&routes, &mut stations_a, 1, &entries, i as u64).unwrap();
            sched_b.schedule(&routes, &mut stations_b, 1, &entries, i as u64).unwrap();
        }

        // A: single jump to 12. B: split at an arbitrary midpoint.
        sched_a.update(&routes, &mut stations_a, 12).unwrap();
        sched_b.update(&routes, &mut stations_b, split.min(12)).unwrap();
        sched_b.update(&routes, &mut stations_b, 12).unwrap();

        prop_assert_eq!(
            stations_a.inventory_get(2, 700).unwrap(),
            stations_b.inventory_get(2, 700).unwrap()
        );
        prop_assert_eq!(
            stations_a.inventory_get(1, 700).unwrap(),
            stations_b.inventory_get(1, 700).unwrap()
        );
    }
}
