// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Production tick-invariance scenarios.

use meridian_core::{ProductionEngine, ProductionRule, StationDesc, StationRegistry};
use proptest::prelude::*;

fn world() -> StationRegistry {
    let mut stations = StationRegistry::with_capacity(4);
    stations
        .register(StationDesc {
            station_id: 1,
            body_id: 10,
            frame_id: 1,
        })
        .unwrap();
    stations
}

fn engine(delta: i64, period: u64) -> ProductionEngine {
    let mut engine = ProductionEngine::new();
    engine
        .register(ProductionRule {
            rule_id: 1,
            station_id: 1,
            resource_id: 900,
            delta_per_period: delta,
            period_ticks: period,
        })
        .unwrap();
    engine
}

#[test]
fn twelve_ticks_of_plus_five_every_four_yields_fifteen() {
    let mut stations = world();
    let mut prod = engine(5, 4);
    for t in 1..=12 {
        prod.update(&mut stations, t).unwrap();
    }
    assert_eq!(stations.inventory_get(1, 900).unwrap(), 15);

    let mut stations = world();
    let mut prod = engine(5, 4);
    prod.update(&mut stations, 12).unwrap();
    assert_eq!(stations.inventory_get(1, 900).unwrap(), 15);
}

proptest! {
    #[test]
    fn any_partition_applies_the_same_total(
        period in 1u64..=7,
        delta in 1i64..=9,
        cuts in prop::collection::vec(1u64..50, 0..6),
    ) {
        let end = 50u64;
        let mut sorted_cuts = cuts;
        sorted_cuts.sort_unstable();
        sorted_cuts.push(end);

        let mut stations_a = world();
        let mut prod_a = engine(delta, period);
        prod_a.update(&mut stations_a, end).unwrap();

        let mut stations_b = world();
        let mut prod_b = engine(delta, period);
        for cut in sorted_cuts {
            prod_b.update(&mut stations_b, cut).unwrap();
        }

        prop_assert_eq!(
            stations_a.inventory_get(1, 900).unwrap(),
            stations_b.inventory_get(1, 900).unwrap()
        );
        // And the closed form holds.
        prop_assert_eq!(
            stations_a.inventory_get(1, 900).unwrap(),
            ((end / period) as i64) * delta
        );
    }
}
