// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Capability visibility and snapshot-ordering scenarios.

use meridian_core::{
    epistemic_query, CapabilityEntry, CapabilityKind, CapabilitySnapshot, EpistemicState,
    EXPIRES_NEVER,
};
use proptest::prelude::*;

fn time_readout(observed: u64, latency: u32, uncertainty: u32) -> CapabilityEntry {
    CapabilityEntry {
        capability_id: CapabilityKind::TimeReadout as u32,
        subject_kind: 0,
        subject_id: 0,
        state: EpistemicState::Known,
        uncertainty_q16: uncertainty,
        latency_ticks: latency,
        observed_tick: observed,
        expires_tick: EXPIRES_NEVER,
        source_mask: 0,
    }
}

#[test]
fn capability_visibility_follows_the_snapshot() {
    let mut snap = CapabilitySnapshot::with_capacity(8);
    assert!(snap.add(time_readout(10, 0, 0)));
    snap.finalize();

    let view = epistemic_query(&snap, CapabilityKind::TimeReadout as u32, 0, 0, 10);
    assert_eq!(view.state, EpistemicState::Known);
    assert!(!view.is_stale);
    assert!(!view.is_uncertain);

    // Clearing the snapshot makes the capability invisible.
    snap.clear();
    let view = epistemic_query(&snap, CapabilityKind::TimeReadout as u32, 0, 0, 11);
    assert_eq!(view.state, EpistemicState::Unknown);
    assert_eq!(view.observed_tick, 0);
}

#[test]
fn latency_marks_old_observations_stale() {
    let mut snap = CapabilitySnapshot::with_capacity(8);
    assert!(snap.add(time_readout(10, 5, 4096)));
    snap.finalize();

    let view = epistemic_query(&snap, CapabilityKind::TimeReadout as u32, 0, 0, 20);
    assert_eq!(view.state, EpistemicState::Known);
    assert!(view.is_stale);
    assert!(view.is_uncertain);
    assert_eq!(view.observed_tick, 10);
    assert_eq!(view.latency_ticks, 5);
}

#[test]
fn finalized_snapshots_are_strictly_ordered() {
    let mut snap = CapabilitySnapshot::with_capacity(16);
    for (cap, kind, subject) in [(5u32, 1u32, 9u64), (1, 2, 3), (5, 0, 1), (1, 2, 2), (3, 7, 0)] {
        let mut entry = time_readout(0, 0, 0);
        entry.capability_id = cap;
        entry.subject_kind = kind;
        entry.subject_id = subject;
        assert!(snap.add(entry));
    }
    snap.finalize();
    for window in snap.entries().windows(2) {
        let a = (
            window[0].capability_id,
            window[0].subject_kind,
            window[0].subject_id,
        );
        let b = (
            window[1].capability_id,
            window[1].subject_kind,
            window[1].subject_id,
        );
        assert!(a < b, "snapshot not strictly ordered: {a:?} !< {b:?}");
    }
}

proptest! {
    #[test]
    fn snapshot_ordering_is_permutation_invariant(
        mut triples in prop::collection::vec((1u32..50, 0u32..4, 0u64..50), 1..20),
        seed in 0u64..1000,
    ) {
        // Dedup triples so tie-breaking by insertion order cannot differ.
        triples.sort_unstable();
        triples.dedup();

        let build = |order: &[(u32, u32, u64)]| {
            let mut snap = CapabilitySnapshot::with_capacity(64);
            for (cap, kind, subject) in order {
                let mut entry = time_readout(0, 0, 0);
                entry.capability_id = *cap;
                entry.subject_kind = *kind;
                entry.subject_id = *subject;
                assert!(snap.add(entry));
            }
            snap.finalize();
            snap.entries().to_vec()
        };

        let sorted = build(&triples);

        // A deterministic shuffle driven by the seed.
        let mut shuffled = triples.clone();
        let mut state = seed.wrapping_add(1);
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }
        let from_shuffled = build(&shuffled);

        prop_assert_eq!(sorted, from_shuffled);
    }
}
