#![allow(dead_code)]

use std::collections::HashSet;

use triple_helix::helix::{SchedulerState, ThreadContent, TrackNumber, UnitRegistry};

pub fn registry(sizes: [usize; 3]) -> UnitRegistry {
    let threads = ["thread-add", "thread-sub", "thread-mul"];
    let mut builder = UnitRegistry::builder();
    for ((track, thread), size) in TrackNumber::ALL.into_iter().zip(threads).zip(sizes) {
        let ids = (1..=size).map(|i| format!("t{}-u{i}", track.get())).collect();
        builder = builder.assign(track, ThreadContent::new(thread, ids));
    }
    builder.build().expect("fixture registry is valid")
}

/// Panics with a readable message if any track breaks a position invariant.
pub fn assert_invariants(state: &SchedulerState) {
    for track in state.tracks() {
        let at_zero = track.units().iter().filter(|u| u.position == 0).count();
        assert_eq!(at_zero, 1, "track {} has {at_zero} current units", track.number());

        let mut seen = HashSet::new();
        for unit in track.units() {
            assert!(
                seen.insert(unit.position),
                "track {} has two units at position {}",
                track.number(),
                unit.position
            );
        }
    }
}
