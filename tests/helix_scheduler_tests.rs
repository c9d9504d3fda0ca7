mod common;

use triple_helix::helix::{
    CompletionEvent, DistractorLevel, FormatBridge, HelixConfig, HelixError, LegacyState,
    LegacyTrack, LegacyUnit, PlacementRule, RepairKind, ScoreOutcome, Scheduler, SkipProgression,
    TrackNumber, TrackRef,
};

use common::{assert_invariants, registry};

fn legacy_unit(id: &str, position: u32, skip: u32) -> LegacyUnit {
    LegacyUnit {
        unit_id: id.to_string(),
        skip_number: Some(skip),
        distractor_level: Some(DistractorLevel::L1),
        position: Some(position),
    }
}

fn plain_track(number: u8, thread: &str, ids: &[&str]) -> LegacyTrack {
    LegacyTrack {
        track_number: number,
        thread_id: thread.to_string(),
        current_index: 0,
        units: ids
            .iter()
            .map(|id| LegacyUnit {
                unit_id: id.to_string(),
                skip_number: None,
                distractor_level: None,
                position: None,
            })
            .collect(),
    }
}

/// Track 1 holds u1..u6 at positions 0..5 with u1 current at skip 3.
fn skip_three_state() -> LegacyState {
    let units = ["u1", "u2", "u3", "u4", "u5", "u6"]
        .iter()
        .enumerate()
        .map(|(i, id)| legacy_unit(id, i as u32, if i == 0 { 3 } else { 1 }))
        .collect();
    LegacyState {
        schema_version: Some(2),
        active_track_number: 1,
        cycle_count: 0,
        tracks: vec![
            LegacyTrack {
                track_number: 1,
                thread_id: "t1".into(),
                current_index: 0,
                units,
            },
            dense_track(2, "t2", &["v1", "v2"]),
            dense_track(3, "t3", &["w1", "w2"]),
        ],
    }
}

fn dense_track(number: u8, thread: &str, ids: &[&str]) -> LegacyTrack {
    LegacyTrack {
        track_number: number,
        thread_id: thread.to_string(),
        current_index: 0,
        units: ids
            .iter()
            .enumerate()
            .map(|(i, id)| legacy_unit(id, i as u32, 1))
            .collect(),
    }
}

// ==================== Repositioning scenarios ====================

#[test]
fn test_perfect_score_at_skip_three() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.load(&skip_three_state()).unwrap().state;

    let decision = scheduler
        .complete_turn(&mut state, &CompletionEvent::new(TrackNumber::ONE, "u1", 10, 10))
        .unwrap();

    let track = state.track(TrackNumber::ONE);
    assert_eq!(track.unit("u2").unwrap().position, 0);
    assert_eq!(track.unit("u3").unwrap().position, 1);
    assert_eq!(track.unit("u4").unwrap().position, 2);
    assert_eq!(track.unit("u5").unwrap().position, 4);
    assert_eq!(track.unit("u6").unwrap().position, 5);

    let moved = track.unit("u1").unwrap();
    assert_eq!(moved.position, 3);
    assert_eq!(moved.skip_number, 5);
    assert_eq!(moved.distractor_level, DistractorLevel::L2);

    assert_eq!(decision.repositioned.previous_skip_number, 3);
    assert_eq!(decision.repositioned.new_current, "u2");
    assert_eq!(decision.next_track_number, TrackNumber::TWO);
    assert_eq!(decision.next_unit_id, "v1");
    assert_invariants(&state);
}

#[test]
fn test_post_advance_placement_lands_on_new_skip() {
    let scheduler = Scheduler::new(HelixConfig {
        placement_rule: PlacementRule::PostAdvance,
        ..HelixConfig::default()
    });
    let mut state = scheduler.load(&skip_three_state()).unwrap().state;

    let decision = scheduler
        .complete_turn(&mut state, &CompletionEvent::new(TrackNumber::ONE, "u1", 1, 1))
        .unwrap();

    assert_eq!(decision.repositioned.landed_at, 5);
    let track = state.track(TrackNumber::ONE);
    assert_eq!(track.unit("u6").unwrap().position, 4);
    assert_eq!(track.unit("u1").unwrap().position, 5);
    assert_invariants(&state);
}

#[test]
fn test_imperfect_score_resets_without_moving() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.load(&skip_three_state()).unwrap().state;
    let before = state.track(TrackNumber::ONE).positions();

    let decision = scheduler
        .complete_turn(&mut state, &CompletionEvent::new(TrackNumber::ONE, "u1", 7, 10))
        .unwrap();

    assert_eq!(decision.repositioned.outcome, ScoreOutcome::Imperfect);
    let after = state.track(TrackNumber::ONE);
    let u1 = after.unit("u1").unwrap();
    assert_eq!(u1.skip_number, 1);
    assert_eq!(u1.distractor_level, DistractorLevel::L1);
    assert_eq!(u1.position, 0);

    let moved: Vec<_> = before
        .iter()
        .zip(after.positions())
        .filter(|(b, a)| b.unit_id != a.unit_id || b.position != a.position)
        .collect();
    assert!(moved.is_empty());
}

#[test]
fn test_mastered_unit_stays_at_ceiling() {
    let progression = SkipProgression::default();
    let scheduler = Scheduler::default();
    let mut legacy = skip_three_state();
    legacy.tracks[0].units[0].skip_number = Some(progression.max());
    legacy.tracks[0].units[0].distractor_level = Some(DistractorLevel::L3);
    let mut state = scheduler.load(&legacy).unwrap().state;

    let decision = scheduler
        .complete_turn(&mut state, &CompletionEvent::new(TrackNumber::ONE, "u1", 1, 1))
        .unwrap();

    assert_eq!(decision.repositioned.skip_number, 100);
    assert_eq!(decision.repositioned.distractor_level, DistractorLevel::L3);
    // Only six units: the target lies past the end and the unit lands there.
    assert_eq!(decision.repositioned.landed_at, 100);
    assert_eq!(state.track(TrackNumber::ONE).get_current().unwrap().id, "u2");
    assert_invariants(&state);
}

// ==================== Rotation ====================

#[test]
fn test_no_track_repeats_back_to_back() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([4, 3, 5])).unwrap();
    let mut previous = state.active_track();

    for turn in 0..30 {
        let presenting = scheduler.present(&state).unwrap();
        let correct = if turn % 4 == 0 { 2 } else { 3 };
        let event = CompletionEvent::new(presenting.track_number, presenting.unit_id, correct, 3);

        let decision = scheduler.complete_turn(&mut state, &event).unwrap();
        assert_ne!(decision.next_track_number, previous);
        previous = decision.next_track_number;
        assert_invariants(&state);
    }

    assert_eq!(state.cycle_count(), 10);
}

#[test]
fn test_cycle_count_increments_on_wrap_only() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([2, 2, 2])).unwrap();
    let mut cycles = Vec::new();
    for _ in 0..6 {
        let presenting = scheduler.present(&state).unwrap();
        let event = CompletionEvent::new(presenting.track_number, presenting.unit_id, 1, 1);
        cycles.push(scheduler.complete_turn(&mut state, &event).unwrap().cycle_count);
    }
    assert_eq!(cycles, vec![0, 0, 1, 1, 1, 2]);
}

#[test]
fn test_pinned_turns_stay_on_one_track() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([3, 1, 1])).unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let presenting = scheduler.present(&state).unwrap();
        seen.push(presenting.unit_id.clone());
        let event = CompletionEvent::new(TrackNumber::ONE, presenting.unit_id, 1, 1);
        let decision = scheduler
            .complete_pinned(&mut state, &event, TrackNumber::ONE)
            .unwrap();
        assert_eq!(decision.next_track_number, TrackNumber::ONE);
        assert_eq!(decision.cycle_count, 0);
    }
    // u1 waits at slot 1 after its first pass, so it returns before u3.
    assert_eq!(seen, vec!["t1-u1", "t1-u2", "t1-u1"]);
}

#[test]
fn test_completion_for_inactive_track_is_rejected() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([3, 3, 3])).unwrap();
    let before = state.clone();

    let by_number = CompletionEvent::new(TrackNumber::TWO, "t2-u1", 1, 1);
    let by_thread = CompletionEvent::new(TrackRef::Thread("thread-mul".into()), "t3-u1", 1, 1);
    for event in [&by_number, &by_thread] {
        let err = scheduler.complete_turn(&mut state, event).unwrap_err();
        assert!(
            matches!(err, HelixError::NotActiveTrack { active: TrackNumber::ONE, .. }),
            "unexpected {err}"
        );
    }
    assert_eq!(state, before);

    // Answering the active track moves on, and the answered track is not shown next.
    let decision = scheduler
        .complete_turn(&mut state, &CompletionEvent::new(TrackNumber::ONE, "t1-u1", 1, 1))
        .unwrap();
    assert_ne!(decision.next_track_number, decision.repositioned.track_number);
}

// ==================== Errors ====================

#[test]
fn test_rejected_events_change_nothing() {
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([3, 3, 3])).unwrap();
    let before = state.clone();

    let cases = [
        CompletionEvent::new(TrackNumber::ONE, "t1-u2", 1, 1),
        CompletionEvent::new(TrackNumber::ONE, "nope", 1, 1),
        CompletionEvent::new(TrackNumber::ONE, "t1-u1", 0, 0),
        CompletionEvent::new(TrackRef::Number(0), "t1-u1", 1, 1),
        CompletionEvent::new(TrackRef::Thread("thread-div".into()), "t1-u1", 1, 1),
        CompletionEvent::new(TrackNumber::THREE, "t3-u1", 1, 1),
    ];
    for event in &cases {
        let err = scheduler.complete_turn(&mut state, event).unwrap_err();
        assert!(!err.requires_reset(), "{err} should not demand a reset");
    }

    assert!(matches!(
        scheduler.complete_turn(&mut state, &cases[4]),
        Err(HelixError::UnknownThread(_))
    ));
    assert_eq!(state, before);
}

// ==================== Legacy bridge ====================

#[test]
fn test_legacy_list_maps_to_positions_and_back() {
    let scheduler = Scheduler::default();
    let legacy = LegacyState {
        schema_version: None,
        active_track_number: 2,
        cycle_count: 4,
        tracks: vec![
            plain_track(1, "t1", &["u1", "u2", "u3"]),
            plain_track(2, "t2", &["v1"]),
            plain_track(3, "t3", &["w1", "w2"]),
        ],
    };

    let restored = scheduler.load(&legacy).unwrap();
    assert!(restored.report.is_clean());
    let state = restored.state;
    let positions: Vec<_> = state
        .track(TrackNumber::ONE)
        .positions()
        .into_iter()
        .map(|p| (p.unit_id, p.position))
        .collect();
    assert_eq!(
        positions,
        vec![
            ("u1".to_string(), 0),
            ("u2".to_string(), 1),
            ("u3".to_string(), 2)
        ]
    );
    assert_eq!(state.active_track(), TrackNumber::TWO);
    assert_eq!(state.cycle_count(), 4);

    let saved = scheduler.save(&state);
    let order: Vec<&str> = saved.tracks[0].units.iter().map(|u| u.unit_id.as_str()).collect();
    assert_eq!(order, vec!["u1", "u2", "u3"]);
    assert_eq!(scheduler.load(&saved).unwrap().state, state);
}

#[test]
fn test_conflicting_legacy_positions_are_repaired() {
    let scheduler = Scheduler::default();
    let mut legacy = skip_three_state();
    legacy.tracks[0].units[2].position = Some(1);

    let restored = scheduler.load(&legacy).unwrap();
    assert!(restored
        .report
        .repairs
        .iter()
        .any(|r| r.track_number == TrackNumber::ONE && r.kind == RepairKind::DuplicatePositions));
    assert_invariants(&restored.state);
}

#[test]
fn test_malformed_legacy_state_is_rejected() {
    let progression = SkipProgression::default();
    let mut two_tracks = skip_three_state();
    two_tracks.tracks.pop();
    assert!(matches!(
        FormatBridge::from_legacy(&two_tracks, &progression),
        Err(HelixError::MalformedLegacyInput(_))
    ));

    let mut future = skip_three_state();
    future.schema_version = Some(9);
    assert!(matches!(
        FormatBridge::from_legacy(&future, &progression),
        Err(HelixError::MalformedLegacyInput(_))
    ));
}

#[test]
fn test_state_json_survives_a_replay_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learner.json");
    let scheduler = Scheduler::default();
    let mut state = scheduler.initial_state(&registry([3, 3, 3])).unwrap();

    for _ in 0..5 {
        let presenting = scheduler.present(&state).unwrap();
        let event = CompletionEvent::new(presenting.track_number, presenting.unit_id, 5, 5);
        scheduler.complete_turn(&mut state, &event).unwrap();
    }
    triple_helix::store::save_state(&scheduler, &path, &state).unwrap();

    let restored = triple_helix::store::load_state(&scheduler, &path).unwrap();
    assert_eq!(
        scheduler.present(&restored.state).unwrap(),
        scheduler.present(&state).unwrap()
    );
    for number in TrackNumber::ALL {
        let ids = |s: &triple_helix::SchedulerState| -> Vec<String> {
            s.track(number).ordered().iter().map(|u| u.id.clone()).collect()
        };
        assert_eq!(ids(&restored.state), ids(&state));
    }
}
