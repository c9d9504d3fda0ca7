use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::helix::error::{HelixError, Result};
use crate::helix::position::Track;
use crate::helix::registry::UnitRegistry;
use crate::helix::types::{
    DistractorLevel, SkipProgression, TrackNumber, TrackRef, Unit, TRACK_COUNT,
};

/// Per-learner scheduler state: three tracks plus the rotation cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    active_track: TrackNumber,
    cycle_count: u64,
    tracks: [Track; TRACK_COUNT],
}

impl SchedulerState {
    /// `tracks` must be numbered 1, 2, 3 in that order with distinct threads.
    pub fn new(
        active_track: TrackNumber,
        cycle_count: u64,
        tracks: [Track; TRACK_COUNT],
    ) -> Result<Self> {
        let mut threads = HashSet::new();
        for (expected, track) in TrackNumber::ALL.into_iter().zip(tracks.iter()) {
            if track.number() != expected {
                return Err(HelixError::InvariantViolation {
                    track: expected,
                    detail: format!("slot holds track {}", track.number()),
                });
            }
            if !threads.insert(track.thread_id()) {
                return Err(HelixError::InvariantViolation {
                    track: expected,
                    detail: format!("thread {} is assigned to more than one track", track.thread_id()),
                });
            }
        }
        Ok(Self {
            active_track,
            cycle_count,
            tracks,
        })
    }

    /// Canonical starting table: every unit at minimum skip and L1, the
    /// thread's first unit current, the rest queued in thread order.
    pub fn canonical(registry: &UnitRegistry, progression: &SkipProgression) -> Result<Self> {
        let build = |track: TrackNumber| -> Result<Track> {
            let content = registry.thread(track);
            let units = content
                .unit_ids
                .iter()
                .enumerate()
                .map(|(i, id)| Unit::fresh(id.clone(), content.thread_id.clone(), i as u32, progression))
                .collect();
            Track::new(track, content.thread_id.clone(), units, progression)
        };
        let tracks = [
            build(TrackNumber::ONE)?,
            build(TrackNumber::TWO)?,
            build(TrackNumber::THREE)?,
        ];
        Self::new(TrackNumber::ONE, 0, tracks)
    }

    pub fn active_track(&self) -> TrackNumber {
        self.active_track
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn tracks(&self) -> &[Track; TRACK_COUNT] {
        &self.tracks
    }

    pub fn track(&self, number: TrackNumber) -> &Track {
        &self.tracks[number.index()]
    }

    pub(crate) fn track_mut(&mut self, number: TrackNumber) -> &mut Track {
        &mut self.tracks[number.index()]
    }

    pub(crate) fn set_active(&mut self, track: TrackNumber, wrapped: bool) {
        self.active_track = track;
        if wrapped {
            self.cycle_count = self.cycle_count.saturating_add(1);
        }
    }

    /// Maps a track number or thread id onto the track it names.
    pub fn resolve(&self, track_ref: &TrackRef) -> Result<TrackNumber> {
        match track_ref {
            TrackRef::Number(n) => TrackNumber::new(*n),
            TrackRef::Thread(thread_id) => self
                .tracks
                .iter()
                .find(|t| t.thread_id() == thread_id)
                .map(Track::number)
                .ok_or_else(|| HelixError::UnknownThread(thread_id.clone())),
        }
    }

    pub fn validate(&self, progression: &SkipProgression) -> Result<()> {
        self.tracks.iter().try_for_each(|t| t.validate(progression))
    }

    pub fn progress(&self, progression: &SkipProgression) -> Vec<TrackProgress> {
        self.tracks
            .iter()
            .map(|t| TrackProgress::summarize(t, progression))
            .collect()
    }
}

/// Per-track mastery summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProgress {
    pub track_number: TrackNumber,
    pub thread_id: String,
    pub unit_count: usize,
    /// Units per skip number; every tier of the progression is listed.
    pub by_skip: BTreeMap<u32, usize>,
    pub by_distractor_level: BTreeMap<DistractorLevel, usize>,
    /// Units sitting at the progression ceiling.
    pub mastered: usize,
}

impl TrackProgress {
    fn summarize(track: &Track, progression: &SkipProgression) -> Self {
        let mut by_skip: BTreeMap<u32, usize> =
            progression.steps().iter().map(|&s| (s, 0)).collect();
        let mut by_distractor_level: BTreeMap<DistractorLevel, usize> =
            DistractorLevel::ALL.into_iter().map(|l| (l, 0)).collect();
        let mut mastered = 0;

        for unit in track.units() {
            *by_skip.entry(unit.skip_number).or_insert(0) += 1;
            *by_distractor_level.entry(unit.distractor_level).or_insert(0) += 1;
            if progression.is_ceiling(unit.skip_number) {
                mastered += 1;
            }
        }

        Self {
            track_number: track.number(),
            thread_id: track.thread_id().to_string(),
            unit_count: track.len(),
            by_skip,
            by_distractor_level,
            mastered,
        }
    }
}
