//! Format Bridge - position table <-> legacy flat list
//!
//! The legacy form stores each track as an ordered array plus a current-index
//! pointer. Two schema versions are accepted on load:
//! - v1 (no `schemaVersion`): unit records may omit skip number, distractor
//!   level and position; defaults are the progression minimum, L1 and the
//!   array index
//! - v2: skip number and distractor level are required
//!
//! Loading always assigns `position = index` in array order (after rotating
//! the array so the current index comes first). Recorded positions that
//! disagree with that order are repaired and reported, never dropped silently.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::helix::error::{HelixError, Result};
use crate::helix::position::Track;
use crate::helix::state::SchedulerState;
use crate::helix::types::{DistractorLevel, SkipProgression, TrackNumber, Unit, TRACK_COUNT};

pub const SCHEMA_VERSION: u32 = 2;
const LEGACY_SCHEMA_VERSION: u32 = 1;

// ==================== Persisted shape ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    pub active_track_number: u8,
    #[serde(default)]
    pub cycle_count: u64,
    pub tracks: Vec<LegacyTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTrack {
    pub track_number: u8,
    pub thread_id: String,
    #[serde(default)]
    pub current_index: usize,
    pub units: Vec<LegacyUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyUnit {
    pub unit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distractor_level: Option<DistractorLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

// ==================== Repair reporting ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairKind {
    DuplicatePositions,
    MissingPositions,
    OutOfOrderPositions,
    MissingCurrent,
}

impl RepairKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicatePositions => "duplicate-positions",
            Self::MissingPositions => "missing-positions",
            Self::OutOfOrderPositions => "out-of-order-positions",
            Self::MissingCurrent => "missing-current",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRepair {
    pub track_number: TrackNumber,
    pub kind: RepairKind,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub repairs: Vec<TrackRepair>,
    /// Tracks whose sparse positions were compacted to `0..len`.
    pub compacted: Vec<TrackNumber>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Restored {
    pub state: SchedulerState,
    pub report: RepairReport,
}

// ==================== Conversion ====================

pub struct FormatBridge;

impl FormatBridge {
    pub fn to_legacy(state: &SchedulerState) -> LegacyState {
        let tracks = state
            .tracks()
            .iter()
            .map(|track| LegacyTrack {
                track_number: track.number().get(),
                thread_id: track.thread_id().to_string(),
                current_index: 0,
                units: track
                    .ordered()
                    .into_iter()
                    .map(|u| LegacyUnit {
                        unit_id: u.id.clone(),
                        skip_number: Some(u.skip_number),
                        distractor_level: Some(u.distractor_level),
                        position: Some(u.position),
                    })
                    .collect(),
            })
            .collect();

        LegacyState {
            schema_version: Some(SCHEMA_VERSION),
            active_track_number: state.active_track().get(),
            cycle_count: state.cycle_count(),
            tracks,
        }
    }

    pub fn from_legacy(legacy: &LegacyState, progression: &SkipProgression) -> Result<Restored> {
        let version = legacy.schema_version.unwrap_or(LEGACY_SCHEMA_VERSION);
        if version != LEGACY_SCHEMA_VERSION && version != SCHEMA_VERSION {
            return Err(HelixError::malformed(format!(
                "unsupported schema version {version}"
            )));
        }

        let active = TrackNumber::new(legacy.active_track_number).map_err(|_| {
            HelixError::malformed(format!(
                "active track number {} out of range",
                legacy.active_track_number
            ))
        })?;

        if legacy.tracks.len() != TRACK_COUNT {
            return Err(HelixError::malformed(format!(
                "expected {TRACK_COUNT} tracks, found {}",
                legacy.tracks.len()
            )));
        }
        let mut slots: [Option<&LegacyTrack>; TRACK_COUNT] = [None; TRACK_COUNT];
        for raw in &legacy.tracks {
            let number = TrackNumber::new(raw.track_number).map_err(|_| {
                HelixError::malformed(format!("track number {} out of range", raw.track_number))
            })?;
            if slots[number.index()].replace(raw).is_some() {
                return Err(HelixError::malformed(format!("track {number} listed twice")));
            }
        }

        let mut report = RepairReport::default();
        let mut convert = |number: TrackNumber| -> Result<Track> {
            let raw = slots[number.index()]
                .ok_or_else(|| HelixError::malformed(format!("track {number} missing")))?;
            convert_track(raw, number, version, progression, &mut report)
        };
        let tracks = [
            convert(TrackNumber::ONE)?,
            convert(TrackNumber::TWO)?,
            convert(TrackNumber::THREE)?,
        ];

        let state = SchedulerState::new(active, legacy.cycle_count, tracks)
            .map_err(|e| HelixError::malformed(e.to_string()))?;

        for repair in &report.repairs {
            tracing::warn!(
                track = %repair.track_number,
                kind = repair.kind.as_str(),
                detail = %repair.detail,
                "repaired legacy positions"
            );
        }
        for track in &report.compacted {
            tracing::debug!(track = %track, "compacted sparse positions");
        }

        Ok(Restored { state, report })
    }
}

fn convert_track(
    raw: &LegacyTrack,
    number: TrackNumber,
    version: u32,
    progression: &SkipProgression,
    report: &mut RepairReport,
) -> Result<Track> {
    if raw.units.is_empty() {
        return Err(HelixError::malformed(format!("track {number} has no units")));
    }
    if raw.current_index >= raw.units.len() {
        return Err(HelixError::malformed(format!(
            "track {number} current index {} out of range ({} units)",
            raw.current_index,
            raw.units.len()
        )));
    }

    let ordered: Vec<&LegacyUnit> = raw.units[raw.current_index..]
        .iter()
        .chain(raw.units[..raw.current_index].iter())
        .collect();

    let mut ids = HashSet::with_capacity(ordered.len());
    let mut units = Vec::with_capacity(ordered.len());
    for (index, legacy) in ordered.iter().enumerate() {
        if !ids.insert(legacy.unit_id.as_str()) {
            return Err(HelixError::malformed(format!(
                "unit {} appears twice in track {number}",
                legacy.unit_id
            )));
        }

        let skip_number = match legacy.skip_number {
            Some(skip) if progression.contains(skip) => skip,
            Some(skip) => {
                return Err(HelixError::malformed(format!(
                    "unit {} has skip number {skip} outside the progression",
                    legacy.unit_id
                )))
            }
            None if version == LEGACY_SCHEMA_VERSION => progression.min(),
            None => {
                return Err(HelixError::malformed(format!(
                    "unit {} is missing skipNumber",
                    legacy.unit_id
                )))
            }
        };
        let distractor_level = match legacy.distractor_level {
            Some(level) => level,
            None if version == LEGACY_SCHEMA_VERSION => DistractorLevel::L1,
            None => {
                return Err(HelixError::malformed(format!(
                    "unit {} is missing distractorLevel",
                    legacy.unit_id
                )))
            }
        };

        units.push(Unit {
            id: legacy.unit_id.clone(),
            thread_id: raw.thread_id.clone(),
            position: index as u32,
            skip_number,
            distractor_level,
        });
    }

    let recorded: Vec<Option<u32>> = ordered.iter().map(|u| u.position).collect();
    inspect_positions(number, version, &recorded, report);

    Track::new(number, raw.thread_id.clone(), units, progression)
}

/// Compares recorded positions with array order and notes what had to change.
fn inspect_positions(
    number: TrackNumber,
    version: u32,
    recorded: &[Option<u32>],
    report: &mut RepairReport,
) {
    let missing = recorded.iter().filter(|p| p.is_none()).count();
    if missing == recorded.len() && version == LEGACY_SCHEMA_VERSION {
        return;
    }

    let found = if missing > 0 {
        Some((
            RepairKind::MissingPositions,
            format!("{missing} of {} units had no position", recorded.len()),
        ))
    } else {
        let positions: Vec<u32> = recorded.iter().flatten().copied().collect();
        let mut seen = HashSet::with_capacity(positions.len());
        let duplicates: Vec<u32> = positions
            .iter()
            .copied()
            .filter(|p| !seen.insert(*p))
            .collect();

        if !duplicates.is_empty() {
            Some((
                RepairKind::DuplicatePositions,
                format!("positions {duplicates:?} held by more than one unit"),
            ))
        } else if positions.windows(2).any(|w| w[0] > w[1]) {
            Some((
                RepairKind::OutOfOrderPositions,
                format!("recorded positions {positions:?} disagree with array order"),
            ))
        } else if positions[0] != 0 {
            Some((
                RepairKind::MissingCurrent,
                format!("lowest recorded position is {}", positions[0]),
            ))
        } else {
            if positions.iter().enumerate().any(|(i, &p)| p as usize != i) {
                report.compacted.push(number);
            }
            None
        }
    };

    if let Some((kind, detail)) = found {
        report.repairs.push(TrackRepair {
            track_number: number,
            kind,
            detail,
        });
    }
}
