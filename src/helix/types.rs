use std::fmt;

use serde::{Deserialize, Serialize};

use crate::helix::error::{HelixError, Result};

pub type UnitId = String;

/// Default skip progression, smallest first.
pub const DEFAULT_SKIP_PROGRESSION: [u32; 6] = [1, 3, 5, 10, 25, 100];

pub const TRACK_COUNT: usize = 3;

// ==================== Track numbers ====================

/// One of the three parallel tracks, numbered 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TrackNumber(u8);

impl TrackNumber {
    pub const ONE: TrackNumber = TrackNumber(1);
    pub const TWO: TrackNumber = TrackNumber(2);
    pub const THREE: TrackNumber = TrackNumber(3);
    pub const ALL: [TrackNumber; TRACK_COUNT] = [Self::ONE, Self::TWO, Self::THREE];

    pub fn new(number: u8) -> Result<Self> {
        if (1..=TRACK_COUNT as u8).contains(&number) {
            Ok(TrackNumber(number))
        } else {
            Err(HelixError::InvalidTrack(number))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot in the state's track array.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Round-robin successor; the flag is set when 3 wraps back to 1.
    pub fn next(self) -> (TrackNumber, bool) {
        if self.0 as usize == TRACK_COUNT {
            (Self::ONE, true)
        } else {
            (TrackNumber(self.0 + 1), false)
        }
    }
}

impl TryFrom<u8> for TrackNumber {
    type Error = HelixError;

    fn try_from(value: u8) -> Result<Self> {
        TrackNumber::new(value)
    }
}

impl From<TrackNumber> for u8 {
    fn from(track: TrackNumber) -> Self {
        track.0
    }
}

impl fmt::Display for TrackNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an event names the track it acted on: by number or by assigned thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackRef {
    Number(u8),
    Thread(String),
}

impl From<TrackNumber> for TrackRef {
    fn from(track: TrackNumber) -> Self {
        TrackRef::Number(track.get())
    }
}

// ==================== Distractor levels ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDistractorLevel")]
pub enum DistractorLevel {
    #[default]
    L1,
    L2,
    L3,
}

impl DistractorLevel {
    pub const ALL: [DistractorLevel; 3] = [Self::L1, Self::L2, Self::L3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "L1" | "1" => Some(Self::L1),
            "L2" | "2" => Some(Self::L2),
            "L3" | "3" => Some(Self::L3),
            _ => None,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::L1),
            2 => Some(Self::L2),
            3 => Some(Self::L3),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::L1 => 1,
            Self::L2 => 2,
            Self::L3 => 3,
        }
    }

    pub fn escalate(&self) -> Self {
        match self {
            Self::L1 => Self::L2,
            _ => Self::L3,
        }
    }
}

/// Older records store the level as an integer rank, newer ones by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDistractorLevel {
    Rank(u8),
    Name(String),
}

impl TryFrom<RawDistractorLevel> for DistractorLevel {
    type Error = String;

    fn try_from(raw: RawDistractorLevel) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawDistractorLevel::Rank(rank) => Self::from_rank(rank)
                .ok_or_else(|| format!("distractor level rank {rank} out of range")),
            RawDistractorLevel::Name(name) => {
                Self::parse(&name).ok_or_else(|| format!("unknown distractor level {name:?}"))
            }
        }
    }
}

// ==================== Skip progression ====================

/// Strictly ascending, non-empty list of allowed skip numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct SkipProgression(Vec<u32>);

impl SkipProgression {
    pub fn new(steps: Vec<u32>) -> Result<Self> {
        if steps.is_empty() {
            return Err(HelixError::InvalidConfig(
                "skip progression must not be empty".to_string(),
            ));
        }
        if steps[0] == 0 {
            return Err(HelixError::InvalidConfig(
                "skip numbers must be positive".to_string(),
            ));
        }
        if steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HelixError::InvalidConfig(format!(
                "skip progression must be strictly ascending: {steps:?}"
            )));
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> &[u32] {
        &self.0
    }

    pub fn min(&self) -> u32 {
        self.0[0]
    }

    pub fn max(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    pub fn contains(&self, skip: u32) -> bool {
        self.0.binary_search(&skip).is_ok()
    }

    /// Index of `skip` in the progression.
    pub fn tier(&self, skip: u32) -> Option<usize> {
        self.0.binary_search(&skip).ok()
    }

    /// Next value after `skip`, staying at the ceiling once reached.
    pub fn advance(&self, skip: u32) -> u32 {
        self.0
            .iter()
            .copied()
            .find(|&step| step > skip)
            .unwrap_or_else(|| self.max())
    }

    pub fn is_ceiling(&self, skip: u32) -> bool {
        skip == self.max()
    }
}

impl Default for SkipProgression {
    fn default() -> Self {
        Self(DEFAULT_SKIP_PROGRESSION.to_vec())
    }
}

impl TryFrom<Vec<u32>> for SkipProgression {
    type Error = HelixError;

    fn try_from(steps: Vec<u32>) -> Result<Self> {
        SkipProgression::new(steps)
    }
}

impl From<SkipProgression> for Vec<u32> {
    fn from(progression: SkipProgression) -> Self {
        progression.0
    }
}

// ==================== Units ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub thread_id: String,
    pub position: u32,
    pub skip_number: u32,
    pub distractor_level: DistractorLevel,
}

impl Unit {
    /// A unit in its reset state: minimum skip, easiest distractors.
    pub fn fresh(
        id: impl Into<UnitId>,
        thread_id: impl Into<String>,
        position: u32,
        progression: &SkipProgression,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            position,
            skip_number: progression.min(),
            distractor_level: DistractorLevel::L1,
        }
    }
}

/// Flat view of one unit's slot, as handed back to callers after a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPosition {
    pub unit_id: UnitId,
    pub position: u32,
    pub skip_number: u32,
    pub distractor_level: DistractorLevel,
}

impl From<&Unit> for UnitPosition {
    fn from(unit: &Unit) -> Self {
        Self {
            unit_id: unit.id.clone(),
            position: unit.position,
            skip_number: unit.skip_number,
            distractor_level: unit.distractor_level,
        }
    }
}

// ==================== Scores ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOutcome {
    Perfect,
    Imperfect,
}

impl ScoreOutcome {
    pub fn from_counts(correct: u32, total: u32) -> Result<Self> {
        if total == 0 || correct > total {
            return Err(HelixError::InvalidScore { correct, total });
        }
        Ok(if correct == total {
            Self::Perfect
        } else {
            Self::Imperfect
        })
    }

    pub fn is_perfect(&self) -> bool {
        matches!(self, Self::Perfect)
    }
}
