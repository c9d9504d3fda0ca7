//! Position Table - per-track unit positions
//!
//! Invariants (checked by [`Track::validate`]):
//! - no two units share a position
//! - exactly one unit sits at position 0 (the current unit)
//! - every skip number belongs to the configured progression
//!
//! Positions may be sparse: after a few perfect answers a track can hold
//! units at 0, 1, 4, 9 and nothing in between.

use std::collections::HashSet;

use serde::Serialize;

use crate::helix::error::{HelixError, Result};
use crate::helix::types::{SkipProgression, TrackNumber, Unit, UnitPosition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    number: TrackNumber,
    thread_id: String,
    units: Vec<Unit>,
}

impl Track {
    /// Builds a track and checks every invariant against `progression`.
    pub fn new(
        number: TrackNumber,
        thread_id: impl Into<String>,
        units: Vec<Unit>,
        progression: &SkipProgression,
    ) -> Result<Self> {
        let mut track = Self {
            number,
            thread_id: thread_id.into(),
            units,
        };
        track.sort_by_position();
        track.validate(progression)?;
        Ok(track)
    }

    /// Builds a track without any invariant checks.
    #[cfg(test)]
    pub(crate) fn unchecked(number: TrackNumber, thread_id: &str, units: Vec<Unit>) -> Self {
        Self {
            number,
            thread_id: thread_id.to_string(),
            units,
        }
    }

    pub fn number(&self) -> TrackNumber {
        self.number
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn occupant(&self, position: u32) -> Option<&Unit> {
        self.units.iter().find(|u| u.position == position)
    }

    /// The unit at position 0.
    pub fn get_current(&self) -> Result<&Unit> {
        let mut at_zero = self.units.iter().filter(|u| u.position == 0);
        match (at_zero.next(), at_zero.next()) {
            (Some(unit), None) => Ok(unit),
            (None, _) => Err(self.violation("no unit at position 0")),
            (Some(first), Some(second)) => Err(self.violation(format!(
                "units {} and {} both at position 0",
                first.id, second.id
            ))),
        }
    }

    /// Units sorted by position, current unit first.
    pub fn ordered(&self) -> Vec<&Unit> {
        let mut ordered: Vec<&Unit> = self.units.iter().collect();
        ordered.sort_by_key(|u| u.position);
        ordered
    }

    /// The next `count` units in presentation order, current unit included.
    pub fn upcoming(&self, count: usize) -> Vec<&Unit> {
        let mut ordered = self.ordered();
        ordered.truncate(count);
        ordered
    }

    pub fn positions(&self) -> Vec<UnitPosition> {
        self.ordered().into_iter().map(UnitPosition::from).collect()
    }

    pub fn max_position(&self) -> u32 {
        self.units.iter().map(|u| u.position).max().unwrap_or(0)
    }

    /// True when positions are exactly `0..len`.
    pub fn is_dense(&self) -> bool {
        self.ordered()
            .iter()
            .enumerate()
            .all(|(i, u)| u.position as usize == i)
    }

    /// Moves `unit_id` to `position`. Fails if another unit already holds it.
    pub(crate) fn set_position(&mut self, unit_id: &str, position: u32) -> Result<()> {
        if let Some(holder) = self.units.iter().find(|u| u.position == position) {
            if holder.id != unit_id {
                return Err(HelixError::PositionConflict {
                    track: self.number,
                    position,
                    unit_id: holder.id.clone(),
                });
            }
        }
        let number = self.number;
        let unit = self
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| HelixError::UnknownUnit {
                track: number,
                unit_id: unit_id.to_string(),
            })?;
        unit.position = position;
        Ok(())
    }

    /// Units are kept in position order so equal tables compare equal.
    pub(crate) fn sort_by_position(&mut self) {
        self.units.sort_by_key(|u| u.position);
    }

    pub(crate) fn unit_mut(&mut self, unit_id: &str) -> Result<&mut Unit> {
        let number = self.number;
        self.units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| HelixError::UnknownUnit {
                track: number,
                unit_id: unit_id.to_string(),
            })
    }

    /// Rejects duplicated positions, reporting the first clash found.
    pub fn check_unique_positions(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.units.len());
        for unit in self.ordered() {
            if !seen.insert(unit.position) {
                return Err(HelixError::PositionConflict {
                    track: self.number,
                    position: unit.position,
                    unit_id: unit.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn validate(&self, progression: &SkipProgression) -> Result<()> {
        if self.units.is_empty() {
            return Err(self.violation("track has no units"));
        }

        let mut ids = HashSet::with_capacity(self.units.len());
        for unit in &self.units {
            if !ids.insert(unit.id.as_str()) {
                return Err(self.violation(format!("unit {} appears twice", unit.id)));
            }
            if !progression.contains(unit.skip_number) {
                return Err(self.violation(format!(
                    "unit {} has skip number {} outside the progression",
                    unit.id, unit.skip_number
                )));
            }
        }

        self.check_unique_positions()?;
        self.get_current()?;
        Ok(())
    }

    fn violation(&self, detail: impl Into<String>) -> HelixError {
        HelixError::InvariantViolation {
            track: self.number,
            detail: detail.into(),
        }
    }
}
