//! Repositioning Engine - moves the answered unit after a completion
//!
//! Perfect answer:
//! - skip number advances one step in the progression (capped)
//! - distractor level escalates in lockstep (capped at L3)
//! - every unit at 1..=target shifts down one slot and the answered unit
//!   lands on `target`, so the unit that waited at position 1 becomes current
//!
//! Imperfect answer:
//! - skip number and distractor level reset to their minimum
//! - the unit either stays current or requeues at position 1
//!
//! All work happens on a copy of the track; the caller's track is only
//! replaced once the result validates.

use serde::Serialize;

use crate::helix::config::{HelixConfig, ImperfectPolicy, PlacementRule};
use crate::helix::error::{HelixError, Result};
use crate::helix::position::Track;
use crate::helix::types::{DistractorLevel, ScoreOutcome, SkipProgression, TrackNumber, UnitId};

/// What one completion did to a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repositioned {
    pub track_number: TrackNumber,
    pub unit_id: UnitId,
    pub outcome: ScoreOutcome,
    pub previous_skip_number: u32,
    pub skip_number: u32,
    pub distractor_level: DistractorLevel,
    pub landed_at: u32,
    pub new_current: UnitId,
}

#[derive(Debug, Clone)]
pub struct RepositioningEngine {
    progression: SkipProgression,
    imperfect_policy: ImperfectPolicy,
    placement_rule: PlacementRule,
    escalate_distractors: bool,
}

impl RepositioningEngine {
    pub fn new(config: &HelixConfig) -> Self {
        Self {
            progression: config.skip_progression.clone(),
            imperfect_policy: config.imperfect_policy,
            placement_rule: config.placement_rule,
            escalate_distractors: config.escalate_distractors,
        }
    }

    /// Applies a completion of `unit_id` to `track`. On error `track` is untouched.
    pub fn apply(
        &self,
        track: &mut Track,
        unit_id: &str,
        outcome: ScoreOutcome,
    ) -> Result<Repositioned> {
        // Conflicting positions must be repaired before the shift runs.
        track.check_unique_positions()?;

        let current = track.get_current()?;
        if current.id != unit_id {
            return Err(HelixError::NotCurrentUnit {
                track: track.number(),
                unit_id: unit_id.to_string(),
                current: current.id.clone(),
            });
        }
        let previous_skip = current.skip_number;
        if !self.progression.contains(previous_skip) {
            return Err(HelixError::InvariantViolation {
                track: track.number(),
                detail: format!("unit {unit_id} has skip number {previous_skip} outside the progression"),
            });
        }

        let mut next = track.clone();
        let landed_at = match outcome {
            ScoreOutcome::Perfect => self.apply_perfect(&mut next, unit_id, previous_skip)?,
            ScoreOutcome::Imperfect => self.apply_imperfect(&mut next, unit_id)?,
        };
        next.sort_by_position();
        next.validate(&self.progression)?;

        let moved = next.unit(unit_id).ok_or_else(|| HelixError::UnknownUnit {
            track: next.number(),
            unit_id: unit_id.to_string(),
        })?;
        let result = Repositioned {
            track_number: next.number(),
            unit_id: unit_id.to_string(),
            outcome,
            previous_skip_number: previous_skip,
            skip_number: moved.skip_number,
            distractor_level: moved.distractor_level,
            landed_at,
            new_current: next.get_current()?.id.clone(),
        };

        tracing::debug!(
            track = %result.track_number,
            unit = %result.unit_id,
            outcome = ?outcome,
            skip = result.skip_number,
            landed_at,
            new_current = %result.new_current,
            "unit repositioned"
        );

        *track = next;
        Ok(result)
    }

    fn apply_perfect(&self, track: &mut Track, unit_id: &str, previous_skip: u32) -> Result<u32> {
        let advanced = self.progression.advance(previous_skip);
        {
            let unit = track.unit_mut(unit_id)?;
            unit.skip_number = advanced;
            if self.escalate_distractors {
                unit.distractor_level = unit.distractor_level.escalate();
            }
        }

        let target = match self.placement_rule {
            PlacementRule::PreAdvance => previous_skip,
            PlacementRule::PostAdvance => advanced,
        };
        shift_into(track, unit_id, target)
    }

    fn apply_imperfect(&self, track: &mut Track, unit_id: &str) -> Result<u32> {
        {
            let unit = track.unit_mut(unit_id)?;
            unit.skip_number = self.progression.min();
            unit.distractor_level = DistractorLevel::L1;
        }

        match self.imperfect_policy {
            ImperfectPolicy::StayCurrent => Ok(0),
            ImperfectPolicy::RequeueNext => shift_into(track, unit_id, 1),
        }
    }
}

/// Moves the current unit to `target`, shifting every unit at 1..=target
/// down one slot. Returns the slot the unit finally occupies.
fn shift_into(track: &mut Track, unit_id: &str, target: u32) -> Result<u32> {
    // Park the answered unit past the end so slot 0 frees up.
    let parking = track
        .max_position()
        .checked_add(1)
        .ok_or_else(|| HelixError::InvariantViolation {
            track: track.number(),
            detail: format!("no free position after {}", u32::MAX),
        })?;
    track.set_position(unit_id, parking)?;

    let mut shifting: Vec<(UnitId, u32)> = track
        .units()
        .iter()
        .filter(|u| u.id != unit_id && (1..=target).contains(&u.position))
        .map(|u| (u.id.clone(), u.position))
        .collect();
    shifting.sort_by_key(|(_, position)| *position);
    for (id, position) in shifting {
        track.set_position(&id, position - 1)?;
    }

    track.set_position(unit_id, target)?;

    // A gap at slot 1 leaves slot 0 empty after the shift: promote the
    // nearest waiting unit. A lone unit simply stays current.
    if track.occupant(0).is_none() {
        let promoted = track
            .units()
            .iter()
            .filter(|u| u.id != unit_id)
            .min_by_key(|u| u.position)
            .map(|u| u.id.clone());
        match promoted {
            Some(id) => track.set_position(&id, 0)?,
            None => {
                track.set_position(unit_id, 0)?;
                return Ok(0);
            }
        }
    }

    Ok(target)
}
