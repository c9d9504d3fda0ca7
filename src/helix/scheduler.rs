//! Scheduler Facade - one completion turn end to end
//!
//! validate event -> reposition the acted-on track -> rotate -> next unit
//!
//! Each turn runs against a copy of the learner's state and is committed
//! only when every step succeeded.

use serde::{Deserialize, Serialize};

use crate::helix::bridge::{FormatBridge, LegacyState, Restored};
use crate::helix::config::HelixConfig;
use crate::helix::error::{HelixError, Result};
use crate::helix::registry::UnitRegistry;
use crate::helix::reposition::{Repositioned, RepositioningEngine};
use crate::helix::rotator::{Rotation, TrackRotator};
use crate::helix::state::{SchedulerState, TrackProgress};
use crate::helix::types::{ScoreOutcome, TrackNumber, TrackRef, UnitId, UnitPosition};

/// A learner finished a unit with `correct_count` of `total_count` right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub track_or_thread_id: TrackRef,
    pub unit_id: UnitId,
    pub correct_count: u32,
    pub total_count: u32,
}

impl CompletionEvent {
    pub fn new(
        track: impl Into<TrackRef>,
        unit_id: impl Into<UnitId>,
        correct_count: u32,
        total_count: u32,
    ) -> Self {
        Self {
            track_or_thread_id: track.into(),
            unit_id: unit_id.into(),
            correct_count,
            total_count,
        }
    }

    pub fn outcome(&self) -> Result<ScoreOutcome> {
        ScoreOutcome::from_counts(self.correct_count, self.total_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDecision {
    pub next_unit_id: UnitId,
    pub next_track_number: TrackNumber,
    pub cycle_count: u64,
    pub updated_positions_for_track: Vec<UnitPosition>,
    pub repositioned: Repositioned,
}

/// What the learner is looking at right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub track_number: TrackNumber,
    pub unit_id: UnitId,
    pub cycle_count: u64,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    config: HelixConfig,
    engine: RepositioningEngine,
}

impl Scheduler {
    pub fn new(config: HelixConfig) -> Self {
        let engine = RepositioningEngine::new(&config);
        Self { config, engine }
    }

    pub fn config(&self) -> &HelixConfig {
        &self.config
    }

    /// Fresh state for a learner seen for the first time.
    pub fn initial_state(&self, registry: &UnitRegistry) -> Result<SchedulerState> {
        SchedulerState::canonical(registry, &self.config.skip_progression)
    }

    /// Discards all progress and starts again from the canonical table.
    pub fn reset(&self, state: &mut SchedulerState, registry: &UnitRegistry) -> Result<()> {
        *state = self.initial_state(registry)?;
        tracing::info!("learner progress reset to canonical table");
        Ok(())
    }

    pub fn present(&self, state: &SchedulerState) -> Result<Presentation> {
        let track = state.active_track();
        Ok(Presentation {
            track_number: track,
            unit_id: state.track(track).get_current()?.id.clone(),
            cycle_count: state.cycle_count(),
        })
    }

    /// Standard turn: reposition the active track, then rotate to the next one.
    /// An event for any other track fails with `NotActiveTrack`.
    pub fn complete_turn(
        &self,
        state: &mut SchedulerState,
        event: &CompletionEvent,
    ) -> Result<TurnDecision> {
        self.run_turn(state, event, None)
    }

    /// Diagnostic turn: reposition any track, then stay on / jump to `pin`
    /// without rotating.
    pub fn complete_pinned(
        &self,
        state: &mut SchedulerState,
        event: &CompletionEvent,
        pin: TrackNumber,
    ) -> Result<TurnDecision> {
        self.run_turn(state, event, Some(pin))
    }

    pub fn progress(&self, state: &SchedulerState) -> Vec<TrackProgress> {
        state.progress(&self.config.skip_progression)
    }

    pub fn load(&self, legacy: &LegacyState) -> Result<Restored> {
        FormatBridge::from_legacy(legacy, &self.config.skip_progression)
    }

    pub fn save(&self, state: &SchedulerState) -> LegacyState {
        FormatBridge::to_legacy(state)
    }

    fn run_turn(
        &self,
        state: &mut SchedulerState,
        event: &CompletionEvent,
        pin: Option<TrackNumber>,
    ) -> Result<TurnDecision> {
        let outcome = event.outcome()?;
        let acted_on = state.resolve(&event.track_or_thread_id)?;
        let active = state.active_track();
        if acted_on != active {
            // Standard turns act on the active track only.
            if pin.is_none() {
                return Err(HelixError::NotActiveTrack { acted_on, active });
            }
            tracing::debug!(
                acted_on = %acted_on,
                active = %active,
                unit = %event.unit_id,
                "pinned completion for a track that is not active"
            );
        }

        let mut next = state.clone();
        let repositioned = self
            .engine
            .apply(next.track_mut(acted_on), &event.unit_id, outcome)?;
        let Rotation {
            track_number,
            unit_id,
            cycle_count,
            ..
        } = match pin {
            Some(track) => TrackRotator::pin(&mut next, track)?,
            None => TrackRotator::advance(&mut next)?,
        };

        let decision = TurnDecision {
            next_unit_id: unit_id,
            next_track_number: track_number,
            cycle_count,
            updated_positions_for_track: next.track(acted_on).positions(),
            repositioned,
        };

        tracing::debug!(
            acted_on = %acted_on,
            next_track = %decision.next_track_number,
            next_unit = %decision.next_unit_id,
            cycle = decision.cycle_count,
            "turn completed"
        );

        *state = next;
        Ok(decision)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(HelixConfig::default())
    }
}
