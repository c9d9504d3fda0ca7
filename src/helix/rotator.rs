use serde::Serialize;

use crate::helix::error::Result;
use crate::helix::state::SchedulerState;
use crate::helix::types::{TrackNumber, UnitId};

/// Outcome of moving the rotation cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub track_number: TrackNumber,
    pub unit_id: UnitId,
    pub cycle_count: u64,
    pub wrapped: bool,
    pub pinned: bool,
}

pub struct TrackRotator;

impl TrackRotator {
    /// Track that `advance` would select, without touching the state.
    pub fn peek_next(state: &SchedulerState) -> TrackNumber {
        state.active_track().next().0
    }

    /// Round-robin 1 -> 2 -> 3 -> 1; the 3 -> 1 wrap counts a cycle.
    pub fn advance(state: &mut SchedulerState) -> Result<Rotation> {
        let (next, wrapped) = state.active_track().next();
        let unit_id = state.track(next).get_current()?.id.clone();

        state.set_active(next, wrapped);
        Ok(Rotation {
            track_number: next,
            unit_id,
            cycle_count: state.cycle_count(),
            wrapped,
            pinned: false,
        })
    }

    /// Selects `track` directly, bypassing rotation. Diagnostic use only.
    pub fn pin(state: &mut SchedulerState, track: TrackNumber) -> Result<Rotation> {
        let unit_id = state.track(track).get_current()?.id.clone();

        tracing::debug!(track = %track, unit = %unit_id, "rotation pinned");
        state.set_active(track, false);
        Ok(Rotation {
            track_number: track,
            unit_id,
            cycle_count: state.cycle_count(),
            wrapped: false,
            pinned: true,
        })
    }
}
