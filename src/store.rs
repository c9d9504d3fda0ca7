//! JSON file persistence for the replay binary.
//!
//! The scheduler itself never touches storage; this is the thin caller-side
//! layer that moves the legacy-compatible state in and out of a file.

use std::fs;
use std::path::Path;

use crate::helix::{LegacyState, Restored, Result, Scheduler, SchedulerState};

pub fn load_state(scheduler: &Scheduler, path: &Path) -> Result<Restored> {
    let raw = fs::read_to_string(path)?;
    let legacy: LegacyState = serde_json::from_str(&raw)?;
    let restored = scheduler.load(&legacy)?;
    if !restored.report.is_clean() {
        tracing::warn!(
            path = %path.display(),
            repairs = restored.report.repairs.len(),
            "state file needed repairs"
        );
    }
    Ok(restored)
}

/// Writes through a sibling temp file so a crash never leaves half a state.
pub fn save_state(scheduler: &Scheduler, path: &Path, state: &SchedulerState) -> Result<()> {
    let legacy = scheduler.save(state);
    let json = serde_json::to_string_pretty(&legacy)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "state saved");
    Ok(())
}
