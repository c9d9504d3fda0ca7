//! Triple Helix - position-based scheduling across three tracks
//!
//! Contains:
//! - Unit Registry - thread content assigned to each track
//! - Position Table - per-track unit positions and their invariants
//! - Repositioning Engine - moves the answered unit after a completion
//! - Track Rotator - round-robin choice of the next active track
//! - Format Bridge - conversion to and from the legacy flat-list state
//! - Scheduler - facade running one completion turn end to end

pub mod bridge;
pub mod config;
pub mod error;
pub mod position;
pub mod registry;
pub mod reposition;
pub mod rotator;
pub mod scheduler;
pub mod state;
pub mod types;

pub use bridge::{FormatBridge, LegacyState, LegacyTrack, LegacyUnit, RepairKind, RepairReport, Restored};
pub use config::{HelixConfig, ImperfectPolicy, PlacementRule};
pub use error::{HelixError, Result};
pub use position::Track;
pub use registry::{ThreadContent, UnitRegistry};
pub use reposition::{Repositioned, RepositioningEngine};
pub use rotator::{Rotation, TrackRotator};
pub use scheduler::{CompletionEvent, Presentation, Scheduler, TurnDecision};
pub use state::{SchedulerState, TrackProgress};
pub use types::{
    DistractorLevel, ScoreOutcome, SkipProgression, TrackNumber, TrackRef, Unit, UnitId,
    UnitPosition,
};
