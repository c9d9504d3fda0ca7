pub mod config;
pub mod helix;
pub mod logging;
pub mod store;

pub use helix::{
    CompletionEvent, DistractorLevel, FormatBridge, HelixConfig, HelixError, LegacyState,
    Result, Scheduler, SchedulerState, SkipProgression, TrackNumber, TrackRef, TurnDecision,
    UnitRegistry,
};
