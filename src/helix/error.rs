use thiserror::Error;

use crate::helix::types::TrackNumber;

#[derive(Debug, Error)]
pub enum HelixError {
    #[error("invalid track number {0}: expected 1, 2 or 3")]
    InvalidTrack(u8),

    #[error("no track is assigned thread {0}")]
    UnknownThread(String),

    #[error("unit {unit_id} is not part of track {track}")]
    UnknownUnit { track: TrackNumber, unit_id: String },

    #[error("unit {unit_id} is not the current unit of track {track} (current: {current})")]
    NotCurrentUnit {
        track: TrackNumber,
        unit_id: String,
        current: String,
    },

    #[error("completion names track {acted_on} but track {active} is active")]
    NotActiveTrack {
        acted_on: TrackNumber,
        active: TrackNumber,
    },

    #[error("position {position} in track {track} is already held by {unit_id}")]
    PositionConflict {
        track: TrackNumber,
        position: u32,
        unit_id: String,
    },

    #[error("invariant violated in track {track}: {detail}")]
    InvariantViolation { track: TrackNumber, detail: String },

    #[error("malformed legacy state: {0}")]
    MalformedLegacyInput(String),

    #[error("invalid score {correct}/{total}")]
    InvalidScore { correct: u32, total: u32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HelixError {
    /// Corrupted state cannot be retried; the learner's progress has to be reset.
    pub fn requires_reset(&self) -> bool {
        matches!(self, HelixError::InvariantViolation { .. })
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        HelixError::MalformedLegacyInput(detail.into())
    }
}

pub type Result<T> = std::result::Result<T, HelixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_current_unit_message() {
        let err = HelixError::NotCurrentUnit {
            track: TrackNumber::TWO,
            unit_id: "u4".to_string(),
            current: "u1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unit u4 is not the current unit of track 2 (current: u1)"
        );
    }

    #[test]
    fn test_only_invariant_violation_requires_reset() {
        let corrupt = HelixError::InvariantViolation {
            track: TrackNumber::ONE,
            detail: "no unit at position 0".to_string(),
        };
        assert!(corrupt.requires_reset());
        assert!(!HelixError::InvalidTrack(4).requires_reset());
        assert!(!HelixError::malformed("empty track").requires_reset());
        assert!(!HelixError::NotActiveTrack {
            acted_on: TrackNumber::TWO,
            active: TrackNumber::ONE,
        }
        .requires_reset());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: HelixError = json_err.into();
        assert!(matches!(err, HelixError::Json(_)));
    }
}
