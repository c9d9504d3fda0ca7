//! Unit Registry - content assignment for the three tracks
//!
//! Holds, per track, the thread currently assigned to it and that thread's
//! ordered unit ids. Content and thread assignment are owned by the caller;
//! the registry only validates and hands the data to the position table.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::helix::error::{HelixError, Result};
use crate::helix::types::{TrackNumber, UnitId, TRACK_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadContent {
    pub thread_id: String,
    pub unit_ids: Vec<UnitId>,
}

impl ThreadContent {
    pub fn new(thread_id: impl Into<String>, unit_ids: Vec<UnitId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            unit_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRegistry {
    threads: [ThreadContent; TRACK_COUNT],
}

impl UnitRegistry {
    pub fn builder() -> UnitRegistryBuilder {
        UnitRegistryBuilder::default()
    }

    pub fn thread(&self, track: TrackNumber) -> &ThreadContent {
        &self.threads[track.index()]
    }

    pub fn track_for_thread(&self, thread_id: &str) -> Option<TrackNumber> {
        TrackNumber::ALL
            .into_iter()
            .find(|track| self.threads[track.index()].thread_id == thread_id)
    }

    pub fn unit_count(&self) -> usize {
        self.threads.iter().map(|t| t.unit_ids.len()).sum()
    }
}

#[derive(Debug, Default)]
pub struct UnitRegistryBuilder {
    threads: [Option<ThreadContent>; TRACK_COUNT],
}

impl UnitRegistryBuilder {
    pub fn assign(mut self, track: TrackNumber, content: ThreadContent) -> Self {
        self.threads[track.index()] = Some(content);
        self
    }

    pub fn build(self) -> Result<UnitRegistry> {
        let [one, two, three] = self.threads;
        let threads = [
            require(TrackNumber::ONE, one)?,
            require(TrackNumber::TWO, two)?,
            require(TrackNumber::THREE, three)?,
        ];

        let mut thread_ids = HashSet::new();
        for (track, content) in TrackNumber::ALL.into_iter().zip(threads.iter()) {
            if !thread_ids.insert(content.thread_id.as_str()) {
                return Err(HelixError::InvariantViolation {
                    track,
                    detail: format!("thread {} is assigned to more than one track", content.thread_id),
                });
            }
            let mut seen = HashSet::new();
            if let Some(dup) = content.unit_ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(HelixError::InvariantViolation {
                    track,
                    detail: format!("unit {dup} appears twice in thread {}", content.thread_id),
                });
            }
        }

        Ok(UnitRegistry { threads })
    }
}

fn require(track: TrackNumber, content: Option<ThreadContent>) -> Result<ThreadContent> {
    let content = content.ok_or_else(|| HelixError::InvariantViolation {
        track,
        detail: "no thread assigned".to_string(),
    })?;
    if content.unit_ids.is_empty() {
        return Err(HelixError::InvariantViolation {
            track,
            detail: format!("thread {} has no units", content.thread_id),
        });
    }
    Ok(content)
}
