use serde::{Deserialize, Serialize};

use crate::helix::error::{HelixError, Result};
use crate::helix::types::SkipProgression;

/// What happens to the current unit after an imperfect answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImperfectPolicy {
    /// Unit stays at position 0 and is shown again on the track's next turn.
    #[default]
    StayCurrent,
    /// Unit moves to position 1 behind the next waiting unit.
    RequeueNext,
}

impl ImperfectPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayCurrent => "stay-current",
            Self::RequeueNext => "requeue-next",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stay-current" | "stay_current" => Some(Self::StayCurrent),
            "requeue-next" | "requeue_next" => Some(Self::RequeueNext),
            _ => None,
        }
    }
}

/// Which skip number decides the landing slot after a perfect answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementRule {
    /// Land on the skip number held before it advances.
    #[default]
    PreAdvance,
    /// Land on the freshly advanced skip number.
    PostAdvance,
}

impl PlacementRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreAdvance => "pre-advance",
            Self::PostAdvance => "post-advance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pre-advance" | "pre_advance" => Some(Self::PreAdvance),
            "post-advance" | "post_advance" => Some(Self::PostAdvance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelixConfig {
    pub skip_progression: SkipProgression,
    pub imperfect_policy: ImperfectPolicy,
    pub placement_rule: PlacementRule,
    pub escalate_distractors: bool,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            skip_progression: SkipProgression::default(),
            imperfect_policy: ImperfectPolicy::default(),
            placement_rule: PlacementRule::default(),
            escalate_distractors: true,
        }
    }
}

impl HelixConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.overlay(|key| std::env::var(key).ok());
        config
    }

    /// Applies `HELIX_*` overrides from `lookup`; unusable values keep the
    /// current setting and are logged.
    pub fn overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HELIX_SKIP_PROGRESSION") {
            match parse_progression(&val) {
                Ok(progression) => self.skip_progression = progression,
                Err(err) => {
                    tracing::warn!(value = %val, error = %err, "ignoring HELIX_SKIP_PROGRESSION")
                }
            }
        }
        if let Some(val) = lookup("HELIX_IMPERFECT_POLICY") {
            match ImperfectPolicy::parse(&val) {
                Some(policy) => self.imperfect_policy = policy,
                None => tracing::warn!(value = %val, "ignoring HELIX_IMPERFECT_POLICY"),
            }
        }
        if let Some(val) = lookup("HELIX_PLACEMENT_RULE") {
            match PlacementRule::parse(&val) {
                Some(rule) => self.placement_rule = rule,
                None => tracing::warn!(value = %val, "ignoring HELIX_PLACEMENT_RULE"),
            }
        }
        if let Some(val) = lookup("HELIX_ESCALATE_DISTRACTORS") {
            match val.trim().parse::<bool>() {
                Ok(escalate) => self.escalate_distractors = escalate,
                Err(_) => tracing::warn!(value = %val, "ignoring HELIX_ESCALATE_DISTRACTORS"),
            }
        }
    }
}

/// Parses a comma separated list such as `1,3,5,10,25,100`.
pub fn parse_progression(raw: &str) -> Result<SkipProgression> {
    let steps = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| HelixError::InvalidConfig(format!("not a skip number: {s:?}")))
        })
        .collect::<Result<Vec<u32>>>()?;
    SkipProgression::new(steps)
}
