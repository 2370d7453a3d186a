//! Run requests and the aggregate run report.

use serde::{Deserialize, Serialize};

use boardshelf_shared::{
    BoardshelfError, FamilyId, GameId, PipelineState, Result, RunMode, StageName,
};

/// Options shared by both request shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Skip entries blocked on a missing rulebook.
    #[serde(default = "default_true")]
    pub skip_blocked: bool,
    /// Stop iterating entries after the first failure.
    #[serde(default)]
    pub stop_on_error: bool,
    #[serde(default)]
    pub run_mode: RunMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_blocked: true,
            stop_on_error: false,
            run_mode: RunMode::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A pipeline run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunRequest {
    Single {
        entity_id: GameId,
        #[serde(flatten)]
        options: RunOptions,
    },
    Family {
        family_id: FamilyId,
        #[serde(flatten)]
        options: RunOptions,
    },
}

impl RunRequest {
    pub fn single(entity_id: impl Into<GameId>, options: RunOptions) -> Self {
        Self::Single {
            entity_id: entity_id.into(),
            options,
        }
    }

    pub fn family(family_id: impl Into<FamilyId>, options: RunOptions) -> Self {
        Self::Family {
            family_id: family_id.into(),
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        match self {
            Self::Single { options, .. } | Self::Family { options, .. } => options,
        }
    }

    /// `single` or `family`.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Family { .. } => "family",
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            Self::Single { entity_id, .. } => entity_id.as_str(),
            Self::Family { family_id, .. } => family_id.as_str(),
        }
    }

    /// Reject requests that cannot name a target.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Single { entity_id, .. } if entity_id.as_str().trim().is_empty() => Err(
                BoardshelfError::validation("entity_id is required for a single run"),
            ),
            Self::Family { family_id, .. } if family_id.as_str().trim().is_empty() => Err(
                BoardshelfError::validation("family_id is required for a family run"),
            ),
            _ => Ok(()),
        }
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_games: usize,
    /// Entries whose stages all succeeded.
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Per-entry outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    pub entity_id: GameId,
    pub entity_name: String,
    pub previous_state: PipelineState,
    pub new_state: PipelineState,
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stages that completed, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageName>,
}

/// Non-streaming result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub summary: RunSummary,
    pub results: Vec<EntityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}
