//! Core domain types for the boardshelf catalog and its content pipeline.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoardshelfError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new time-sortable identifier (UUID v7).
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a catalog entry ("game").
    GameId
);

opaque_id!(
    /// Identifier of a family (base game plus expansions/reprints).
    FamilyId
);

/// Derive a URL slug from a display name.
pub fn slugify(name: &str) -> String {
    static NON_ALNUM: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

    let lower = name.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Position of a catalog entry in the content pipeline.
///
/// The progression is totally ordered except for the `rulebook_missing` /
/// `rulebook_ready` branch, which share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Imported,
    Enriched,
    RulebookMissing,
    RulebookReady,
    Parsing,
    Parsed,
    TaxonomyAssigned,
    Generating,
    Generated,
    ReviewPending,
    Published,
}

impl PipelineState {
    pub const ALL: [PipelineState; 11] = [
        Self::Imported,
        Self::Enriched,
        Self::RulebookMissing,
        Self::RulebookReady,
        Self::Parsing,
        Self::Parsed,
        Self::TaxonomyAssigned,
        Self::Generating,
        Self::Generated,
        Self::ReviewPending,
        Self::Published,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imported => "imported",
            Self::Enriched => "enriched",
            Self::RulebookMissing => "rulebook_missing",
            Self::RulebookReady => "rulebook_ready",
            Self::Parsing => "parsing",
            Self::Parsed => "parsed",
            Self::TaxonomyAssigned => "taxonomy_assigned",
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::ReviewPending => "review_pending",
            Self::Published => "published",
        }
    }

    /// Ordinal position along the pipeline. Branch states share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Imported => 0,
            Self::Enriched => 1,
            Self::RulebookMissing | Self::RulebookReady => 2,
            Self::Parsing => 3,
            Self::Parsed => 4,
            Self::TaxonomyAssigned => 5,
            Self::Generating => 6,
            Self::Generated => 7,
            Self::ReviewPending => 8,
            Self::Published => 9,
        }
    }

    /// True when `self` is at or beyond `other` along the pipeline.
    pub fn is_at_least(&self, other: PipelineState) -> bool {
        self.rank() >= other.rank()
    }

    /// Intermediate states written while a long-running stage is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Parsing | Self::Generating)
    }

    /// Whether a move from `self` to `next` respects the forward-only
    /// invariant. Re-entering an in-flight state and restoring the state an
    /// in-flight stage started from are both allowed.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        if *self == next {
            return true;
        }
        if self.is_in_flight() && next.rank() < self.rank() {
            return true;
        }
        next.rank() > self.rank()
            || matches!(
                (self, next),
                (Self::RulebookMissing, Self::RulebookReady)
            )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineState {
    type Err = BoardshelfError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| BoardshelfError::validation(format!("unknown pipeline state '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// RunMode
// ---------------------------------------------------------------------------

/// Caller-selected policy narrowing which stages apply during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Full,
    #[default]
    FromCurrent,
    ParseOnly,
    GenerateOnly,
}

impl RunMode {
    pub const ALL: [RunMode; 4] = [
        Self::Full,
        Self::FromCurrent,
        Self::ParseOnly,
        Self::GenerateOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::FromCurrent => "from-current",
            Self::ParseOnly => "parse-only",
            Self::GenerateOnly => "generate-only",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = BoardshelfError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                BoardshelfError::validation(format!(
                    "unknown run mode '{s}': expected full, from-current, parse-only or generate-only"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// StageName
// ---------------------------------------------------------------------------

/// One atomic state-transition operation within the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Enrich,
    SetRulebookReady,
    Parse,
    AssignTaxonomy,
    Generate,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrich => "enrich",
            Self::SetRulebookReady => "set-rulebook-ready",
            Self::Parse => "parse",
            Self::AssignTaxonomy => "assign-taxonomy",
            Self::Generate => "generate",
        }
    }

    /// State an entry lands in when the stage succeeds.
    pub fn target_state(&self) -> PipelineState {
        match self {
            Self::Enrich => PipelineState::Enriched,
            Self::SetRulebookReady => PipelineState::RulebookReady,
            Self::Parse => PipelineState::Parsed,
            Self::AssignTaxonomy => PipelineState::TaxonomyAssigned,
            Self::Generate => PipelineState::Generated,
        }
    }

    /// State persisted while the stage's external call is pending, if any.
    pub fn in_flight_state(&self) -> Option<PipelineState> {
        match self {
            Self::Parse => Some(PipelineState::Parsing),
            Self::Generate => Some(PipelineState::Generating),
            _ => None,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entry payloads
// ---------------------------------------------------------------------------

/// Complexity metrics attached to an entry by the `parse` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub word_count: usize,
    pub section_count: usize,
    pub reading_minutes: u32,
    /// Heuristic rules weight on a 1.0–5.0 scale.
    pub score: f32,
}

/// Classification metadata attached by the `assign-taxonomy` stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub mechanics: Vec<String>,
}

impl Taxonomy {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.mechanics.is_empty()
    }
}

/// Generated rules/setup/reference payloads. Each part is an opaque JSON
/// document and may be populated independently of the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<serde_json::Value>,
}

impl GeneratedContent {
    pub fn is_empty(&self) -> bool {
        self.rules.is_none() && self.setup.is_none() && self.reference.is_none()
    }
}

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// One catalog item tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: GameId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,
    pub state: PipelineState,
    /// External rulebook document; gates the parse and generate stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulebook_url: Option<String>,
    /// Cross-reference identifier attached by enrichment imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgg_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<FamilyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulebook_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Taxonomy>,
    #[serde(default)]
    pub content: GeneratedContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Whether a non-blank rulebook URL is attached.
    pub fn has_rulebook(&self) -> bool {
        self.rulebook_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Whether enrichment data (a cross-reference id) is attached.
    pub fn has_enrichment_signal(&self) -> bool {
        self.bgg_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

/// Derived summary of a family's base entry, used to keep sibling entries'
/// generated content consistent with the base game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyContext {
    pub base_game_id: GameId,
    pub base_game_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_summary: Option<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
    /// SHA-256 over the base entry's generated content.
    pub content_hash: String,
    pub built_at: DateTime<Utc>,
}

/// A group of entries related as base game plus expansions/reprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_game_id: Option<GameId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<FamilyContext>,
    /// Token of the batch run currently holding the processing lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_lock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_acquired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Family {
    pub fn is_base(&self, game_id: &GameId) -> bool {
        self.base_game_id.as_ref() == Some(game_id)
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Kind of link between two catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ExpansionOf,
    StandaloneExpansionOf,
    ReimplementationOf,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpansionOf => "expansion_of",
            Self::StandaloneExpansionOf => "standalone_expansion_of",
            Self::ReimplementationOf => "reimplementation_of",
        }
    }

    /// Whether the relation makes the source entry an expansion.
    pub fn marks_expansion(&self) -> bool {
        matches!(self, Self::ExpansionOf | Self::StandaloneExpansionOf)
    }
}

impl FromStr for RelationKind {
    type Err = BoardshelfError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "expansion_of" => Ok(Self::ExpansionOf),
            "standalone_expansion_of" => Ok(Self::StandaloneExpansionOf),
            "reimplementation_of" => Ok(Self::ReimplementationOf),
            other => Err(BoardshelfError::validation(format!(
                "unknown relation kind '{other}'"
            ))),
        }
    }
}
