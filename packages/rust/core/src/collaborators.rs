//! External collaborators invoked by the stage executor.
//!
//! The pipeline only sees these traits. Default implementations live in
//! [`crate::parser`], [`crate::taxonomy`] and [`crate::generator`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use boardshelf_rulebook::ParsedRulebook;
use boardshelf_shared::{
    CatalogEntry, ComplexityMetrics, FamilyContext, GameId, GeneratedContent, QualityTier, Result,
    Taxonomy,
};

/// Document fetch/validate/parse service.
#[async_trait]
pub trait RulebookParser: Send + Sync {
    async fn parse(&self, entry: &CatalogEntry, rulebook_url: &str) -> Result<ParsedRulebook>;
}

/// Classification service mapping parsed content onto taxonomy tags.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, entry: &CatalogEntry, rulebook_text: &str) -> Result<Taxonomy>;
}

/// Everything the content generator receives for one entry.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub entity_id: GameId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rulebook_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Taxonomy>,
    /// Base-game summary; only present for non-base family members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_context: Option<FamilyContext>,
    pub is_expansion: bool,
    pub quality_tier: QualityTier,
    pub idempotency_key: String,
}

/// Content generation service.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Model identifier, used to key cached responses.
    fn model_id(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent>;

    /// Release any resources held between calls. Called once at the end of a run.
    async fn shutdown(&self) {}
}

/// The set of collaborators a pipeline run uses.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn RulebookParser>,
    pub classifier: Arc<dyn Classifier>,
    pub generator: Arc<dyn ContentGenerator>,
}
