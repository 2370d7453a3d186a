//! Stage executor: runs one pipeline stage against one entry.
//!
//! Collaborator failures become a failed [`StageOutcome`] and are recorded
//! on the entry. Only persistence failures surface as `Err`.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use boardshelf_shared::{
    BoardshelfError, CatalogEntry, FamilyContext, GameId, GeneratedContent, PipelineState,
    QualityTier, Result, StageName,
};
use boardshelf_storage::Storage;

use crate::collaborators::{Collaborators, GenerationRequest};

/// Result of one stage attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub success: bool,
    /// State after the attempt. Unchanged on failure.
    pub new_state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs stages against entries held in [`Storage`].
pub struct StageExecutor<'a> {
    storage: &'a Storage,
    collaborators: &'a Collaborators,
    quality_tier: QualityTier,
}

impl<'a> StageExecutor<'a> {
    pub fn new(
        storage: &'a Storage,
        collaborators: &'a Collaborators,
        quality_tier: QualityTier,
    ) -> Self {
        Self {
            storage,
            collaborators,
            quality_tier,
        }
    }

    /// Run `stage` for `entry_id`. On success the entry moves to the stage's
    /// target state with its error cleared; on failure its state is left as
    /// it was and the error is recorded. Both stamp `last_processed_at`.
    /// A stage whose target would move the entry backwards fails without
    /// calling any collaborator.
    #[instrument(skip_all, fields(entity_id = %entry_id, stage = %stage))]
    pub async fn run_stage(
        &self,
        entry_id: &GameId,
        stage: StageName,
        family_context: Option<&FamilyContext>,
        is_expansion: bool,
    ) -> Result<StageOutcome> {
        let entry = self
            .storage
            .get_game(entry_id)
            .await?
            .ok_or_else(|| BoardshelfError::not_found("game", entry_id.as_str()))?;
        let prior = entry.state;
        let target = stage.target_state();

        if !prior.can_transition_to(target) {
            let message = format!("illegal transition from {prior} to {target}");
            warn!(state = %prior, error = %message, "stage refused");
            self.storage
                .record_stage_failure(entry_id, prior, &message)
                .await?;
            return Ok(StageOutcome {
                success: false,
                new_state: prior,
                error: Some(message),
            });
        }

        if let Some(in_flight) = stage.in_flight_state() {
            self.storage.mark_in_flight(entry_id, in_flight).await?;
        }

        let attempt = match stage {
            StageName::Enrich | StageName::SetRulebookReady => self.check_transition(&entry, stage),
            StageName::Parse => self.parse(&entry).await,
            StageName::AssignTaxonomy => self.assign_taxonomy(&entry).await,
            StageName::Generate => self.generate(&entry, family_context, is_expansion).await,
        };

        // Persistence errors inside a stage abort the run, not just the entry.
        match attempt {
            Ok(()) => {
                self.storage.record_stage_success(entry_id, target).await?;
                info!(from = %prior, to = %target, "stage complete");
                Ok(StageOutcome {
                    success: true,
                    new_state: target,
                    error: None,
                })
            }
            Err(BoardshelfError::Storage(message)) => Err(BoardshelfError::Storage(message)),
            Err(e) => {
                let message = e.to_string();
                self.storage
                    .record_stage_failure(entry_id, prior, &message)
                    .await?;
                warn!(state = %prior, error = %message, "stage failed");
                Ok(StageOutcome {
                    success: false,
                    new_state: prior,
                    error: Some(message),
                })
            }
        }
    }

    /// Stages with no collaborator only need their preconditions.
    fn check_transition(&self, entry: &CatalogEntry, stage: StageName) -> Result<()> {
        if stage == StageName::SetRulebookReady && !entry.has_rulebook() {
            return Err(BoardshelfError::validation("no rulebook URL"));
        }
        Ok(())
    }

    async fn parse(&self, entry: &CatalogEntry) -> Result<()> {
        let url = match entry.rulebook_url.as_deref() {
            Some(url) if entry.has_rulebook() => url,
            _ => return Err(BoardshelfError::validation("no rulebook URL")),
        };

        let parsed = self.collaborators.parser.parse(entry, url).await?;
        self.storage
            .set_rulebook_analysis(&entry.id, &parsed.text, &parsed.complexity)
            .await?;
        debug!(words = parsed.complexity.word_count, "rulebook analysis stored");
        Ok(())
    }

    async fn assign_taxonomy(&self, entry: &CatalogEntry) -> Result<()> {
        if entry.taxonomy.as_ref().is_some_and(|t| !t.is_empty()) {
            debug!("taxonomy already attached");
            return Ok(());
        }

        let text = entry.rulebook_text.as_deref().unwrap_or_default();
        let taxonomy = self.collaborators.classifier.classify(entry, text).await?;
        self.storage.set_taxonomy(&entry.id, &taxonomy).await
    }

    async fn generate(
        &self,
        entry: &CatalogEntry,
        family_context: Option<&FamilyContext>,
        is_expansion: bool,
    ) -> Result<()> {
        let has_text = entry
            .rulebook_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        let has_taxonomy = entry.taxonomy.as_ref().is_some_and(|t| !t.is_empty());
        if !has_text && !has_taxonomy {
            return Err(BoardshelfError::Generation(
                "nothing to generate from: no parsed rulebook text or taxonomy".into(),
            ));
        }

        let generator = &self.collaborators.generator;
        let model = generator.model_id().to_string();
        let key = idempotency_key(entry, StageName::Generate, family_context, self.quality_tier);

        let content = match self.cached_content(&key, &model).await {
            Some(content) => {
                info!(%key, "generation served from cache");
                content
            }
            None => {
                let request = GenerationRequest {
                    entity_id: entry.id.clone(),
                    name: entry.name.clone(),
                    year_published: entry.year_published,
                    rulebook_text: entry.rulebook_text.clone(),
                    complexity: entry.complexity.clone(),
                    taxonomy: entry.taxonomy.clone(),
                    family_context: family_context.cloned(),
                    is_expansion,
                    quality_tier: self.quality_tier,
                    idempotency_key: key.clone(),
                };
                let content = generator.generate(&request).await?;
                self.cache_content(&key, &model, &content).await;
                content
            }
        };

        if content.is_empty() {
            return Err(BoardshelfError::Generation(
                "generator returned no content".into(),
            ));
        }
        self.storage.set_generated_content(&entry.id, &content).await
    }

    async fn cached_content(&self, key: &str, model: &str) -> Option<GeneratedContent> {
        match self.storage.get_generation_cache(key, model).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!(error = %e, "ignoring undecodable cached generation");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "generation cache lookup failed");
                None
            }
        }
    }

    async fn cache_content(&self, key: &str, model: &str, content: &GeneratedContent) {
        let json = match serde_json::to_string(content) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode generation for cache");
                return;
            }
        };
        if let Err(e) = self.storage.set_generation_cache(key, model, &json).await {
            warn!(error = %e, "failed to cache generation");
        }
    }
}

/// Key identifying one external generation call: the same inputs always
/// produce the same key.
pub fn idempotency_key(
    entry: &CatalogEntry,
    stage: StageName,
    family_context: Option<&FamilyContext>,
    quality_tier: QualityTier,
) -> String {
    let rulebook_hash = entry
        .rulebook_text
        .as_deref()
        .map(boardshelf_rulebook::content_hash)
        .unwrap_or_default();
    let context_hash = family_context
        .map(|c| c.content_hash.as_str())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    for part in [
        entry.id.as_str(),
        stage.as_str(),
        rulebook_hash.as_str(),
        context_hash,
        quality_tier.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fakes, entry, insert_entry, test_storage};
    use boardshelf_shared::Taxonomy;

    async fn state_of(storage: &Storage, id: &GameId) -> CatalogEntry {
        storage.get_game(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn enrich_and_rulebook_ready() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Azul", Some(2017));
        game.bgg_id = Some(230802);
        game.rulebook_url = Some("https://example.com/azul".into());
        insert_entry(&storage, &game).await;

        let outcome = executor
            .run_stage(&game.id, StageName::Enrich, None, false)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.new_state, PipelineState::Enriched);

        let outcome = executor
            .run_stage(&game.id, StageName::SetRulebookReady, None, false)
            .await
            .unwrap();
        assert_eq!(outcome.new_state, PipelineState::RulebookReady);

        let stored = state_of(&storage, &game.id).await;
        assert_eq!(stored.state, PipelineState::RulebookReady);
        assert!(stored.last_processed_at.is_some());
        assert!(stored.last_error.is_none());
    }

    #[tokio::test]
    async fn rulebook_ready_without_url_fails() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let game = entry("No Rules", None);
        insert_entry(&storage, &game).await;

        for stage in [StageName::SetRulebookReady, StageName::Parse] {
            let outcome = executor.run_stage(&game.id, stage, None, false).await.unwrap();
            assert!(!outcome.success);
            assert_eq!(outcome.new_state, PipelineState::Imported);
            assert!(outcome.error.unwrap().contains("no rulebook URL"));
        }
        assert_eq!(fakes.parser.calls(), 0);
    }

    #[tokio::test]
    async fn parse_attaches_analysis() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Azul", Some(2017));
        game.state = PipelineState::RulebookReady;
        game.rulebook_url = Some("https://example.com/azul".into());
        insert_entry(&storage, &game).await;

        let outcome = executor
            .run_stage(&game.id, StageName::Parse, None, false)
            .await
            .unwrap();
        assert!(outcome.success);

        let stored = state_of(&storage, &game.id).await;
        assert_eq!(stored.state, PipelineState::Parsed);
        assert!(stored.rulebook_text.unwrap().contains("Azul"));
        assert!(stored.complexity.is_some());
    }

    #[tokio::test]
    async fn failed_parse_restores_prior_state() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        fakes.parser.fail_for("Broken");
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Broken", None);
        game.state = PipelineState::RulebookReady;
        game.rulebook_url = Some("https://example.com/broken".into());
        insert_entry(&storage, &game).await;

        let outcome = executor
            .run_stage(&game.id, StageName::Parse, None, false)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.new_state, PipelineState::RulebookReady);

        let stored = state_of(&storage, &game.id).await;
        assert_eq!(stored.state, PipelineState::RulebookReady);
        assert!(stored.last_error.unwrap().contains("rulebook unreachable"));
        assert!(stored.last_processed_at.is_some());
    }

    #[tokio::test]
    async fn backward_stage_is_refused_without_calling_collaborators() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Finished", Some(2020));
        game.state = PipelineState::Generated;
        game.rulebook_url = Some("https://example.com/finished".into());
        insert_entry(&storage, &game).await;

        for stage in [StageName::Parse, StageName::SetRulebookReady] {
            let outcome = executor.run_stage(&game.id, stage, None, false).await.unwrap();
            assert!(!outcome.success);
            assert_eq!(outcome.new_state, PipelineState::Generated);
            assert!(outcome.error.unwrap().contains("illegal transition"));
        }
        assert_eq!(fakes.parser.calls(), 0);

        let stored = state_of(&storage, &game.id).await;
        assert_eq!(stored.state, PipelineState::Generated);
        assert!(stored.last_error.unwrap().contains("from generated to"));
    }

    #[tokio::test]
    async fn taxonomy_is_a_no_op_when_attached() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Tagged", None);
        game.state = PipelineState::Parsed;
        insert_entry(&storage, &game).await;
        storage
            .set_taxonomy(
                &game.id,
                &Taxonomy {
                    categories: vec!["abstract".into()],
                    mechanics: vec![],
                },
            )
            .await
            .unwrap();

        let outcome = executor
            .run_stage(&game.id, StageName::AssignTaxonomy, None, false)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.new_state, PipelineState::TaxonomyAssigned);
        assert_eq!(fakes.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn generate_requires_inputs() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Bare", None);
        game.state = PipelineState::TaxonomyAssigned;
        insert_entry(&storage, &game).await;

        let outcome = executor
            .run_stage(&game.id, StageName::Generate, None, false)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.new_state, PipelineState::TaxonomyAssigned);
        assert_eq!(fakes.generator.calls(), 0);
    }

    #[tokio::test]
    async fn stuck_generation_is_served_from_cache() {
        let storage = test_storage().await;
        let fakes = Fakes::default();
        let collaborators = fakes.collaborators();
        let executor = StageExecutor::new(&storage, &collaborators, QualityTier::Standard);

        let mut game = entry("Wingspan", Some(2019));
        game.state = PipelineState::TaxonomyAssigned;
        insert_entry(&storage, &game).await;
        storage
            .set_rulebook_analysis(
                &game.id,
                "# Wingspan",
                &boardshelf_rulebook::analyse("# Wingspan"),
            )
            .await
            .unwrap();

        let outcome = executor
            .run_stage(&game.id, StageName::Generate, None, false)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(fakes.generator.calls(), 1);

        // Simulate a crash that left the entry mid-generation.
        storage
            .mark_in_flight(&game.id, PipelineState::Generating)
            .await
            .unwrap();
        let outcome = executor
            .run_stage(&game.id, StageName::Generate, None, false)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.new_state, PipelineState::Generated);
        assert_eq!(fakes.generator.calls(), 1, "same inputs must not call again");

        let stored = state_of(&storage, &game.id).await;
        assert!(stored.content.rules.is_some());
    }

    #[test]
    fn idempotency_key_covers_inputs() {
        let mut game = entry("Azul", None);
        game.rulebook_text = Some("# Azul".into());

        let base = idempotency_key(&game, StageName::Generate, None, QualityTier::Standard);
        assert_eq!(
            base,
            idempotency_key(&game, StageName::Generate, None, QualityTier::Standard)
        );
        assert_ne!(
            base,
            idempotency_key(&game, StageName::Generate, None, QualityTier::Premium)
        );

        let context = FamilyContext {
            base_game_id: GameId::from("base"),
            base_game_name: "Base".into(),
            year_published: None,
            rules_summary: None,
            setup_summary: None,
            key_terms: vec![],
            content_hash: "deadbeef".into(),
            built_at: chrono::Utc::now(),
        };
        assert_ne!(
            base,
            idempotency_key(&game, StageName::Generate, Some(&context), QualityTier::Standard)
        );

        game.rulebook_text = Some("# Azul, second edition".into());
        assert_ne!(
            base,
            idempotency_key(&game, StageName::Generate, None, QualityTier::Standard)
        );
    }
}
