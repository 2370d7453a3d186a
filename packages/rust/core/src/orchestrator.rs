//! Pipeline orchestrator: drives single-entry and family-batch runs.
//!
//! A run resolves its target, derives the stages each entry still needs,
//! executes them in order through the [`StageExecutor`] and reports progress
//! on a [`ProgressSink`]. Entries are processed strictly one after another.

use std::time::Instant;

use tracing::{error, info, instrument, warn};

use boardshelf_shared::{
    BoardshelfError, CatalogEntry, Family, FamilyContext, FamilyId, GameId, PipelineState,
    QualityTier, Result, StageName,
};
use boardshelf_storage::Storage;

use crate::collaborators::Collaborators;
use crate::context::rebuild_family_context;
use crate::lock::FamilyLock;
use crate::ordering::order_family;
use crate::progress::{ProgressEvent, ProgressSink, StepStatus};
use crate::request::{EntityResult, RunOptions, RunReport, RunRequest, RunSummary};
use crate::skip::should_skip;
use crate::stages::StageExecutor;
use crate::steps::required_stages;

/// Counts and per-entry results accumulated while a run progresses.
#[derive(Debug, Default)]
struct Tally {
    summary: RunSummary,
    results: Vec<EntityResult>,
}

impl Tally {
    fn record(&mut self, result: EntityResult) {
        if result.skipped {
            self.summary.skipped += 1;
        } else if result.success {
            self.summary.processed += 1;
        } else {
            self.summary.errors += 1;
        }
        self.results.push(result);
    }
}

/// Runs pipeline requests against one store with one set of collaborators.
pub struct Orchestrator<'a> {
    storage: &'a Storage,
    collaborators: Collaborators,
    quality_tier: QualityTier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        storage: &'a Storage,
        collaborators: Collaborators,
        quality_tier: QualityTier,
    ) -> Self {
        Self {
            storage,
            collaborators,
            quality_tier,
        }
    }

    /// Execute a run request.
    ///
    /// Invalid requests are rejected with `Err` before any event is sent.
    /// Everything else yields a [`RunReport`], and the sink always receives
    /// exactly one final `complete` event. Lookup failures, lock contention
    /// and mid-run persistence failures are reported through the report's
    /// `error` and counted as one error.
    #[instrument(skip_all, fields(mode = request.mode_name(), target = request.target_id()))]
    pub async fn run(&self, request: &RunRequest, progress: ProgressSink) -> Result<RunReport> {
        request.validate()?;
        let started = Instant::now();
        let options = *request.options();
        info!(run_mode = %options.run_mode, "pipeline run started");

        let run_id = self.open_audit(request).await;

        let mut tally = Tally::default();
        let outcome = match request {
            RunRequest::Single { entity_id, .. } => {
                self.run_single(entity_id, &options, &progress, &mut tally)
                    .await
            }
            RunRequest::Family { family_id, .. } => {
                self.run_family(family_id, &options, &progress, &mut tally)
                    .await
            }
        };
        self.collaborators.generator.shutdown().await;

        let run_error = match outcome {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "pipeline run aborted");
                tally.summary.errors += 1;
                Some(e.to_string())
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let summary = tally.summary;
        progress
            .emit(ProgressEvent::Complete {
                total: summary.total_games,
                processed: summary.processed,
                skipped: summary.skipped,
                errors: summary.errors,
                duration_ms,
                error: run_error.clone(),
            })
            .await;

        let report = RunReport {
            success: summary.errors == 0,
            summary,
            results: tally.results,
            error: run_error,
            duration_ms,
        };
        if let Some(run_id) = run_id {
            self.close_audit(&run_id, &report).await;
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            duration_ms,
            "pipeline run finished"
        );
        Ok(report)
    }

    async fn run_single(
        &self,
        entity_id: &GameId,
        options: &RunOptions,
        progress: &ProgressSink,
        tally: &mut Tally,
    ) -> Result<()> {
        let entry = self
            .storage
            .get_game(entity_id)
            .await?
            .ok_or_else(|| BoardshelfError::not_found("game", entity_id.as_str()))?;

        let family = match &entry.family_id {
            Some(family_id) => self.storage.get_family(family_id).await?,
            None => None,
        };
        let is_base = family.as_ref().is_some_and(|f| f.is_base(&entry.id));
        let context = family
            .as_ref()
            .filter(|_| !is_base)
            .and_then(|f| f.context.clone());
        let is_expansion = self.storage.is_expansion(&entry.id).await?;

        tally.summary.total_games = 1;
        progress
            .emit(ProgressEvent::Start {
                total: 1,
                names: vec![entry.name.clone()],
            })
            .await;

        let result = self
            .process_entry(0, entry, is_expansion, context.as_ref(), options, progress)
            .await?;

        if let Some(family) = family.filter(|_| is_base && generated_now(&result)) {
            self.refresh_context(&family.id, &result.entity_id).await;
        }
        tally.record(result);
        Ok(())
    }

    async fn run_family(
        &self,
        family_id: &FamilyId,
        options: &RunOptions,
        progress: &ProgressSink,
        tally: &mut Tally,
    ) -> Result<()> {
        let family = self
            .storage
            .get_family(family_id)
            .await?
            .ok_or_else(|| BoardshelfError::not_found("family", family_id.as_str()))?;

        let Some(lock) = FamilyLock::acquire(self.storage, family_id).await? else {
            warn!(%family_id, "family is locked by another run");
            return Err(BoardshelfError::Locked(family_id.to_string()));
        };

        let outcome = self.process_family(&family, options, progress, tally).await;

        if let Err(e) = lock.release().await {
            error!(%family_id, error = %e, "failed to release processing lock");
        }
        outcome
    }

    async fn process_family(
        &self,
        family: &Family,
        options: &RunOptions,
        progress: &ProgressSink,
        tally: &mut Tally,
    ) -> Result<()> {
        let entries = self.storage.list_games_by_family(&family.id).await?;
        let expansions = self.storage.expansion_ids_in_family(&family.id).await?;
        let members = order_family(entries, &expansions);

        tally.summary.total_games = members.len();
        progress
            .emit(ProgressEvent::Start {
                total: members.len(),
                names: members.iter().map(|m| m.entry.name.clone()).collect(),
            })
            .await;

        let mut context = family.context.clone();

        // A previous run may have generated the base but died before caching.
        if context.is_none() {
            let base_done = members.iter().any(|m| {
                family.is_base(&m.entry.id) && m.entry.state == PipelineState::Generated
            });
            if let (true, Some(base_id)) = (base_done, &family.base_game_id) {
                info!(family_id = %family.id, "repairing missing family context");
                context = self.refresh_context(&family.id, base_id).await;
            }
        }

        for (index, member) in members.into_iter().enumerate() {
            let is_base = family.is_base(&member.entry.id);
            let entry_context = if is_base { None } else { context.as_ref() };

            let result = self
                .process_entry(
                    index,
                    member.entry,
                    member.is_expansion,
                    entry_context,
                    options,
                    progress,
                )
                .await?;

            if is_base && generated_now(&result) {
                if let Some(fresh) = self.refresh_context(&family.id, &result.entity_id).await {
                    context = Some(fresh);
                }
            }

            let failed = !result.success;
            tally.record(result);
            if failed && options.stop_on_error {
                info!(family_id = %family.id, "stopping after first failure");
                break;
            }
        }
        Ok(())
    }

    /// Skip-check one entry, then run its remaining stages until one fails.
    async fn process_entry(
        &self,
        index: usize,
        entry: CatalogEntry,
        is_expansion: bool,
        context: Option<&FamilyContext>,
        options: &RunOptions,
        progress: &ProgressSink,
    ) -> Result<EntityResult> {
        progress
            .emit(ProgressEvent::EntityStart {
                index,
                entity_id: entry.id.clone(),
                name: entry.name.clone(),
            })
            .await;

        let previous_state = entry.state;
        let decision = should_skip(&entry, options.run_mode, options.skip_blocked);
        if decision.skip {
            let reason = decision.reason.unwrap_or_default();
            info!(entity_id = %entry.id, %reason, "entry skipped");
            progress
                .emit(ProgressEvent::EntitySkip {
                    entity_id: entry.id.clone(),
                    reason: reason.clone(),
                })
                .await;
            return Ok(EntityResult {
                entity_id: entry.id,
                entity_name: entry.name,
                previous_state,
                new_state: previous_state,
                success: true,
                skipped: true,
                skip_reason: Some(reason),
                error: None,
                stages: Vec::new(),
            });
        }

        let executor = StageExecutor::new(self.storage, &self.collaborators, self.quality_tier);
        let mut new_state = previous_state;
        let mut completed: Vec<StageName> = Vec::new();
        let mut failure: Option<String> = None;

        for stage in required_stages(&entry, options.run_mode) {
            progress
                .emit(ProgressEvent::Step {
                    entity_id: entry.id.clone(),
                    stage,
                    status: StepStatus::Running,
                    error: None,
                })
                .await;

            let outcome = executor
                .run_stage(&entry.id, stage, context, is_expansion)
                .await?;
            new_state = outcome.new_state;

            let status = if outcome.success {
                completed.push(stage);
                StepStatus::Complete
            } else {
                StepStatus::Error
            };
            progress
                .emit(ProgressEvent::Step {
                    entity_id: entry.id.clone(),
                    stage,
                    status,
                    error: outcome.error.clone(),
                })
                .await;

            if !outcome.success {
                failure = outcome.error;
                break;
            }
        }

        progress
            .emit(ProgressEvent::EntityComplete {
                entity_id: entry.id.clone(),
                success: failure.is_none(),
                previous_state,
                new_state,
                error: failure.clone(),
            })
            .await;

        Ok(EntityResult {
            entity_id: entry.id,
            entity_name: entry.name,
            previous_state,
            new_state,
            success: failure.is_none(),
            skipped: false,
            skip_reason: None,
            error: failure,
            stages: completed,
        })
    }

    /// Rebuild the family context. Failures are logged and never fail the run.
    async fn refresh_context(
        &self,
        family_id: &FamilyId,
        base_id: &GameId,
    ) -> Option<FamilyContext> {
        match rebuild_family_context(self.storage, family_id, base_id).await {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(%family_id, %base_id, error = %e, "family context rebuild failed");
                None
            }
        }
    }

    async fn open_audit(&self, request: &RunRequest) -> Option<String> {
        let run_mode = request.options().run_mode;
        match self
            .storage
            .insert_pipeline_run(request.mode_name(), run_mode.as_str(), request.target_id())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to record pipeline run");
                None
            }
        }
    }

    async fn close_audit(&self, run_id: &str, report: &RunReport) {
        let stats = serde_json::json!({
            "summary": report.summary,
            "error": report.error,
            "duration_ms": report.duration_ms,
        });
        if let Err(e) = self
            .storage
            .finish_pipeline_run(run_id, &stats.to_string())
            .await
        {
            warn!(%run_id, error = %e, "failed to finish pipeline run record");
        }
    }
}

/// Whether the entry's `generate` stage moved it into `generated` in this run.
fn generated_now(result: &EntityResult) -> bool {
    result.success
        && result.new_state == PipelineState::Generated
        && result.stages.contains(&StageName::Generate)
}
