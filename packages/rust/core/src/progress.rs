//! Progress channel: the ordered event stream describing one run.
//!
//! A run emits `start`, then per entry an `entity_start` followed either by
//! its `step` events and one `entity_complete`, or by a single
//! `entity_skip`. Exactly one `complete` closes the stream. Setup failures
//! (unknown entity or family, lock contention) emit only `complete`.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use boardshelf_shared::{GameId, PipelineState, StageName};

/// Status carried by a `step` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Complete,
    Error,
}

/// One event on the progress channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        total: usize,
        names: Vec<String>,
    },
    EntityStart {
        index: usize,
        entity_id: GameId,
        name: String,
    },
    Step {
        entity_id: GameId,
        stage: StageName,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    EntityComplete {
        entity_id: GameId,
        success: bool,
        previous_state: PipelineState,
        new_state: PipelineState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    EntitySkip {
        entity_id: GameId,
        reason: String,
    },
    Complete {
        total: usize,
        processed: usize,
        skipped: usize,
        errors: usize,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ProgressEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Producer side of the channel. Sends never fail the run: a consumer that
/// stops reading (drops its receiver) simply stops seeing events.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                tracing::trace!("progress receiver dropped");
            }
        }
    }
}
